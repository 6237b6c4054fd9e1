//! CSV encoding.
//!
//! Absent fields are empty cells, so `Some("")` and `None` both read back as
//! `None`; so does whitespace-only text. Other cells are read untrimmed.
//! Normalized entries never hold blank text, which keeps scans produced by
//! the scanner lossless through this format.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};

use super::fields::{build_entry, Column};
use super::{CodecError, LoadedScan};
use crate::model::{AppEntry, ScanOrigin, ScanRecord};

/// Header row written by [`write_tabular`], in column order.
pub const HEADERS: [&str; 11] = [
    "Name",
    "Version",
    "Publisher",
    "InstallDate",
    "SizeBytes",
    "Architecture",
    "InstallSource",
    "UninstallCommand",
    "InstallLocation",
    "Website",
    "IdentityKey",
];

fn row(entry: &AppEntry) -> [String; 11] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        entry.name().to_string(),
        text(&entry.version),
        text(&entry.publisher),
        entry.install_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        entry.size_bytes.map(|s| s.to_string()).unwrap_or_default(),
        entry.architecture.as_str().to_string(),
        text(&entry.install_source),
        text(&entry.uninstall_command),
        text(&entry.install_location),
        text(&entry.website),
        entry.identity_key().to_string(),
    ]
}

/// Write the header row and one row per entry.
pub fn write_tabular<W: Write>(record: &ScanRecord, writer: W) -> Result<(), CodecError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADERS)?;
    for entry in record.entries() {
        csv.write_record(row(entry))?;
    }
    csv.flush()?;
    Ok(())
}

/// Read a CSV scan.
///
/// Headers may come in any order and spelling (`Install Date`, `install_date`)
/// and unknown columns are ignored, which also covers the older
/// `Name,Group,Version,InstallDate,SizeMB,...` export layout.
pub fn read_tabular<R: Read>(
    reader: R,
    origin: ScanOrigin,
    captured_at: DateTime<Utc>,
) -> Result<LoadedScan, CodecError> {
    let mut csv =
        csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader);
    let columns: Vec<Option<Column>> = csv.headers()?.iter().map(Column::from_header).collect();
    if !columns.contains(&Some(Column::Name)) {
        return Err(CodecError::Malformed("no Name column in CSV header".to_string()));
    }

    let mut warnings = Vec::new();
    let mut entries = Vec::new();
    for (idx, result) in csv.records().enumerate() {
        // Line 1 is the header.
        let label = format!("row {}", idx + 2);
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                warnings.push(crate::normalize::ParseWarning::SkippedRow {
                    row: label,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let cells = columns
            .iter()
            .zip(record.iter())
            .filter_map(|(column, value)| column.map(|c| (c, value.to_string())))
            .collect();
        if let Some(entry) = build_entry(&label, cells, false, &mut warnings) {
            entries.push(entry);
        }
    }

    Ok(LoadedScan { record: ScanRecord::new(origin, captured_at, entries), warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_is_fixed() {
        let record = ScanRecord::new(ScanOrigin::Current, Utc::now(), vec![AppEntry::new("Foo")]);
        let mut out = Vec::new();
        write_tabular(&record, &mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADERS.join(",").as_str()));
        assert_eq!(lines.next(), Some("Foo,,,,,unknown,,,,,foo"));
    }

    #[test]
    fn cells_are_read_untrimmed() {
        let text = " Name , Publisher ,Version\n Foo , Acme ,   \n";
        let loaded =
            read_tabular(text.as_bytes(), ScanOrigin::Reference, Utc::now()).expect("read");
        let entry = &loaded.record.entries()[0];
        assert_eq!(entry.name(), " Foo ");
        assert_eq!(entry.publisher.as_deref(), Some(" Acme "));
        assert_eq!(entry.version, None);
    }

    #[test]
    fn missing_name_column_is_malformed() {
        let result = read_tabular("Version\n1.0\n".as_bytes(), ScanOrigin::Reference, Utc::now());
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }
}
