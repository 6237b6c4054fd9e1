//! JSON and YAML encodings.
//!
//! Both share one envelope:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "identity_rules": 1,
//!   "captured_at": "2024-01-31T10:15:00Z",
//!   "origin": "current",
//!   "entries": [{ "name": "Foo", "identity_key": "foo", "version": "", ... }]
//! }
//! ```
//!
//! Absent fields are omitted from entry objects; an empty string is written
//! and read back as `Some("")`. Older exports shaped `{exported_at, apps}` or
//! a bare array of entries are accepted on read.

use std::io::{Read, Write};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::fields::{build_entry, Column};
use super::{CodecError, LoadedScan};
use crate::model::{AppEntry, ScanOrigin, ScanRecord};
use crate::normalize::{ParseWarning, IDENTITY_RULES_VERSION};

/// Envelope version written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    format_version: u32,
    identity_rules: u32,
    captured_at: DateTime<Utc>,
    origin: ScanOrigin,
    entries: &'a [AppEntry],
}

impl<'a> Envelope<'a> {
    fn new(record: &'a ScanRecord) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            identity_rules: IDENTITY_RULES_VERSION,
            captured_at: record.captured_at(),
            origin: record.origin(),
            entries: record.entries(),
        }
    }
}

pub fn write_json<W: Write>(record: &ScanRecord, mut writer: W) -> Result<(), CodecError> {
    serde_json::to_writer_pretty(&mut writer, &Envelope::new(record))?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn write_yaml<W: Write>(record: &ScanRecord, writer: W) -> Result<(), CodecError> {
    serde_yaml::to_writer(writer, &Envelope::new(record))?;
    Ok(())
}

/// Read a JSON scan. `fallback_captured_at` is used when the file carries no
/// usable timestamp (bare arrays, malformed values).
pub fn read_json<R: Read>(
    reader: R,
    origin: ScanOrigin,
    fallback_captured_at: DateTime<Utc>,
) -> Result<LoadedScan, CodecError> {
    let value: Value = serde_json::from_reader(reader)?;
    read_value(value, origin, fallback_captured_at)
}

/// Read a YAML scan; same rules as [`read_json`].
pub fn read_yaml<R: Read>(
    reader: R,
    origin: ScanOrigin,
    fallback_captured_at: DateTime<Utc>,
) -> Result<LoadedScan, CodecError> {
    let value: Value = serde_yaml::from_reader(reader)?;
    read_value(value, origin, fallback_captured_at)
}

fn read_value(
    value: Value,
    origin: ScanOrigin,
    fallback_captured_at: DateTime<Utc>,
) -> Result<LoadedScan, CodecError> {
    let mut warnings = Vec::new();
    let (items, captured_at) = match value {
        Value::Array(items) => (items, fallback_captured_at),
        Value::Object(mut map) => {
            if let Some(version) = map.get("format_version").and_then(Value::as_u64) {
                if version > u64::from(FORMAT_VERSION) {
                    warn!(
                        version,
                        supported = FORMAT_VERSION,
                        "scan file written by a newer format"
                    );
                }
            }
            let captured_at = match map.get("captured_at").or_else(|| map.get("exported_at")) {
                None | Some(Value::Null) => fallback_captured_at,
                Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                    warnings.push(ParseWarning::Field {
                        row: "header".to_string(),
                        field: "captured_at",
                        value: display_value(raw),
                    });
                    fallback_captured_at
                }),
            };
            let items = match map.remove("entries").or_else(|| map.remove("apps")) {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(CodecError::Malformed("entry list is not an array".to_string()))
                }
                None => return Err(CodecError::Malformed("no entry list".to_string())),
            };
            (items, captured_at)
        }
        _ => return Err(CodecError::Malformed("expected an object or an array".to_string())),
    };

    let mut entries = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let label = format!("entry {idx}");
        let Value::Object(object) = item else {
            warnings.push(ParseWarning::SkippedRow { row: label, reason: "not an object".into() });
            continue;
        };
        let mut cells = Vec::with_capacity(object.len());
        for (key, value) in object {
            let Some(column) = Column::from_header(&key) else { continue };
            match value {
                Value::Null => {}
                Value::String(text) => cells.push((column, text)),
                Value::Number(n) => cells.push((column, n.to_string())),
                Value::Bool(b) => cells.push((column, b.to_string())),
                other => warnings.push(ParseWarning::Field {
                    row: label.clone(),
                    field: column.label(),
                    value: other.to_string(),
                }),
            }
        }
        if let Some(entry) = build_entry(&label, cells, true, &mut warnings) {
            entries.push(entry);
        }
    }

    Ok(LoadedScan { record: ScanRecord::new(origin, captured_at, entries), warnings })
}

fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    let text = raw.as_str()?.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.with_timezone(&Utc));
    }
    // Naive local timestamps (`2024-01-31T10:15:00`) are taken as UTC.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|n| n.and_utc())
}

fn display_value(raw: &Value) -> String {
    match raw {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
