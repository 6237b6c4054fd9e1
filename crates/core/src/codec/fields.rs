use crate::model::{AppEntry, Architecture};
use crate::normalize::{normalize_date, parse_size, size, ParseWarning};

/// Entry field a CSV header or structured object key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Column {
    Name,
    Version,
    Publisher,
    InstallDate,
    SizeBytes,
    /// Legacy megabyte column.
    SizeMb,
    Architecture,
    InstallSource,
    UninstallCommand,
    InstallLocation,
    Website,
    IdentityKey,
}

impl Column {
    /// Match a header or key ignoring case and punctuation, so `InstallDate`,
    /// `install_date` and `Install Date` are the same column.
    pub(crate) fn from_header(header: &str) -> Option<Self> {
        let folded: String = header
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        let column = match folded.as_str() {
            "name" | "displayname" => Column::Name,
            "version" | "displayversion" => Column::Version,
            "publisher" => Column::Publisher,
            "installdate" => Column::InstallDate,
            "sizebytes" | "size" | "estimatedsize" => Column::SizeBytes,
            "sizemb" => Column::SizeMb,
            "architecture" | "arch" => Column::Architecture,
            "installsource" | "source" => Column::InstallSource,
            "uninstallcommand" | "uninstallstring" => Column::UninstallCommand,
            "installlocation" | "location" => Column::InstallLocation,
            "website" | "url" => Column::Website,
            "identitykey" => Column::IdentityKey,
            _ => return None,
        };
        Some(column)
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Version => "version",
            Column::Publisher => "publisher",
            Column::InstallDate => "install_date",
            Column::SizeBytes => "size_bytes",
            Column::SizeMb => "size_mb",
            Column::Architecture => "architecture",
            Column::InstallSource => "install_source",
            Column::UninstallCommand => "uninstall_command",
            Column::InstallLocation => "install_location",
            Column::Website => "website",
            Column::IdentityKey => "identity_key",
        }
    }
}

/// Build an entry from one row's cells.
///
/// Text fields, the name included, are stored exactly as read; cleaning raw
/// values is the normalizer's job. Blank text cells are absent unless
/// `keep_empty` is set (structured input distinguishes `""` from an omitted
/// key; CSV cannot). The stored identity key is ignored and recomputed from
/// the name. Returns `None` (with a skipped-row warning) when there is no
/// usable name.
pub(crate) fn build_entry(
    row: &str,
    cells: Vec<(Column, String)>,
    keep_empty: bool,
    warnings: &mut Vec<ParseWarning>,
) -> Option<AppEntry> {
    let name = cells
        .iter()
        .find(|(column, _)| *column == Column::Name)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();
    if name.trim().is_empty() {
        warnings
            .push(ParseWarning::SkippedRow { row: row.to_string(), reason: "missing name".into() });
        return None;
    }

    let mut entry = AppEntry::new(name);
    let mut size_mb = None;
    for (column, value) in cells {
        let text = value.trim().to_string();
        if text.is_empty() && !keep_empty {
            continue;
        }
        let mut bad_value = false;
        match column {
            Column::Name | Column::IdentityKey => {}
            Column::Version => entry.version = Some(value),
            Column::Publisher => entry.publisher = Some(value),
            Column::InstallSource => entry.install_source = Some(value),
            Column::UninstallCommand => entry.uninstall_command = Some(value),
            Column::InstallLocation => entry.install_location = Some(value),
            Column::Website => entry.website = Some(value),
            _ if text.is_empty() => {}
            Column::InstallDate => {
                entry.install_date = normalize_date(&text);
                bad_value = entry.install_date.is_none();
            }
            Column::SizeBytes => {
                entry.size_bytes = text.parse::<u64>().ok().or_else(|| parse_size(&text));
                bad_value = entry.size_bytes.is_none();
            }
            Column::SizeMb => {
                size_mb = size::from_mebibytes(&text);
                bad_value = size_mb.is_none();
            }
            Column::Architecture => match Architecture::parse(&text) {
                Some(architecture) => entry.architecture = architecture,
                None => bad_value = true,
            },
        }
        if bad_value {
            warnings.push(ParseWarning::Field {
                row: row.to_string(),
                field: column.label(),
                value: text,
            });
        }
    }
    if entry.size_bytes.is_none() {
        entry.size_bytes = size_mb;
    }
    Some(entry)
}
