//! Entry normalizer.
//!
//! Turns loosely typed [`RawEntry`] records into the fixed [`AppEntry`]
//! shape. Normalization never fails: a value that cannot be interpreted is
//! dropped and reported as a [`ParseWarning`].

pub mod date;
pub mod identity;
pub mod location;
pub mod raw;
pub mod size;
pub mod url;

use thiserror::Error;

use crate::model::AppEntry;

pub use date::normalize_date;
pub use identity::{identity_key, IdentityRules, IDENTITY_RULES_VERSION};
pub use location::{resolve_install_location, resolve_install_location_with, LocationLookups};
pub use raw::{value_names, Hive, RawEntry, SourceViewId};
pub use size::parse_size;
pub use url::normalize_url;

/// Non-fatal problem found while interpreting one record.
///
/// `row` names where the record came from: a registry key, a CSV row number,
/// or an index into a structured entry list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseWarning {
    #[error("{row}: ignored unparseable {field} value {value:?}")]
    Field { row: String, field: &'static str, value: String },

    #[error("{row}: skipped ({reason})")]
    SkippedRow { row: String, reason: String },
}

/// Result of normalizing one raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub entry: AppEntry,
    pub warnings: Vec<ParseWarning>,
}

/// Normalize a raw uninstall record.
///
/// The display name is taken as-is (trimmed); callers decide what to do with
/// entries whose name or identity key is empty. Install locations expand
/// variables from the process environment.
pub fn normalize_entry(raw: &RawEntry) -> NormalizedEntry {
    normalize_entry_with(raw, LocationLookups::process())
}

/// [`normalize_entry`] with explicit environment and App Paths lookups.
pub fn normalize_entry_with(raw: &RawEntry, lookups: LocationLookups<'_>) -> NormalizedEntry {
    let row = raw.describe();
    let mut warnings = Vec::new();

    let mut entry = AppEntry::new(raw.text(value_names::DISPLAY_NAME).unwrap_or_default());
    entry.architecture = raw.view.architecture;
    entry.version = raw.text(value_names::DISPLAY_VERSION).map(str::to_string);
    entry.publisher = raw.text(value_names::PUBLISHER).map(str::to_string);

    if let Some(text) = raw.text(value_names::INSTALL_DATE) {
        entry.install_date = normalize_date(text);
        if entry.install_date.is_none() {
            warnings.push(ParseWarning::Field {
                row: row.clone(),
                field: "install_date",
                value: text.to_string(),
            });
        }
    }

    if let Some(text) = raw.text(value_names::ESTIMATED_SIZE) {
        // Registry sizes are KiB counts; exports sometimes carry "12 MB".
        entry.size_bytes = size::from_kibibytes(text).or_else(|| parse_size(text));
        if entry.size_bytes.is_none() {
            warnings.push(ParseWarning::Field {
                row: row.clone(),
                field: "size_bytes",
                value: text.to_string(),
            });
        }
    }

    entry.uninstall_command = raw
        .text(value_names::UNINSTALL_STRING)
        .or_else(|| raw.text(value_names::QUIET_UNINSTALL_STRING))
        .map(str::to_string);
    entry.install_location = resolve_install_location_with(raw, lookups);
    entry.website =
        [value_names::URL_INFO_ABOUT, value_names::URL_UPDATE_INFO, value_names::HELP_LINK]
            .iter()
            .find_map(|name| raw.text(name))
            .and_then(normalize_url);
    entry.install_source = Some(row);

    NormalizedEntry { entry, warnings }
}
