use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Architecture;

/// Registry value names read from an uninstall key.
pub mod value_names {
    pub const DISPLAY_NAME: &str = "DisplayName";
    pub const DISPLAY_VERSION: &str = "DisplayVersion";
    pub const PUBLISHER: &str = "Publisher";
    pub const INSTALL_DATE: &str = "InstallDate";
    pub const ESTIMATED_SIZE: &str = "EstimatedSize";
    pub const INSTALL_LOCATION: &str = "InstallLocation";
    pub const UNINSTALL_STRING: &str = "UninstallString";
    pub const QUIET_UNINSTALL_STRING: &str = "QuietUninstallString";
    pub const DISPLAY_ICON: &str = "DisplayIcon";
    pub const MODIFY_PATH: &str = "ModifyPath";
    pub const URL_INFO_ABOUT: &str = "URLInfoAbout";
    pub const URL_UPDATE_INFO: &str = "URLUpdateInfo";
    pub const HELP_LINK: &str = "HelpLink";
}

/// Registry hive an uninstall view lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hive {
    LocalMachine,
    CurrentUser,
}

impl Hive {
    pub fn short_name(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
        }
    }
}

/// Identifies one enumeration view: a hive seen through a 32- or 64-bit lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceViewId {
    pub hive: Hive,
    pub architecture: Architecture,
}

impl SourceViewId {
    pub fn new(hive: Hive, architecture: Architecture) -> Self {
        Self { hive, architecture }
    }

    /// Short tag such as `HKLM64` used in `install_source` and warnings.
    pub fn tag(&self) -> String {
        let bits = match self.architecture {
            Architecture::X64 => "64",
            Architecture::X86 => "32",
            Architecture::Unknown => "",
        };
        format!("{}{}", self.hive.short_name(), bits)
    }
}

impl fmt::Display for SourceViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// One raw uninstall record exactly as a source produced it.
///
/// Values are loosely typed strings keyed by registry value name. Nothing
/// here is trusted; [`super::normalize_entry`] turns it into an `AppEntry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub view: SourceViewId,
    pub key_path: String,
    pub values: BTreeMap<String, String>,
}

impl RawEntry {
    pub fn new(view: SourceViewId, key_path: impl Into<String>) -> Self {
        Self { view, key_path: key_path.into(), values: BTreeMap::new() }
    }

    /// Builder-style helper used by sources and tests.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Look up a value by name (registry names are case-insensitive).
    ///
    /// Returns the trimmed text, or `None` when missing or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        let value = match self.values.get(name) {
            Some(v) => v,
            None => {
                self.values.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v)?
            }
        };
        let trimmed = value.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// `HKLM64\SOFTWARE\...\{key}` style description of where this came from.
    pub fn describe(&self) -> String {
        format!("{}\\{}", self.view.tag(), self.key_path)
    }
}
