//! Core data model for installed-software inventories.
//!
//! This module contains:
//! - `AppEntry`: one canonical, normalized application record.
//! - `ScanRecord`: an immutable snapshot of entries (live or reference).
//! - `Architecture` / `ScanOrigin`: small enums shared by every layer.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::identity_key;
use crate::scanner::merge::{merge_by_identity, MergeCandidate};

/// Processor architecture an entry was registered under.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
    #[default]
    Unknown,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Unknown => "unknown",
        }
    }

    /// Lenient parse used by importers. Returns `None` for text that does not
    /// name an architecture at all (callers decide whether that is a warning).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "x64" | "amd64" | "x86_64" | "x86-64" | "64" | "64-bit" | "64bit" => {
                Some(Architecture::X64)
            }
            "x86" | "i386" | "i686" | "32" | "32-bit" | "32bit" => Some(Architecture::X86),
            "unknown" | "" => Some(Architecture::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a scan describes the live machine or an imported reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOrigin {
    Current,
    Reference,
}

impl ScanOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanOrigin::Current => "current",
            ScanOrigin::Reference => "reference",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "current" => Some(ScanOrigin::Current),
            "reference" => Some(ScanOrigin::Reference),
            _ => None,
        }
    }
}

/// One installed application after normalization.
///
/// `name` and `identity_key` are kept private so the key can only ever be
/// produced by [`identity_key`]; every other field is plain data and may be
/// adjusted freely.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AppEntry {
    name: String,
    identity_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstall_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub architecture: Architecture,
}

impl AppEntry {
    /// Create an entry with only a name; every optional field starts absent.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let identity_key = identity_key(&name);
        Self {
            name,
            identity_key,
            version: None,
            publisher: None,
            install_date: None,
            size_bytes: None,
            install_source: None,
            uninstall_command: None,
            install_location: None,
            website: None,
            architecture: Architecture::Unknown,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity_key(&self) -> &str {
        &self.identity_key
    }

    /// Replace the display name, recomputing the identity key.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.identity_key = identity_key(&self.name);
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    /// Number of optional fields that carry a value.
    ///
    /// Architecture counts when it is known; name and identity key always
    /// exist and are not counted.
    pub fn present_fields(&self) -> usize {
        [
            self.version.is_some(),
            self.publisher.is_some(),
            self.install_date.is_some(),
            self.size_bytes.is_some(),
            self.install_source.is_some(),
            self.uninstall_command.is_some(),
            self.install_location.is_some(),
            self.website.is_some(),
            self.architecture != Architecture::Unknown,
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// Immutable snapshot of installed applications.
///
/// Entries are unique by identity key; construction merges duplicates and
/// drops entries whose key is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    captured_at: DateTime<Utc>,
    origin: ScanOrigin,
    entries: Vec<AppEntry>,
}

impl ScanRecord {
    /// Build a record, merging entries that share an identity key.
    ///
    /// Order of first appearance is preserved; when duplicates collide, the
    /// scanner's merge policy picks the survivor with the input position as
    /// the encounter order.
    pub fn new(origin: ScanOrigin, captured_at: DateTime<Utc>, entries: Vec<AppEntry>) -> Self {
        let candidates = entries
            .into_iter()
            .filter(|entry| !entry.identity_key().is_empty())
            .enumerate()
            .map(|(position, entry)| MergeCandidate::new(entry, position, String::new()))
            .collect();
        Self { captured_at, origin, entries: merge_by_identity(candidates) }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn origin(&self) -> ScanOrigin {
        self.origin
    }

    pub fn entries(&self) -> &[AppEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by identity key (linear; use `reconcile` for bulk work).
    pub fn find(&self, identity_key: &str) -> Option<&AppEntry> {
        self.entries.iter().find(|e| e.identity_key() == identity_key)
    }
}
