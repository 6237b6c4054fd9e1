//! File-backed source views.
//!
//! A snapshot file holds raw uninstall records grouped by view, so scans can
//! be replayed on machines without a registry:
//!
//! ```yaml
//! views:
//!   - hive: local_machine
//!     architecture: x64
//!     entries:
//!       - key: "{6F2C...}"
//!         values:
//!           DisplayName: Foo
//!           EstimatedSize: 2048
//!   - hive: current_user
//!     architecture: x86
//!     error: access denied
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::value::RawValue;

use super::{ScanBudget, SourceError, SourceView};
use crate::model::Architecture;
use crate::normalize::{Hive, RawEntry, SourceViewId};

/// `V` is the per-format carrier for registry values; see [`ScalarText`].
#[derive(Debug, Deserialize)]
struct SnapshotFile<V> {
    views: Vec<ViewSection<V>>,
    /// Executable name to registered path, as under the `App Paths` key.
    #[serde(default)]
    app_paths: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ViewSection<V> {
    #[serde(default)]
    name: Option<String>,
    hive: Hive,
    #[serde(default)]
    architecture: Architecture,
    /// Simulates a view that cannot be opened.
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "Vec::new")]
    entries: Vec<EntrySection<V>>,
}

#[derive(Debug, Deserialize)]
struct EntrySection<V> {
    key: String,
    #[serde(default = "BTreeMap::new")]
    values: BTreeMap<String, V>,
}

/// Registry value text exactly as written in the file.
///
/// Values are strings or DWORDs in the registry, but a snapshot author writes
/// `DisplayVersion: 2.0` unquoted; reading that through a number would turn it
/// into `2`. YAML scalars are taken as their source text, JSON tokens through
/// their raw form.
trait ScalarText {
    fn into_text(self) -> Option<String>;
}

impl ScalarText for Option<String> {
    fn into_text(self) -> Option<String> {
        self
    }
}

impl ScalarText for Box<RawValue> {
    fn into_text(self) -> Option<String> {
        let raw = self.get().trim();
        if raw == "null" {
            None
        } else if raw.starts_with('"') {
            serde_json::from_str(raw).ok()
        } else {
            Some(raw.to_string())
        }
    }
}

/// One view's worth of raw records loaded from a snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    name: String,
    id: SourceViewId,
    error: Option<String>,
    entries: Vec<RawEntry>,
    /// Keyed by lower-cased executable name.
    app_paths: BTreeMap<String, String>,
}

impl SnapshotView {
    pub fn new(id: SourceViewId, entries: Vec<RawEntry>) -> Self {
        Self { name: id.tag(), id, error: None, entries, app_paths: BTreeMap::new() }
    }

    /// A view whose enumeration always fails with `reason`.
    pub fn unavailable(id: SourceViewId, reason: impl Into<String>) -> Self {
        Self {
            name: id.tag(),
            id,
            error: Some(reason.into()),
            entries: Vec::new(),
            app_paths: BTreeMap::new(),
        }
    }

    /// Register `exe_name` (e.g. `foo.exe`) as installed at `path`.
    pub fn with_app_path(mut self, exe_name: &str, path: impl Into<String>) -> Self {
        self.app_paths.insert(exe_name.to_lowercase(), path.into());
        self
    }

    /// Parse snapshot text; `json` selects JSON over YAML.
    pub fn parse_all(text: &str, json: bool) -> Result<Vec<Self>, SourceError> {
        if json {
            let file: SnapshotFile<Box<RawValue>> =
                serde_json::from_str(text).map_err(|e| SourceError::Parse(e.to_string()))?;
            Ok(Self::from_file(file))
        } else {
            let file: SnapshotFile<Option<String>> =
                serde_yaml::from_str(text).map_err(|e| SourceError::Parse(e.to_string()))?;
            Ok(Self::from_file(file))
        }
    }

    fn from_file<V: ScalarText>(file: SnapshotFile<V>) -> Vec<Self> {
        let app_paths: BTreeMap<String, String> = file
            .app_paths
            .into_iter()
            .map(|(exe, path)| (exe.to_lowercase(), path))
            .collect();

        file.views
            .into_iter()
            .map(|section| {
                let id = SourceViewId::new(section.hive, section.architecture);
                let entries = section
                    .entries
                    .into_iter()
                    .map(|entry| RawEntry {
                        view: id,
                        key_path: entry.key,
                        values: entry
                            .values
                            .into_iter()
                            .filter_map(|(name, value)| value.into_text().map(|text| (name, text)))
                            .collect(),
                    })
                    .collect();
                Self {
                    name: section.name.unwrap_or_else(|| id.tag()),
                    id,
                    error: section.error,
                    entries,
                    app_paths: app_paths.clone(),
                }
            })
            .collect()
    }

    /// Load every view from a `.json`, `.yaml` or `.yml` snapshot file.
    pub fn load_all(path: &Path) -> Result<Vec<Self>, SourceError> {
        let text = std::fs::read_to_string(path)?;
        let json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        Self::parse_all(&text, json)
    }
}

impl SourceView for SnapshotView {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> SourceViewId {
        self.id
    }

    fn enumerate(&self, budget: &ScanBudget) -> Result<Vec<RawEntry>, SourceError> {
        if let Some(reason) = &self.error {
            return Err(SourceError::Unavailable(reason.clone()));
        }
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if budget.exhausted() {
                return Err(SourceError::Interrupted);
            }
            out.push(entry.clone());
        }
        Ok(out)
    }

    fn app_path(&self, exe_name: &str) -> Option<String> {
        self.app_paths.get(&exe_name.to_lowercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
views:
  - hive: local_machine
    architecture: x64
    entries:
      - key: "{A}"
        values:
          DisplayName: Foo
          EstimatedSize: 2048
  - hive: current_user
    architecture: x86
    error: access denied
"#;

    #[test]
    fn parses_views_and_scalar_values() {
        let views = SnapshotView::parse_all(SAMPLE, false).expect("parse");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name(), "HKLM64");
        let entries = views[0].enumerate(&ScanBudget::unlimited()).expect("enumerate");
        assert_eq!(entries[0].text("EstimatedSize"), Some("2048"));
        assert_eq!(entries[0].view.architecture, Architecture::X64);
    }

    #[test]
    fn error_views_are_unavailable() {
        let views = SnapshotView::parse_all(SAMPLE, false).expect("parse");
        match views[1].enumerate(&ScanBudget::unlimited()) {
            Err(SourceError::Unavailable(reason)) => assert_eq!(reason, "access denied"),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn unquoted_scalars_keep_their_source_text() {
        let yaml = r#"
views:
  - hive: local_machine
    architecture: x64
    entries:
      - key: "{A}"
        values:
          DisplayName: Foo
          DisplayVersion: 2.0
          Comments: ~
      - key: "{B}"
        values:
          DisplayName: Bar
          DisplayVersion: 1.10
          SystemComponent: true
"#;
        let views = SnapshotView::parse_all(yaml, false).expect("parse yaml");
        let entries = views[0].enumerate(&ScanBudget::unlimited()).expect("enumerate");
        assert_eq!(entries[0].text("DisplayVersion"), Some("2.0"));
        assert_eq!(entries[0].values.get("Comments"), None);
        assert_eq!(entries[1].text("DisplayVersion"), Some("1.10"));
        assert_eq!(entries[1].text("SystemComponent"), Some("true"));

        let json = r#"{"views": [{"hive": "current_user", "entries": [
            {"key": "{C}", "values": {"DisplayName": "Baz", "DisplayVersion": 1.10,
                                      "EstimatedSize": 512, "Publisher": null}}
        ]}]}"#;
        let views = SnapshotView::parse_all(json, true).expect("parse json");
        let entries = views[0].enumerate(&ScanBudget::unlimited()).expect("enumerate");
        assert_eq!(entries[0].text("DisplayName"), Some("Baz"));
        assert_eq!(entries[0].text("DisplayVersion"), Some("1.10"));
        assert_eq!(entries[0].text("EstimatedSize"), Some("512"));
        assert_eq!(entries[0].values.get("Publisher"), None);
    }

    #[test]
    fn app_paths_are_shared_by_every_view() {
        let text = r#"
app_paths:
  Foo.EXE: C:\Apps\Foo\foo.exe
views:
  - hive: local_machine
  - hive: current_user
"#;
        let views = SnapshotView::parse_all(text, false).expect("parse");
        for view in &views {
            assert_eq!(view.app_path("foo.exe").as_deref(), Some(r"C:\Apps\Foo\foo.exe"));
            assert_eq!(view.app_path("bar.exe"), None);
        }
    }

    #[test]
    fn rejects_malformed_files() {
        assert!(matches!(SnapshotView::parse_all("{", true), Err(SourceError::Parse(_))));
    }
}
