//! Reconciliation of a reference scan against the current scan.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{AppEntry, ScanRecord};

/// Whether a reference entry is present in the current scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    Installed,
    Missing,
}

impl InstallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallStatus::Installed => "installed",
            InstallStatus::Missing => "missing",
        }
    }
}

/// One reference entry annotated with its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciledEntry<'a> {
    pub reference_entry: &'a AppEntry,
    pub status: InstallStatus,
    pub matched_current: Option<&'a AppEntry>,
}

impl ReconciledEntry<'_> {
    /// True when the matched current entry reports a different version.
    ///
    /// Informational only; status never depends on versions.
    pub fn version_changed(&self) -> bool {
        match self.matched_current {
            Some(current) => {
                let before = self.reference_entry.version.as_deref().filter(|v| !v.is_empty());
                let now = current.version.as_deref().filter(|v| !v.is_empty());
                before.is_some() && now.is_some() && before != now
            }
            None => false,
        }
    }
}

/// Classify every reference entry by exact identity-key match.
///
/// Output has one item per reference entry, in reference order.
pub fn reconcile<'a>(
    current: &'a ScanRecord,
    reference: &'a ScanRecord,
) -> Vec<ReconciledEntry<'a>> {
    let index: HashMap<&str, &AppEntry> =
        current.entries().iter().map(|entry| (entry.identity_key(), entry)).collect();

    reference
        .entries()
        .iter()
        .map(|reference_entry| match index.get(reference_entry.identity_key()) {
            Some(matched) => ReconciledEntry {
                reference_entry,
                status: InstallStatus::Installed,
                matched_current: Some(*matched),
            },
            None => ReconciledEntry {
                reference_entry,
                status: InstallStatus::Missing,
                matched_current: None,
            },
        })
        .collect()
}

/// Installed/missing counts for a reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub total: usize,
    pub installed: usize,
    pub missing: usize,
    pub version_changed: usize,
}

impl From<&[ReconciledEntry<'_>]> for ReconciliationSummary {
    fn from(results: &[ReconciledEntry<'_>]) -> Self {
        let mut summary = Self { total: results.len(), ..Self::default() };
        for result in results {
            match result.status {
                InstallStatus::Installed => summary.installed += 1,
                InstallStatus::Missing => summary.missing += 1,
            }
            if result.version_changed() {
                summary.version_changed += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanOrigin;
    use chrono::Utc;

    #[test]
    fn empty_reference_yields_nothing() {
        let current = ScanRecord::new(ScanOrigin::Current, Utc::now(), vec![AppEntry::new("Foo")]);
        let reference = ScanRecord::new(ScanOrigin::Reference, Utc::now(), Vec::new());
        assert!(reconcile(&current, &reference).is_empty());
    }

    #[test]
    fn version_change_is_informational() {
        let current = ScanRecord::new(
            ScanOrigin::Current,
            Utc::now(),
            vec![AppEntry::new("Foo").with_version("2.0")],
        );
        let reference = ScanRecord::new(
            ScanOrigin::Reference,
            Utc::now(),
            vec![AppEntry::new("Foo").with_version("1.0")],
        );
        let results = reconcile(&current, &reference);
        assert_eq!(results[0].status, InstallStatus::Installed);
        assert!(results[0].version_changed());
        let summary = ReconciliationSummary::from(results.as_slice());
        assert_eq!((summary.installed, summary.missing, summary.version_changed), (1, 0, 1));
    }
}
