use std::fs;
use std::time::Duration;

use inventory_core::model::{AppEntry, Architecture};
use inventory_core::normalize::{Hive, SourceViewId};
use inventory_core::scanner::{
    merge_by_identity, MergeCandidate, ScanBudget, SnapshotView, SourceError, SourceView,
};
use inventory_core::{
    scan_current, CancelToken, ParseWarning, RawEntry, ScanOptions, ScanWarning, SourceRegistry,
};
use proptest::prelude::*;
use tempfile::tempdir;

fn view_id(hive: Hive, architecture: Architecture) -> SourceViewId {
    SourceViewId::new(hive, architecture)
}

fn raw(id: SourceViewId, key: &str, name: &str) -> RawEntry {
    RawEntry::new(id, key).with_value("DisplayName", name)
}

/// View that trips the cancel token after handing out its entries, like a
/// user pressing cancel while the first hive is being read.
struct CancelsAfterRead {
    inner: SnapshotView,
    token: CancelToken,
}

impl SourceView for CancelsAfterRead {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn id(&self) -> SourceViewId {
        self.inner.id()
    }

    fn enumerate(&self, budget: &ScanBudget) -> Result<Vec<RawEntry>, SourceError> {
        let entries = self.inner.enumerate(budget)?;
        self.token.cancel();
        Ok(entries)
    }
}

#[test]
fn duplicate_across_views_keeps_the_most_complete_entry() {
    let x86 = view_id(Hive::LocalMachine, Architecture::X86);
    let x64 = view_id(Hive::LocalMachine, Architecture::X64);

    let mut registry = SourceRegistry::new();
    registry
        .register(SnapshotView::new(
            x86,
            vec![raw(x86, "{F}", "Foo").with_value("DisplayVersion", "")],
        ))
        .register(SnapshotView::new(
            x64,
            vec![raw(x64, "{F}", "Foo").with_value("DisplayVersion", "2.0")],
        ));

    let outcome = scan_current(&registry, &ScanOptions::default());
    assert_eq!(outcome.record.len(), 1);
    let foo = outcome.record.find("foo").expect("foo merged");
    assert_eq!(foo.version.as_deref(), Some("2.0"));
    assert_eq!(foo.architecture, Architecture::X64);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn equal_entries_prefer_the_64_bit_one() {
    let x86_entry = AppEntry::new("Foo").with_architecture(Architecture::X86);
    let x64_entry = AppEntry::new("Foo").with_architecture(Architecture::X64);
    let x86 = MergeCandidate::new(x86_entry, 0, "a");
    let x64 = MergeCandidate::new(x64_entry, 1, "b");

    let merged = merge_by_identity(vec![x86.clone(), x64.clone()]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].architecture, Architecture::X64);

    let merged = merge_by_identity(vec![x64, x86]);
    assert_eq!(merged[0].architecture, Architecture::X64);
}

#[test]
fn full_ties_go_to_the_earlier_view() {
    let first = MergeCandidate::new(AppEntry::new("Foo").with_publisher("First"), 0, "k");
    let second = MergeCandidate::new(AppEntry::new("Foo").with_publisher("Second"), 1, "k");
    let merged = merge_by_identity(vec![second, first]);
    assert_eq!(merged[0].publisher.as_deref(), Some("First"));
}

#[test]
fn unreadable_view_is_skipped_with_a_warning() {
    let hklm = view_id(Hive::LocalMachine, Architecture::X64);
    let hkcu = view_id(Hive::CurrentUser, Architecture::X64);

    let mut registry = SourceRegistry::new();
    registry
        .register(SnapshotView::new(hklm, vec![raw(hklm, "{A}", "Alpha")]))
        .register(SnapshotView::unavailable(hkcu, "access denied"));

    let outcome = scan_current(&registry, &ScanOptions::default());
    assert_eq!(outcome.record.len(), 1);
    assert_eq!(
        outcome.warnings,
        vec![ScanWarning::SourceUnavailable {
            source: "HKCU64".to_string(),
            reason: "source unavailable: access denied".to_string(),
        }]
    );
    assert!(!outcome.all_sources_failed(&registry));
}

#[test]
fn registered_app_paths_locate_bare_executables() {
    let hklm = view_id(Hive::LocalMachine, Architecture::X64);
    let mut registry = SourceRegistry::new();
    let foo = raw(hklm, "{F}", "Foo").with_value("DisplayIcon", "foo.exe,0");
    registry.register(
        SnapshotView::new(hklm, vec![foo]).with_app_path("Foo.exe", r"C:\Apps\Foo\foo.exe"),
    );

    let outcome = scan_current(&registry, &ScanOptions::default());
    let foo = outcome.record.find("foo").expect("foo scanned");
    assert_eq!(foo.install_location.as_deref(), Some(r"C:\Apps\Foo"));
}

#[test]
fn all_views_failing_is_distinguishable_from_nothing_installed() {
    let hklm = view_id(Hive::LocalMachine, Architecture::X64);
    let mut failing = SourceRegistry::new();
    failing.register(SnapshotView::unavailable(hklm, "hive missing"));
    let outcome = scan_current(&failing, &ScanOptions::default());
    assert!(outcome.record.is_empty());
    assert!(outcome.all_sources_failed(&failing));

    let mut empty = SourceRegistry::new();
    empty.register(SnapshotView::new(hklm, Vec::new()));
    let outcome = scan_current(&empty, &ScanOptions::default());
    assert!(outcome.record.is_empty());
    assert!(outcome.warnings.is_empty());
    assert!(!outcome.all_sources_failed(&empty));
}

#[test]
fn cancellation_keeps_completed_views_and_reports_the_rest() {
    let hklm64 = view_id(Hive::LocalMachine, Architecture::X64);
    let hklm32 = view_id(Hive::LocalMachine, Architecture::X86);
    let token = CancelToken::new();

    let mut registry = SourceRegistry::new();
    registry
        .register(CancelsAfterRead {
            inner: SnapshotView::new(hklm64, vec![raw(hklm64, "{A}", "Alpha")]),
            token: token.clone(),
        })
        .register(SnapshotView::new(hklm32, vec![raw(hklm32, "{B}", "Beta")]));

    let options = ScanOptions { cancel: Some(token), ..ScanOptions::default() };
    let outcome = scan_current(&registry, &options);

    assert_eq!(outcome.record.len(), 1);
    assert!(outcome.record.find("alpha").is_some());
    assert_eq!(
        outcome.warnings,
        vec![ScanWarning::Cancelled {
            completed: vec!["HKLM64".to_string()],
            skipped: vec!["HKLM32".to_string()],
        }]
    );
}

#[test]
fn zero_timeout_skips_every_view() {
    let hklm = view_id(Hive::LocalMachine, Architecture::X64);
    let mut registry = SourceRegistry::new();
    registry.register(SnapshotView::new(hklm, vec![raw(hklm, "{A}", "Alpha")]));

    let options = ScanOptions { timeout: Some(Duration::ZERO), ..ScanOptions::default() };
    let outcome = scan_current(&registry, &options);
    assert!(outcome.record.is_empty());
    assert!(outcome.all_sources_failed(&registry));
    assert!(matches!(
        outcome.warnings.as_slice(),
        [ScanWarning::Cancelled { completed, skipped }]
            if completed.is_empty() && skipped.len() == 1
    ));
}

#[test]
fn unnamed_keys_are_counted_once_per_view() {
    let hklm = view_id(Hive::LocalMachine, Architecture::X64);
    let entries = vec![
        raw(hklm, "{A}", "Alpha"),
        RawEntry::new(hklm, "KB100").with_value("Publisher", "Vendor"),
        RawEntry::new(hklm, "KB200"),
    ];
    let mut registry = SourceRegistry::new();
    registry.register(SnapshotView::new(hklm, entries));

    let outcome = scan_current(&registry, &ScanOptions::default());
    assert_eq!(outcome.record.len(), 1);
    assert_eq!(
        outcome.warnings,
        vec![ScanWarning::Parse(ParseWarning::SkippedRow {
            row: "HKLM64".to_string(),
            reason: "2 keys without a display name".to_string(),
        })]
    );
}

#[test]
fn snapshot_file_drives_a_full_scan() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("machine.yaml");
    fs::write(
        &path,
        r#"
views:
  - hive: local_machine
    architecture: x64
    entries:
      - key: "{A}"
        values:
          DisplayName: Alpha Suite (x64)
          DisplayVersion: "5.0"
          EstimatedSize: 1024
          InstallDate: "20240131"
  - hive: local_machine
    architecture: x86
    entries:
      - key: "{A32}"
        values:
          DisplayName: Alpha Suite
  - name: user
    hive: current_user
    architecture: unknown
    error: not loaded
"#,
    )
    .expect("write snapshot");

    let registry = SourceRegistry::from_snapshot_file(&path).expect("load snapshot");
    assert_eq!(registry.names(), vec!["HKLM64", "HKLM32", "user"]);

    let outcome = scan_current(&registry, &ScanOptions::default());
    assert_eq!(outcome.record.len(), 1);
    let alpha = outcome.record.find("alpha suite").expect("alpha");
    assert_eq!(alpha.name(), "Alpha Suite (x64)");
    assert_eq!(alpha.size_bytes, Some(1024 * 1024));
    assert_eq!(alpha.install_source.as_deref(), Some("HKLM64\\{A}"));
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn scan_output_is_sorted_by_identity_key() {
    let hklm = view_id(Hive::LocalMachine, Architecture::X64);
    let mut registry = SourceRegistry::new();
    registry.register(SnapshotView::new(
        hklm,
        vec![raw(hklm, "1", "Zed"), raw(hklm, "2", "alpha"), raw(hklm, "3", "Mid")],
    ));
    let outcome = scan_current(&registry, &ScanOptions::default());
    let keys: Vec<&str> = outcome.record.entries().iter().map(|e| e.identity_key()).collect();
    assert_eq!(keys, vec!["alpha", "mid", "zed"]);
}

fn candidate_strategy() -> impl Strategy<Value = MergeCandidate> {
    (
        prop::sample::select(vec!["Foo", "FOO (x64)", "Bar", "Baz 2.0"]),
        prop::option::of(prop::sample::select(vec!["1.0", "2.0", ""])),
        prop::option::of(prop::sample::select(vec!["Acme", "Initech"])),
        prop::sample::select(vec![Architecture::X86, Architecture::X64, Architecture::Unknown]),
        0usize..4,
    )
        .prop_map(|(name, version, publisher, architecture, rank)| {
            let mut entry = AppEntry::new(name).with_architecture(architecture);
            entry.version = version.map(str::to_string);
            entry.publisher = publisher.map(str::to_string);
            MergeCandidate::new(entry, rank, format!("key-{rank}"))
        })
}

fn sorted(mut entries: Vec<AppEntry>) -> Vec<AppEntry> {
    entries.sort_by(|a, b| a.identity_key().cmp(b.identity_key()));
    entries
}

proptest! {
    #[test]
    fn merge_choice_does_not_depend_on_input_order(
        (original, shuffled) in prop::collection::vec(candidate_strategy(), 1..12)
            .prop_flat_map(|cands| (Just(cands.clone()), Just(cands).prop_shuffle()))
    ) {
        let a = sorted(merge_by_identity(original));
        let b = sorted(merge_by_identity(shuffled));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn merged_keys_are_unique(cands in prop::collection::vec(candidate_strategy(), 0..12)) {
        let merged = merge_by_identity(cands);
        let mut keys: Vec<&str> = merged.iter().map(|e| e.identity_key()).collect();
        let before = keys.len();
        keys.sort_unstable();
        keys.dedup();
        prop_assert_eq!(keys.len(), before);
    }
}
