use inventory_core::model::Architecture;
use inventory_core::normalize::{Hive, SourceViewId};
use inventory_core::scanner::SnapshotView;
use inventory_core::{
    load_reference, reconcile, save_scan, scan_current, version, GroupRegistry, InstallStatus,
    RawEntry, ScanOptions, SourceRegistry,
};
use tempfile::tempdir;

#[test]
fn version_is_non_empty() {
    assert!(!version().is_empty());
}

#[test]
fn scan_save_reload_and_reconcile() {
    let dir = tempdir().expect("tempdir");
    let id = SourceViewId::new(Hive::LocalMachine, Architecture::X64);

    let mut before = SourceRegistry::new();
    before.register(SnapshotView::new(
        id,
        vec![
            RawEntry::new(id, "{A}").with_value("DisplayName", "Alpha 1.0"),
            RawEntry::new(id, "{B}").with_value("DisplayName", "Beta"),
        ],
    ));
    let baseline = scan_current(&before, &ScanOptions::default());
    let path = dir.path().join("baseline.yaml");
    save_scan(&baseline.record, &path).expect("save baseline");

    let mut after = SourceRegistry::new();
    after.register(SnapshotView::new(
        id,
        vec![RawEntry::new(id, "{A}").with_value("DisplayName", "Alpha 1.1")],
    ));
    let current = scan_current(&after, &ScanOptions::default());

    let reference = load_reference(&path).expect("load baseline");
    let results = reconcile(&current.record, &reference.record);
    let statuses: Vec<(&str, InstallStatus)> =
        results.iter().map(|r| (r.reference_entry.identity_key(), r.status)).collect();
    assert_eq!(
        statuses,
        vec![("alpha", InstallStatus::Installed), ("beta", InstallStatus::Missing)]
    );

    // Group lookups use the same key, so a rename by version does not lose the group.
    let mut groups = GroupRegistry::in_memory().expect("registry");
    let group = groups.create_group("Daily").expect("create");
    groups.assign(reference.record.entries()[0].identity_key(), group.id).expect("assign");
    assert_eq!(groups.lookup(current.record.entries()[0].identity_key()), Some(group.id));
}
