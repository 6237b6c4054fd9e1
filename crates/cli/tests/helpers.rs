use std::path::Path;

use app_inventory::commands::key_from_arg;
use app_inventory::{canonicalize_or_current, default_scan_file_name, infer_inventory_name_with};
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_resolves_existing_paths() {
    let tmp = tempdir().expect("tempdir");
    let nested = tmp.path().join("nested");
    std::fs::create_dir_all(&nested).expect("create nested");

    let result = canonicalize_or_current(&nested).expect("canonicalize");
    assert_eq!(result, nested.canonicalize().expect("canonicalize nested"));
}

#[test]
fn canonicalize_or_current_keeps_missing_absolute_paths() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("not-yet");
    assert_eq!(canonicalize_or_current(&missing).expect("path"), missing);
}

#[test]
fn canonicalize_or_current_anchors_relative_paths_at_cwd() {
    let cwd = std::env::current_dir().expect("cwd");
    let result = canonicalize_or_current(Path::new("surely-missing-dir")).expect("path");
    assert_eq!(result, cwd.join("surely-missing-dir"));
}

#[test]
fn inventory_name_prefers_machine_name() {
    let name = infer_inventory_name_with(|var| match var {
        "COMPUTERNAME" => Some("DESK-01".to_string()),
        _ => Some("ignored".to_string()),
    });
    assert_eq!(name, "DESK-01");

    let name = infer_inventory_name_with(|var| (var == "HOSTNAME").then(|| "box".to_string()));
    assert_eq!(name, "box");

    let name = infer_inventory_name_with(|_| Some("  ".to_string()));
    assert_eq!(name, "this-machine");
}

#[test]
fn default_scan_file_name_is_timestamped() {
    let now = Utc.with_ymd_and_hms(2024, 1, 31, 15, 45, 0).single().expect("timestamp");
    assert_eq!(default_scan_file_name(now), "scan-20240131-154500.json");
}

#[test]
fn names_and_keys_from_arguments() {
    assert_eq!(key_from_arg("Foo Editor 2.0 (x64)", false).expect("key"), "foo editor");
    assert_eq!(key_from_arg("  foo editor ", true).expect("key"), "foo editor");
    assert!(key_from_arg("   ", false).is_err());
    assert!(key_from_arg("", true).is_err());
}
