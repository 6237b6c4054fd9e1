use std::path::{Path, PathBuf};

use inventory_core::db::{
    load_inventory_config, resolve_data_dir_with, write_inventory_config, DbError, GroupDb,
    InventoryConfig, InventoryContext, InventoryLayout, ScanSettings, CURRENT_SCHEMA_VERSION,
    DATA_DIR_ENV,
};
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn fresh_database_is_migrated_to_the_current_schema() {
    let dir = tempdir().expect("tempdir");
    let db = GroupDb::open(&dir.path().join("groups.db")).expect("open");
    assert_eq!(db.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
}

#[test]
fn version_one_database_gains_the_color_column() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("groups.db");
    {
        let conn = Connection::open(&path).expect("raw open");
        conn.execute_batch(
            r#"
            CREATE TABLE groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name TEXT NOT NULL
            );
            CREATE TABLE assignments (
                identity_key TEXT PRIMARY KEY NOT NULL,
                group_id INTEGER NOT NULL
            );
            INSERT INTO groups (display_name) VALUES ('Legacy');
            PRAGMA user_version = 1;
            "#,
        )
        .expect("seed v1 schema");
    }

    let db = GroupDb::open(&path).expect("open migrates");
    assert_eq!(db.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
    let groups = db.list_groups().expect("list");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].display_name, "Legacy");
    assert_eq!(groups[0].color, None);
}

#[test]
fn newer_schema_versions_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("groups.db");
    {
        let conn = Connection::open(&path).expect("raw open");
        conn.pragma_update(None, "user_version", 99_i32).expect("set user_version");
    }

    match GroupDb::open(&path) {
        Err(DbError::UnsupportedSchemaVersion { found, min_supported, max_supported }) => {
            assert_eq!(found, 99);
            assert_eq!(min_supported, 0);
            assert_eq!(max_supported, CURRENT_SCHEMA_VERSION);
        }
        Err(err) => panic!("expected UnsupportedSchemaVersion, got {err}"),
        Ok(_) => panic!("expected UnsupportedSchemaVersion, got Ok(_)"),
    }
}

#[test]
fn invalid_stored_colours_are_dropped_on_read() {
    let dir = tempdir().expect("tempdir");
    let db = GroupDb::open(&dir.path().join("groups.db")).expect("open");
    db.connection()
        .execute("INSERT INTO groups (display_name, color) VALUES ('Odd', 'teal')", [])
        .expect("insert");
    let groups = db.list_groups().expect("list");
    assert_eq!(groups[0].color, None);
}

#[test]
fn layout_is_computed_without_touching_disk() {
    let layout = InventoryLayout::new("/data/inv");
    assert_eq!(layout.config_path, Path::new("/data/inv/config.json"));
    assert_eq!(layout.db_path, Path::new("/data/inv/groups.db"));
    assert_eq!(layout.scan_path("a.json"), Path::new("/data/inv/scans/a.json"));
    assert_eq!(layout.db_path_relative_string(), "groups.db");
    assert_eq!(layout.resolve("other.db"), Path::new("/data/inv/other.db"));
    assert!(!layout.root.exists());
}

#[test]
fn config_round_trips_and_fills_defaults() {
    let dir = tempdir().expect("tempdir");
    let layout = InventoryLayout::new(dir.path());

    let mut config = InventoryConfig::new("desk-01", layout.db_path_relative_string());
    config.default_reference = Some("scans/baseline.csv".to_string());
    write_inventory_config(&layout, &config).expect("write");
    let loaded = load_inventory_config(&layout).expect("load");
    assert_eq!(loaded.name, "desk-01");
    assert_eq!(loaded.db.path, "groups.db");
    assert_eq!(loaded.default_reference.as_deref(), Some("scans/baseline.csv"));
    assert_eq!(loaded.scan, ScanSettings::default());

    std::fs::write(
        &layout.config_path,
        r#"{
            "name": "old",
            "config_version": "0.1.0",
            "db": {"path": "groups.db"},
            "scan": {"size_fallback": true}
        }"#,
    )
    .expect("write minimal");
    let minimal = load_inventory_config(&layout).expect("load minimal");
    assert!(minimal.scan.size_fallback);
    assert_eq!(minimal.scan.timeout_secs, Some(30));
    assert_eq!(minimal.default_reference, None);
}

#[test]
fn unbounded_scan_timeout_survives_a_reload() {
    let dir = tempdir().expect("tempdir");
    let layout = InventoryLayout::new(dir.path());
    let mut config = InventoryConfig::new("desk-01", layout.db_path_relative_string());
    config.scan.timeout_secs = None;
    write_inventory_config(&layout, &config).expect("write");

    let text = std::fs::read_to_string(&layout.config_path).expect("read config");
    assert!(text.contains("\"timeout_secs\": null"), "{text}");
    let loaded = load_inventory_config(&layout).expect("load");
    assert_eq!(loaded.scan.timeout_secs, None);
}

#[test]
fn missing_config_is_reported_with_its_path() {
    let dir = tempdir().expect("tempdir");
    let layout = InventoryLayout::new(dir.path());
    let err = load_inventory_config(&layout).expect_err("no config yet");
    assert!(err.to_string().contains("config.json"));
}

#[test]
fn data_dir_resolution_order() {
    let explicit = Path::new("/explicit");
    let env = |name: &str| match name {
        DATA_DIR_ENV => Some(PathBuf::from("/from-env")),
        _ => Some(PathBuf::from("/base")),
    };
    assert_eq!(resolve_data_dir_with(Some(explicit), env).expect("explicit"), explicit);
    assert_eq!(resolve_data_dir_with(None, env).expect("env"), PathBuf::from("/from-env"));

    let platform = |name: &str| (name != DATA_DIR_ENV).then(|| PathBuf::from("/base"));
    let resolved = resolve_data_dir_with(None, platform).expect("platform");
    assert!(resolved.ends_with("app-inventory"));
    assert!(resolved.starts_with("/base"));

    let empty_env = |name: &str| (name == DATA_DIR_ENV).then(PathBuf::new);
    assert!(resolve_data_dir_with(None, empty_env).is_err());
    assert!(resolve_data_dir_with(None, |_: &str| None).is_err());
}

#[test]
fn context_opens_config_and_registry() {
    let dir = tempdir().expect("tempdir");
    let layout = InventoryLayout::new(dir.path());
    let mut config = InventoryConfig::new("laptop", layout.db_path_relative_string());
    config.scan.timeout_secs = None;
    config.scan.size_fallback = true;
    write_inventory_config(&layout, &config).expect("write config");

    let mut ctx = InventoryContext::from_data_dir(dir.path()).expect("context");
    assert_eq!(ctx.config.name, "laptop");
    assert_eq!(ctx.db_path, layout.db_path);
    assert!(ctx.db_path.exists());

    let options = ctx.scan_options();
    assert_eq!(options.timeout, None);
    assert_eq!(options.size_fallback, Some(config.scan.size_limits.clone()));

    let group = ctx.groups.create_group("Work").expect("create");
    drop(ctx);
    let ctx = InventoryContext::from_data_dir(dir.path()).expect("reopen");
    assert!(ctx.groups.group(group.id).is_some());
}
