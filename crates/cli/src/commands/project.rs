use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use inventory_core::db::{
    write_inventory_config, InventoryConfig, InventoryLayout, ScanSettings, CURRENT_SCHEMA_VERSION,
};
use inventory_core::normalize::IDENTITY_RULES_VERSION;
use inventory_core::{default_source_registry, GroupRegistry};
use serde::Serialize;

use crate::commands::{open_context, print_dir_status};
use crate::{data_dir_or_default, infer_inventory_name};

#[derive(Serialize)]
pub struct InventoryInfoSnapshot {
    pub name: String,
    pub data_dir: String,
    pub config_file: String,
    pub config_version: String,
    pub db_path: String,
    pub schema_version: i32,
    pub scans_dir: String,
    pub default_reference: Option<String>,
    pub identity_rules: u32,
    pub scan: ScanSettings,
    pub live_sources: Vec<String>,
    pub groups: usize,
    pub assignments: usize,
}

/// Initialize a data directory.
pub fn init_command(data_dir: Option<&Path>, name: Option<String>, force: bool) -> Result<()> {
    let root = data_dir_or_default(data_dir)?;
    let layout = InventoryLayout::new(&root);

    if layout.config_path.exists() && !force {
        bail!(
            "Inventory already initialized at {} (use --force to rewrite config.json)",
            layout.root.display()
        );
    }

    let inventory_name = name.unwrap_or_else(infer_inventory_name);

    fs::create_dir_all(&layout.root)
        .with_context(|| format!("Failed to create data dir: {}", layout.root.display()))?;
    fs::create_dir_all(&layout.scans_dir)
        .with_context(|| format!("Failed to create scans dir: {}", layout.scans_dir.display()))?;

    let config = InventoryConfig::new(&inventory_name, layout.db_path_relative_string());
    write_inventory_config(&layout, &config)?;

    // Creating the registry creates and migrates the database file.
    let db_path = layout.resolve(&config.db.path);
    GroupRegistry::open(&db_path)
        .with_context(|| format!("Failed to create group database at {}", db_path.display()))?;

    println!("Initialized inventory '{}' at {}", inventory_name, layout.root.display());
    println!("Config: {}", layout.config_path.display());
    println!("Groups DB: {}", db_path.display());
    println!("Scans: {}", layout.scans_dir.display());

    Ok(())
}

/// Show configuration, paths and group store status.
pub fn info_command(data_dir: Option<&Path>, json: bool) -> Result<()> {
    let ctx = open_context(data_dir)?;
    let schema_version = ctx.groups.database().schema_version()?;
    let snapshot = InventoryInfoSnapshot {
        name: ctx.config.name.clone(),
        data_dir: ctx.layout.root.display().to_string(),
        config_file: ctx.layout.config_path.display().to_string(),
        config_version: ctx.config.config_version.clone(),
        db_path: ctx.db_path.display().to_string(),
        schema_version,
        scans_dir: ctx.layout.scans_dir.display().to_string(),
        default_reference: ctx.config.default_reference.clone(),
        identity_rules: IDENTITY_RULES_VERSION,
        scan: ctx.config.scan.clone(),
        live_sources: default_source_registry().names(),
        groups: ctx.groups.groups().count(),
        assignments: ctx.groups.assignments().len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("Inventory: {}", snapshot.name);
    println!("Data dir: {}", snapshot.data_dir);
    println!("Config: {} (version {})", snapshot.config_file, snapshot.config_version);
    println!(
        "Groups DB: {} (schema {}/{})",
        snapshot.db_path, snapshot.schema_version, CURRENT_SCHEMA_VERSION
    );
    println!("Identity rules: v{}", snapshot.identity_rules);
    match &snapshot.default_reference {
        Some(reference) => println!("Default reference: {reference}"),
        None => println!("Default reference: (none)"),
    }
    match snapshot.scan.timeout_secs {
        Some(secs) => println!("Scan timeout: {secs}s"),
        None => println!("Scan timeout: none"),
    }
    println!("Size fallback: {}", if snapshot.scan.size_fallback { "on" } else { "off" });
    if snapshot.live_sources.is_empty() {
        println!("Live sources: (none on this platform)");
    } else {
        println!("Live sources: {}", snapshot.live_sources.join(", "));
    }
    println!("Groups: {} ({} assignments)", snapshot.groups, snapshot.assignments);
    println!("Layout:");
    print_dir_status("data", &ctx.layout.root);
    print_dir_status("scans", &ctx.layout.scans_dir);

    Ok(())
}
