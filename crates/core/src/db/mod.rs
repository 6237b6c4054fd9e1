//! Group store persistence and data-directory layout.
//!
//! This module defines:
//! - `InventoryConfig` / `DbConfig` / `ScanSettings`: serializable settings.
//! - `InventoryLayout`: computed paths inside a data directory.
//! - `GroupDb`: a small SQLite wrapper with versioned migrations.
//! - `AppGroup`, `GroupId`, `GroupColor`, `GroupAssignment`: stored types.
//! - `InventoryContext`: config plus an open group registry.

pub mod config;
pub mod context;
pub mod group_db;
pub mod layout;
pub mod models;
pub mod util;

pub use config::{DbConfig, InventoryConfig, ScanSettings};
pub use context::InventoryContext;
pub use group_db::{DbError, DbResult, GroupDb, CURRENT_SCHEMA_VERSION};
pub use layout::InventoryLayout;
pub use models::{AppGroup, GroupAssignment, GroupColor, GroupId, InvalidColor};
pub use util::{
    load_inventory_config, open_group_registry, resolve_data_dir, resolve_data_dir_with,
    write_inventory_config, APP_DIR_NAME, DATA_DIR_ENV,
};
