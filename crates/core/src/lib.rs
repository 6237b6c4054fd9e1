//! inventory-core
//!
//! Core library for installed-software inventories.
//!
//! This crate defines the entry model, the normalizer that turns raw uninstall
//! records into it, the source scanner, scan file encodings, reconciliation of
//! a reference scan against the live machine, and the persistent group store.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends.

pub mod codec;
pub mod db;
pub mod groups;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod scanner;

pub use codec::{load_reference, load_scan, save_scan, CodecError, LoadedScan, ScanFormat};
pub use groups::{GroupError, GroupRegistry};
pub use model::{AppEntry, Architecture, ScanOrigin, ScanRecord};
pub use normalize::{identity_key, normalize_entry, ParseWarning, RawEntry};
pub use reconcile::{reconcile, InstallStatus, ReconciledEntry, ReconciliationSummary};
pub use scanner::{
    default_source_registry, scan_current, CancelToken, ScanOptions, ScanOutcome, ScanWarning,
    SourceRegistry,
};

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
