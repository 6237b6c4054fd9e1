//! Source scanner: enumerate raw uninstall records and build the current scan.
//!
//! Sources are pluggable [`SourceView`]s kept in a [`SourceRegistry`] in
//! precedence order. A failing view is reported and skipped; the scan itself
//! only stops early when its [`ScanBudget`] runs out.

pub mod merge;
pub mod sizing;
pub mod snapshot;
#[cfg(windows)]
pub mod windows;

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{ScanOrigin, ScanRecord};
use crate::normalize::{normalize_entry_with, LocationLookups, ParseWarning, RawEntry, SourceViewId};

pub use merge::{merge_by_identity, MergeCandidate};
pub use sizing::SizeLimits;
pub use snapshot::SnapshotView;

/// Error raised by a single source view.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The scan budget ran out while this view was being read.
    #[error("interrupted by cancellation or timeout")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed source data: {0}")]
    Parse(String),
}

/// One enumerable view of installed software.
pub trait SourceView: Send + Sync {
    fn name(&self) -> &str;
    fn id(&self) -> SourceViewId;
    /// Read every raw record. Implementations poll `budget` between records
    /// and return [`SourceError::Interrupted`] once it is exhausted.
    fn enumerate(&self, budget: &ScanBudget) -> Result<Vec<RawEntry>, SourceError>;

    /// Registered full path for an executable name (`foo.exe`), consulted
    /// when a record's own values do not locate its install folder.
    fn app_path(&self, _exe_name: &str) -> Option<String> {
        None
    }
}

/// Ordered collection of source views; registration order is precedence.
#[derive(Default)]
pub struct SourceRegistry {
    views: Vec<Box<dyn SourceView>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self { views: Vec::new() }
    }

    pub fn register<V: SourceView + 'static>(&mut self, view: V) -> &mut Self {
        self.views.push(Box::new(view));
        self
    }

    pub fn views(&self) -> impl Iterator<Item = &dyn SourceView> {
        self.views.iter().map(|v| &**v)
    }

    /// Registered view names in precedence order.
    pub fn names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Registry reading every view stored in a snapshot file.
    pub fn from_snapshot_file(path: &Path) -> Result<Self, SourceError> {
        let mut registry = Self::new();
        for view in SnapshotView::load_all(path)? {
            registry.register(view);
        }
        Ok(registry)
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry").field("views", &self.names()).finish()
    }
}

/// Registry with the platform's live uninstall views.
///
/// On Windows this is the four uninstall-key views; elsewhere it is empty
/// and callers supply a snapshot file instead.
pub fn default_source_registry() -> SourceRegistry {
    #[allow(unused_mut)]
    let mut registry = SourceRegistry::new();
    #[cfg(windows)]
    {
        for view in windows::RegistryView::all() {
            registry.register(view);
        }
    }
    registry
}

/// Cooperative cancellation flag shared between a scan and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-supplied bounds for [`scan_current`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
    /// Estimate missing sizes from install folders when set.
    pub size_fallback: Option<SizeLimits>,
}

/// Deadline plus cancellation flag, polled by sources while they work.
#[derive(Debug, Clone, Default)]
pub struct ScanBudget {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl ScanBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn new(timeout: Option<Duration>, cancel: Option<CancelToken>) -> Self {
        Self { deadline: timeout.map(|t| Instant::now() + t), cancel }
    }

    pub fn from_options(options: &ScanOptions) -> Self {
        Self::new(options.timeout, options.cancel.clone())
    }

    pub fn exhausted(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Non-fatal issue collected during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    /// A view could not be read; the scan continued without it.
    SourceUnavailable { source: String, reason: String },
    /// The budget ran out. `completed` views contributed entries, `skipped`
    /// views (including one interrupted midway) did not.
    Cancelled { completed: Vec<String>, skipped: Vec<String> },
    Parse(ParseWarning),
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanWarning::SourceUnavailable { source, reason } => {
                write!(f, "source {source} unavailable: {reason}")
            }
            ScanWarning::Cancelled { completed, skipped } => write!(
                f,
                "scan stopped early; completed [{}], skipped [{}]",
                completed.join(", "),
                skipped.join(", ")
            ),
            ScanWarning::Parse(warning) => write!(f, "{warning}"),
        }
    }
}

/// The current scan plus everything that went wrong producing it.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub record: ScanRecord,
    pub warnings: Vec<ScanWarning>,
}

impl ScanOutcome {
    /// True when every view failed or was skipped, i.e. an empty record does
    /// not mean nothing is installed.
    pub fn all_sources_failed(&self, registry: &SourceRegistry) -> bool {
        let failed = self
            .warnings
            .iter()
            .map(|w| match w {
                ScanWarning::SourceUnavailable { .. } => 1,
                ScanWarning::Cancelled { skipped, .. } => skipped.len(),
                ScanWarning::Parse(_) => 0,
            })
            .sum::<usize>();
        !registry.is_empty() && failed >= registry.len()
    }
}

/// Scan every registered view and build the current [`ScanRecord`].
pub fn scan_current(registry: &SourceRegistry, options: &ScanOptions) -> ScanOutcome {
    let budget = ScanBudget::from_options(options);
    let mut candidates = Vec::new();
    let mut warnings = Vec::new();
    let mut completed = Vec::new();
    let mut skipped = Vec::new();

    for (rank, view) in registry.views().enumerate() {
        let name = view.name().to_string();
        if budget.exhausted() {
            skipped.push(name);
            continue;
        }

        let raws = match view.enumerate(&budget) {
            Ok(raws) => raws,
            Err(SourceError::Interrupted) => {
                skipped.push(name);
                continue;
            }
            Err(err) => {
                warn!(source = %name, error = %err, "skipping unreadable source view");
                warnings
                    .push(ScanWarning::SourceUnavailable { source: name, reason: err.to_string() });
                continue;
            }
        };

        let total = raws.len();
        let mut unnamed = 0usize;
        let app_path = |exe_name: &str| view.app_path(exe_name);
        let lookups = LocationLookups::process().with_app_path(&app_path);
        for raw in raws {
            let normalized = normalize_entry_with(&raw, lookups);
            warnings.extend(normalized.warnings.into_iter().map(ScanWarning::Parse));
            if normalized.entry.identity_key().is_empty() {
                unnamed += 1;
                continue;
            }
            candidates.push(MergeCandidate::new(normalized.entry, rank, raw.key_path));
        }
        if unnamed > 0 {
            // Component and patch keys routinely lack a display name.
            warnings.push(ScanWarning::Parse(ParseWarning::SkippedRow {
                row: name.clone(),
                reason: format!("{unnamed} keys without a display name"),
            }));
        }
        debug!(source = %name, total, unnamed, "enumerated source view");
        completed.push(name);
    }

    if !skipped.is_empty() {
        warn!(completed = completed.len(), skipped = skipped.len(), "scan stopped early");
        warnings.push(ScanWarning::Cancelled { completed, skipped });
    }

    let mut entries = merge_by_identity(candidates);
    if let Some(limits) = &options.size_fallback {
        let filled = sizing::fill_missing_sizes(&mut entries, limits, &budget);
        debug!(filled, "estimated sizes from install folders");
    }
    entries.sort_by(|a, b| a.identity_key().cmp(b.identity_key()));
    debug!(entries = entries.len(), warnings = warnings.len(), "scan finished");

    ScanOutcome { record: ScanRecord::new(ScanOrigin::Current, Utc::now(), entries), warnings }
}
