use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use inventory_core::{
    load_reference, load_scan, reconcile, InstallStatus, ReconciledEntry, ReconciliationSummary,
    ScanOrigin, ScanRecord,
};
use serde::Serialize;

use crate::commands::{group_label, open_context, print_warnings, run_scan};

/// Options for [`compare_command`].
#[derive(Debug, Clone, Default)]
pub struct CompareArgs {
    pub reference: Option<PathBuf>,
    pub current: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub only_missing: bool,
    pub json: bool,
}

#[derive(Serialize)]
pub struct CompareRow<'a> {
    #[serde(flatten)]
    pub result: ReconciledEntry<'a>,
    pub version_changed: bool,
    pub group: Option<String>,
}

#[derive(Serialize)]
pub struct CompareReport<'a> {
    pub reference: String,
    pub summary: ReconciliationSummary,
    pub entries: Vec<CompareRow<'a>>,
}

/// Compare a reference scan against a saved or freshly taken current scan.
pub fn compare_command(data_dir: Option<&Path>, args: &CompareArgs) -> Result<()> {
    let ctx = open_context(data_dir)?;

    let reference_path = match &args.reference {
        Some(path) => path.clone(),
        None => ctx
            .config
            .default_reference
            .as_deref()
            .map(|configured| ctx.layout.resolve(configured))
            .ok_or_else(|| {
                anyhow!(
                    "No reference given and no default reference configured \
                     (see `scan --set-reference`)"
                )
            })?,
    };
    let reference = load_reference(&reference_path).with_context(|| {
        format!("Failed to load reference scan: {}", reference_path.display())
    })?;

    let mut scan_warnings = Vec::new();
    let current: ScanRecord = match &args.current {
        Some(path) => {
            let loaded = load_scan(path, ScanOrigin::Current)
                .with_context(|| format!("Failed to load current scan: {}", path.display()))?;
            if !loaded.warnings.is_empty() {
                tracing::warn!(count = loaded.warnings.len(), "current scan had unreadable rows");
            }
            loaded.record
        }
        None => {
            let (outcome, _) =
                run_scan(&ctx, args.source_file.as_deref(), args.timeout_secs, false)?;
            scan_warnings = outcome.warnings;
            outcome.record
        }
    };

    let results = reconcile(&current, &reference.record);
    let summary = ReconciliationSummary::from(results.as_slice());
    let rows: Vec<CompareRow<'_>> = results
        .iter()
        .filter(|r| !args.only_missing || r.status == InstallStatus::Missing)
        .map(|r| CompareRow {
            result: *r,
            version_changed: r.version_changed(),
            group: ctx
                .groups
                .group_for(r.reference_entry.identity_key())
                .map(|g| g.display_name.clone()),
        })
        .collect();

    if args.json {
        let report = CompareReport {
            reference: reference_path.display().to_string(),
            summary,
            entries: rows,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Reference: {} ({} entries)", reference_path.display(), summary.total);
    println!(
        "Installed: {}  Missing: {}  Version changed: {}",
        summary.installed, summary.missing, summary.version_changed
    );
    for row in &rows {
        let entry = row.result.reference_entry;
        let version = match (entry.version.as_deref(), row.result.matched_current) {
            (Some(before), Some(now)) if row.version_changed => {
                format!("{before} -> {}", now.version.as_deref().unwrap_or(""))
            }
            (Some(version), _) => version.to_string(),
            (None, _) => String::new(),
        };
        println!(
            "- [{}] {} {} (group: {})",
            row.result.status.as_str(),
            entry.name(),
            version,
            group_label(&ctx.groups, entry.identity_key())
        );
    }
    if !reference.warnings.is_empty() {
        println!("Reference warnings ({}):", reference.warnings.len());
        for warning in &reference.warnings {
            println!("  - {warning}");
        }
    }
    print_warnings(&scan_warnings);

    Ok(())
}
