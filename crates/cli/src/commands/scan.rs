use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use inventory_core::db::{write_inventory_config, InventoryContext};
use inventory_core::{save_scan, scan_current, ScanOutcome, ScanWarning};
use serde::Serialize;

use crate::canonicalize_or_current;
use crate::commands::{open_context, source_registry_for};
use crate::default_scan_file_name;

/// Options for [`scan_command`].
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pub out: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub sizes: bool,
    pub set_reference: bool,
    pub json: bool,
}

#[derive(Serialize)]
pub struct ScanReport {
    pub path: String,
    pub captured_at: String,
    pub sources: Vec<String>,
    pub entries: usize,
    pub warnings: Vec<String>,
}

/// Run a scan with the context's settings plus command-line overrides.
///
/// Fails only when every source view failed; otherwise the partial result
/// and its warnings are returned.
pub fn run_scan(
    ctx: &InventoryContext,
    source_file: Option<&Path>,
    timeout_secs: Option<u64>,
    sizes: bool,
) -> Result<(ScanOutcome, Vec<String>)> {
    let registry = source_registry_for(source_file)?;
    let mut options = ctx.scan_options();
    if let Some(secs) = timeout_secs {
        options.timeout = Some(Duration::from_secs(secs));
    }
    if sizes && options.size_fallback.is_none() {
        options.size_fallback = Some(ctx.config.scan.size_limits.clone());
    }

    let outcome = scan_current(&registry, &options);
    if outcome.all_sources_failed(&registry) {
        let reasons: Vec<String> = outcome.warnings.iter().map(ToString::to_string).collect();
        bail!("Every source view failed; nothing was scanned:\n  {}", reasons.join("\n  "));
    }
    Ok((outcome, registry.names()))
}

/// Scan installed software and save the result.
pub fn scan_command(data_dir: Option<&Path>, args: &ScanArgs) -> Result<()> {
    let mut ctx = open_context(data_dir)?;
    let (outcome, sources) =
        run_scan(&ctx, args.source_file.as_deref(), args.timeout_secs, args.sizes)?;

    let out_path = match &args.out {
        Some(path) => canonicalize_or_current(path)?,
        None => {
            fs::create_dir_all(&ctx.layout.scans_dir).with_context(|| {
                format!("Failed to create scans dir: {}", ctx.layout.scans_dir.display())
            })?;
            ctx.layout.scan_path(&default_scan_file_name(Utc::now()))
        }
    };
    save_scan(&outcome.record, &out_path)
        .with_context(|| format!("Failed to save scan to {}", out_path.display()))?;

    if args.set_reference {
        ctx.config.default_reference = Some(out_path.display().to_string());
        write_inventory_config(&ctx.layout, &ctx.config)?;
    }

    let report = ScanReport {
        path: out_path.display().to_string(),
        captured_at: outcome.record.captured_at().to_rfc3339(),
        sources,
        entries: outcome.record.len(),
        warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Scanned {} entries from {} source(s)", report.entries, report.sources.len());
    println!("Saved: {}", report.path);
    if args.set_reference {
        println!("Default reference set to {}", report.path);
    }
    print_warnings(&outcome.warnings);

    Ok(())
}

/// Print scan warnings, most important first.
pub fn print_warnings(warnings: &[ScanWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("Warnings ({}):", warnings.len());
    let (issues, parse): (Vec<&ScanWarning>, Vec<&ScanWarning>) =
        warnings.iter().partition(|w| !matches!(w, ScanWarning::Parse(_)));
    for warning in issues.into_iter().chain(parse) {
        println!("  - {warning}");
    }
}
