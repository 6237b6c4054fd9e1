use std::path::PathBuf;

use anyhow::Result;
use app_inventory::commands::*;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installed-software inventory CLI.
///
/// This CLI is a thin wrapper around `inventory-core` (exposed in code as `inventory_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "app-inventory",
    version,
    about = "Inventory installed software and compare it against a reference scan",
    long_about = None
)]
struct Cli {
    /// Data directory holding config.json, groups.db and saved scans.
    /// Defaults to $APP_INVENTORY_DATA_DIR, then the platform config directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a data directory.
    ///
    /// This will:
    /// - Create the data directory and its `scans` folder.
    /// - Write `config.json`.
    /// - Create the group database.
    Init {
        /// Inventory name. Defaults to the machine name.
        #[arg(long)]
        name: Option<String>,

        /// Overwrite an existing config.json.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Show configuration, paths and group store status.
    Info {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Scan installed software and save the result.
    ///
    /// Reads the live uninstall registry on Windows. Elsewhere (or for
    /// replaying a capture) pass `--source-file` with a snapshot file.
    Scan {
        /// Output file (.csv, .json, .yaml). Defaults to `scans/scan-<timestamp>.json`.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Read raw records from a snapshot file instead of the live registry.
        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Abort enumeration after this many seconds (overrides config).
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Estimate missing sizes by measuring install folders.
        #[arg(long, default_value_t = false)]
        sizes: bool,

        /// Record the saved file as the default reference for `compare`.
        #[arg(long, default_value_t = false)]
        set_reference: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compare a reference scan against the current machine.
    ///
    /// Every reference entry is reported as installed or missing.
    Compare {
        /// Reference scan file. Defaults to the configured default reference.
        reference: Option<PathBuf>,

        /// Use a saved scan as the current state instead of scanning.
        #[arg(long, conflicts_with = "source_file")]
        current: Option<PathBuf>,

        /// Scan from a snapshot file instead of the live registry.
        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Abort enumeration after this many seconds (overrides config).
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Only list missing entries.
        #[arg(long, default_value_t = false)]
        only_missing: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Manage application groups.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Assign an application to a group.
    Assign {
        /// Application display name (or identity key with `--key`).
        name: String,

        /// Target group id.
        #[arg(long)]
        group: i64,

        /// Treat NAME as an identity key instead of a display name.
        #[arg(long, default_value_t = false)]
        key: bool,
    },

    /// Remove an application's group assignment.
    Unassign {
        /// Application display name (or identity key with `--key`).
        name: String,

        /// Treat NAME as an identity key instead of a display name.
        #[arg(long, default_value_t = false)]
        key: bool,
    },
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    /// List groups with their member counts.
    List {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Create a group; it gets the next palette colour.
    Create {
        name: String,
    },

    /// Rename a group. Assignments are kept.
    Rename {
        id: i64,
        name: String,
    },

    /// Set or clear a group's colour.
    Color {
        id: i64,

        /// Colour as #rrggbb.
        #[arg(required_unless_present = "clear")]
        color: Option<String>,

        /// Remove the colour.
        #[arg(long, default_value_t = false, conflicts_with = "color")]
        clear: bool,
    },

    /// Delete a group and clear its assignments.
    Delete {
        id: i64,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("app_inventory=debug,inventory_core=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("app_inventory=info,inventory_core=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("app-inventory starting with args: {:?}", cli);

    let data_dir = cli.data_dir.as_deref();
    match cli.command {
        Command::Init { name, force } => init_command(data_dir, name, force)?,
        Command::Info { json } => info_command(data_dir, json)?,
        Command::Scan { out, source_file, timeout_secs, sizes, set_reference, json } => {
            let args = ScanArgs { out, source_file, timeout_secs, sizes, set_reference, json };
            scan_command(data_dir, &args)?
        }
        Command::Compare { reference, current, source_file, timeout_secs, only_missing, json } => {
            let args =
                CompareArgs { reference, current, source_file, timeout_secs, only_missing, json };
            compare_command(data_dir, &args)?
        }
        Command::Group { action } => match action {
            GroupAction::List { json } => list_groups_command(data_dir, json)?,
            GroupAction::Create { name } => create_group_command(data_dir, &name)?,
            GroupAction::Rename { id, name } => rename_group_command(data_dir, id, &name)?,
            GroupAction::Color { id, color, clear } => {
                let color = if clear { None } else { color };
                color_group_command(data_dir, id, color.as_deref())?
            }
            GroupAction::Delete { id } => delete_group_command(data_dir, id)?,
        },
        Command::Assign { name, group, key } => assign_command(data_dir, &name, group, key)?,
        Command::Unassign { name, key } => unassign_command(data_dir, &name, key)?,
    }

    Ok(())
}
