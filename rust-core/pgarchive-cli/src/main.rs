// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! pgarchive - Inspect PostgreSQL backups held by barman.
//!
//! Lists servers and backups, shows one backup in detail and reports the WAL
//! segments a backup would need for recovery but barman does not hold.
//! `missing` exits with status 2 when any segment is missing, so it can
//! gate scripts and monitoring checks.

mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use pgarchive_barman::{BarmanClient, BarmanConfig, FetchOptions};
use pgarchive_catalog::{to_bytes, BackupRecord};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status of `missing` when at least one segment is missing.
const EXIT_SEGMENTS_MISSING: u8 = 2;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// pgarchive - Inspect PostgreSQL backups held by barman.
#[derive(Parser, Debug)]
#[command(name = "pgarchive", version = VERSION, about = "Inspect PostgreSQL backups held by barman")]
struct Cli {
    /// Path to the barman executable (overrides PGARCHIVE_BARMAN_BINARY).
    #[arg(long, global = true)]
    binary: Option<PathBuf>,

    /// barman's backup root (overrides PGARCHIVE_BARMAN_HOME).
    #[arg(long, global = true)]
    barman_home: Option<PathBuf>,

    /// Upper bound on one barman invocation, in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Write logs to stderr as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List servers with their check results.
    Servers,
    /// List the backups of a server.
    Backups { server: String },
    /// Show one backup with its WAL summary.
    Show { server: String, id: String },
    /// List WAL segments a backup needs but barman does not hold.
    Missing {
        server: String,
        id: String,
        /// Check through the backup's end segment instead of the highest
        /// archived one.
        #[arg(long)]
        through_end: bool,
    },
    /// Show the newest backup of a server.
    Latest { server: String },
    /// Show the oldest backup of a server.
    Oldest { server: String },
    /// Convert a size in B, KiB, MiB, GiB or TiB to bytes.
    ToBytes { magnitude: f64, unit: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Defaults, then environment, then command-line flags.
fn config(cli: &Cli) -> Result<BarmanConfig> {
    let mut config = BarmanConfig::from_env().context("reading PGARCHIVE_* environment")?;
    if let Some(binary) = &cli.binary {
        config = config.with_binary(binary);
    }
    if let Some(home) = &cli.barman_home {
        config = config.with_barman_home(home);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_command_timeout(Duration::from_secs(secs));
    }
    config.validate().context("invalid barman configuration")?;
    tracing::debug!(?config, "Using barman configuration");
    Ok(config)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let format = cli.format;

    // The only command that does not need barman.
    if let Command::ToBytes { magnitude, unit } = &cli.command {
        println!("{}", to_bytes(*magnitude, unit)?);
        return Ok(ExitCode::SUCCESS);
    }

    let client = BarmanClient::new(config(&cli)?);
    let newest = matches!(cli.command, Command::Latest { .. });

    match cli.command {
        Command::Servers => {
            let servers = client.servers(FetchOptions::default())?;
            emit(format, &servers, |servers| output::servers_table(servers))?;
        }
        Command::Backups { server } => {
            let catalog = client
                .backups(&server, FetchOptions::default())
                .with_context(|| format!("listing backups of {server}"))?;
            emit(format, &catalog, output::backups_table)?;
        }
        Command::Show { server, id } => {
            let backup = client
                .backup(&server, &id, FetchOptions::default().with_wal_segments())
                .with_context(|| format!("loading backup {id} of {server}"))?;
            show(format, &backup)?;
        }
        Command::Missing {
            server,
            id,
            through_end,
        } => {
            let backup = client
                .backup(&server, &id, FetchOptions::default().with_wal_segments())
                .with_context(|| format!("loading backup {id} of {server}"))?;
            let missing = if through_end {
                let end = backup
                    .end_segment()
                    .cloned()
                    .with_context(|| format!("backup {id} has no end segment"))?;
                backup.missing_segments_through(&end)?
            } else {
                backup.missing_segments()?
            };
            emit(format, &missing, |missing| output::segment_list(missing))?;
            if !missing.is_empty() {
                return Ok(ExitCode::from(EXIT_SEGMENTS_MISSING));
            }
        }
        Command::Latest { server } | Command::Oldest { server } => {
            let catalog = client
                .backups(&server, FetchOptions::default())
                .with_context(|| format!("listing backups of {server}"))?;
            let selected = if newest {
                catalog.latest()
            } else {
                catalog.oldest()
            };
            let backup = selected.ok_or_else(|| anyhow!("server {server} has no backups"))?;
            show(format, backup)?;
        }
        Command::ToBytes { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// A backup with its continuity result, if one could be computed.
fn show(format: OutputFormat, backup: &BackupRecord) -> Result<()> {
    let missing = backup.missing_segments().ok();
    let rendered = match format {
        OutputFormat::Text => output::backup_details(backup, missing.as_deref()),
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "backup": backup,
            "missing": missing,
        }))?,
    };
    println!("{rendered}");
    Ok(())
}

fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => text(value),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
    };
    println!("{rendered}");
    Ok(())
}
