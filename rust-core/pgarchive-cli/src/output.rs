// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! Output rendering for `pgarchive`.
//!
//! - **Text**: tables drawn with `comfy-table`, sizes in binary units.
//! - **JSON**: the catalog types' own serde representation, pretty-printed.

use std::fmt;

use chrono::{DateTime, Utc};
use comfy_table::{Cell, ContentArrangement, Table};
use pgarchive_barman::Server;
use pgarchive_catalog::{BackupCatalog, BackupRecord, SizeUnit, WalSegmentId};

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown format '{other}'. Valid formats: text, json")),
        }
    }
}

const PLACEHOLDER: &str = "-";

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(|column| Cell::new(column)));
    table
}

/// Largest unit the value reaches, one decimal, e.g. `217.0 GiB`.
pub fn human_bytes(bytes: u64) -> String {
    let unit = SizeUnit::ALL
        .iter()
        .rev()
        .copied()
        .find(|unit| bytes >= unit.multiplier())
        .unwrap_or(SizeUnit::B);
    if unit == SizeUnit::B {
        return format!("{bytes} {unit}");
    }
    format!("{:.1} {unit}", bytes as f64 / unit.multiplier() as f64)
}

fn bytes_cell(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| PLACEHOLDER.to_string(), human_bytes)
}

fn time_cell(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || PLACEHOLDER.to_string(),
        |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn text_cell(value: Option<impl ToString>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |value| value.to_string())
}

fn check_cell(ok: Option<bool>) -> &'static str {
    match ok {
        Some(true) => "OK",
        Some(false) => "FAILED",
        None => PLACEHOLDER,
    }
}

fn count_footer(count: usize, noun: &str) -> String {
    format!("({count} {noun}{})", if count == 1 { "" } else { "s" })
}

/// One row per server with its check results.
pub fn servers_table(servers: &[Server]) -> String {
    let mut table = new_table(&["Server", "Active", "SSH", "PostgreSQL", "Version"]);
    for server in servers {
        table.add_row(vec![
            Cell::new(&server.name),
            Cell::new(match server.active {
                Some(true) => "yes",
                Some(false) => "no",
                None => PLACEHOLDER,
            }),
            Cell::new(check_cell(server.ssh_check_ok)),
            Cell::new(check_cell(server.pg_connection_ok)),
            Cell::new(text_cell(server.pg_version.as_deref())),
        ]);
    }
    format!("{table}\n{}", count_footer(servers.len(), "server"))
}

/// One row per backup, in catalog order.
pub fn backups_table(catalog: &BackupCatalog) -> String {
    let mut table = new_table(&["ID", "Status", "Started", "Ended", "Size", "WAL Size"]);
    for backup in catalog {
        table.add_row(vec![
            Cell::new(text_cell(backup.id())),
            Cell::new(text_cell(backup.status())),
            Cell::new(time_cell(backup.started_at())),
            Cell::new(time_cell(backup.ended_at())),
            Cell::new(bytes_cell(backup.data_size_bytes())),
            Cell::new(bytes_cell(backup.wal_size_bytes())),
        ]);
    }
    format!("{table}\n{}", count_footer(catalog.len(), "backup"))
}

/// Field/value table for one backup. `missing` is `None` when continuity
/// could not be checked.
pub fn backup_details(backup: &BackupRecord, missing: Option<&[WalSegmentId]>) -> String {
    let rows = [
        ("Server", text_cell(backup.server_name())),
        ("ID", text_cell(backup.id())),
        ("Status", text_cell(backup.status())),
        ("Started", time_cell(backup.started_at())),
        ("Ended", time_cell(backup.ended_at())),
        ("Size", bytes_cell(backup.data_size_bytes())),
        ("WAL size", bytes_cell(backup.wal_size_bytes())),
        ("Timeline", text_cell(backup.timeline())),
        ("Begin WAL", text_cell(backup.begin_segment())),
        ("End WAL", text_cell(backup.end_segment())),
        (
            "PGDATA",
            text_cell(backup.data_directory().map(|path| path.display())),
        ),
        ("PostgreSQL version", text_cell(backup.pg_version())),
        ("WAL segments", backup.segments().len().to_string()),
        ("Missing WAL segments", text_cell(missing.map(|ids| ids.len()))),
        ("Deleted", if backup.is_deleted() { "yes" } else { "no" }.to_string()),
    ];

    let mut table = new_table(&["Field", "Value"]);
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table.to_string()
}

/// Segment names, one per line.
pub fn segment_list(ids: &[WalSegmentId]) -> String {
    ids.iter()
        .map(WalSegmentId::name)
        .collect::<Vec<_>>()
        .join("\n")
}
