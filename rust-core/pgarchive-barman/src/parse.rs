// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive barman integration - Output parsers
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure functions turning barman's line-oriented output and on-disk metadata
// into catalog values. Nothing here runs a command or touches the
// filesystem; the client feeds lines in.
//
// Formats handled:
//
//   list-server   testdb1 - description for testdb1
//   show-server   \tactive: true
//   check         \tssh: OK
//   list-backup   test 20130225T192654 - Tue Feb 26 05:50:05 2013 - Size: 217.0 GiB - WAL Size: 72.0 GiB
//   backup.info   begin_wal=0000000100000552000000B6
//   list-files    /var/lib/barman/test/wals/00000001000005A9/00000001000005A9000000BC
//   xlog.db       00000001000005A9000000BC\t4684503\t1360568429.0\tbzip2

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pgarchive_catalog::{
    BackupRecord, BackupStatus, Compression, IntoTimestamp, SizeUnit, WalSegment,
};
use tracing::debug;

use crate::error::{BarmanError, BarmanResult};
use crate::server::Server;

/// Separator between the fields of `list-server` and `list-backup` lines.
const FIELD_SEPARATOR: &str = " - ";

/// Separator between key and value in `show-server` and `check` output.
const KEY_SEPARATOR: &str = ": ";

/// Placeholder barman writes into `backup.info` for unset values.
const NONE_VALUE: &str = "None";

fn malformed(context: &'static str, line: &str) -> BarmanError {
    BarmanError::MalformedLine {
        context,
        line: line.to_string(),
    }
}

fn non_blank<S: AsRef<str>>(lines: &[S]) -> impl Iterator<Item = &str> {
    lines
        .iter()
        .map(|line| line.as_ref())
        .filter(|line| !line.trim().is_empty())
}

/// `key: value` with indentation removed, or `None` for headings.
fn key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.trim_start_matches(['\t', ' ']).split_once(KEY_SEPARATOR)?;
    Some((key.trim(), value.trim()))
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

/// Server names from `list-server`. Names may contain hyphens; only the
/// spaced separator ends the name.
pub fn parse_list_server_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    non_blank(lines)
        .map(|line| {
            line.split_once(FIELD_SEPARATOR)
                .map_or(line, |(name, _)| name)
                .trim()
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// A [`Server`] named `name` filled from `show-server`. Unknown keys are
/// ignored.
pub fn parse_show_server_lines<S: AsRef<str>>(name: &str, lines: &[S]) -> BarmanResult<Server> {
    let mut server = Server::new(name);
    for line in non_blank(lines) {
        let Some((key, value)) = key_value(line) else {
            continue;
        };
        match key {
            "active" => {
                server.active = Some(match value.to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => return Err(malformed("show-server", line)),
                })
            }
            "ssh_command" => server.ssh_command = Some(value.to_string()),
            "conninfo" => server.conninfo = Some(value.to_string()),
            "backup_directory" => server.backup_directory = Some(PathBuf::from(value)),
            "basebackups_directory" => server.base_backups_directory = Some(PathBuf::from(value)),
            "wals_directory" => server.wals_directory = Some(PathBuf::from(value)),
            "server_txt_version" => server.pg_version = Some(value.to_string()),
            _ => {}
        }
    }
    Ok(server)
}

/// Record the ssh and PostgreSQL results of `check` on `server`. Anything
/// but `OK` counts as a failed check.
pub fn parse_check_lines<S: AsRef<str>>(server: &mut Server, lines: &[S]) {
    for (key, value) in non_blank(lines).filter_map(key_value) {
        match key {
            "ssh" => server.ssh_check_ok = Some(value == "OK"),
            "PostgreSQL" => server.pg_connection_ok = Some(value == "OK"),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

/// Backups from `list-backup`, with server name, id and status set. Sizes
/// are only reported for finished backups.
pub fn parse_backup_list<S: AsRef<str>>(lines: &[S]) -> BarmanResult<Vec<BackupRecord>> {
    non_blank(lines).map(parse_backup_line).collect()
}

fn parse_backup_line(line: &str) -> BarmanResult<BackupRecord> {
    let mut fields = line.split(FIELD_SEPARATOR).map(str::trim);
    let head = fields.next().unwrap_or_default();
    let (server, id) = head
        .rsplit_once(' ')
        .ok_or_else(|| malformed("list-backup", line))?;

    let mut backup = BackupRecord::new();
    backup.set_server_name(server.trim())?;
    backup.set_id(id)?;

    let fields: Vec<&str> = fields.collect();
    let status = if fields.contains(&"FAILED") {
        BackupStatus::Failed
    } else if fields.contains(&"STARTED") {
        BackupStatus::Started
    } else {
        BackupStatus::Done
    };
    backup.set_status(status);

    if status == BackupStatus::Done {
        let size = fields
            .iter()
            .find_map(|field| field.strip_prefix("Size: "))
            .ok_or_else(|| malformed("list-backup", line))?;
        let wal_size = fields
            .iter()
            .find_map(|field| field.strip_prefix("WAL Size: "))
            .ok_or_else(|| malformed("list-backup", line))?;
        backup.set_data_size_bytes(parse_size(size, line)?);
        backup.set_wal_size_bytes(parse_size(wal_size, line)?);
    }
    Ok(backup)
}

/// `217.0 GiB` in bytes.
fn parse_size(text: &str, line: &str) -> BarmanResult<u64> {
    let (magnitude, unit) = text
        .split_once(' ')
        .ok_or_else(|| malformed("list-backup", line))?;
    let magnitude: f64 = magnitude
        .trim()
        .parse()
        .map_err(|_| malformed("list-backup", line))?;
    let unit: SizeUnit = unit.trim().parse()?;
    Ok(unit.bytes(magnitude)?)
}

/// Fill `backup` from the `key=value` lines of its `backup.info`. Values
/// of `None` and unknown keys are skipped.
pub fn parse_backup_info<S: AsRef<str>>(
    backup: &mut BackupRecord,
    lines: &[S],
) -> BarmanResult<()> {
    for line in non_blank(lines) {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value == NONE_VALUE {
            continue;
        }
        match key.trim() {
            "begin_time" => backup.set_started_at(value)?,
            "end_time" => backup.set_ended_at(value)?,
            "status" => backup.set_status(value.parse()?),
            "size" => backup.set_data_size_bytes(parse_number(value, line)?),
            "timeline" => backup.set_timeline(parse_number(value, line)?)?,
            "begin_wal" => backup.set_begin_segment(value)?,
            "end_wal" => backup.set_end_segment(value)?,
            "pgdata" => backup.set_data_directory(value)?,
            "version" => backup.set_pg_version(parse_number(value, line)?),
            _ => {}
        }
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(value: &str, line: &str) -> BarmanResult<T> {
    value.parse().map_err(|_| malformed("backup.info", line))
}

// ---------------------------------------------------------------------------
// WAL segments
// ---------------------------------------------------------------------------

/// Segments from `list-files --target wal`; each line is a path whose last
/// component is the segment name.
pub fn parse_wal_files_list<S: AsRef<str>>(lines: &[S]) -> BarmanResult<Vec<WalSegment>> {
    non_blank(lines)
        .map(|line| -> BarmanResult<WalSegment> {
            let name = line.trim().rsplit('/').next().unwrap_or_default();
            Ok(WalSegment::parse(name)?)
        })
        .collect()
}

/// One line of barman's WAL index.
#[derive(Debug, Clone, PartialEq)]
pub struct XlogEntry {
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub compression: Compression,
}

impl XlogEntry {
    /// Copy size, creation time and compression onto `segment`.
    pub fn apply_to(&self, segment: &mut WalSegment) {
        segment.set_size_bytes(self.size_bytes);
        segment.set_compression(self.compression);
        segment.set_created_at_utc(self.created_at);
    }
}

/// Entries of `xlog.db` keyed by file name. Besides segments the index
/// holds `.backup` and `.history` files; they are kept under their own
/// names.
pub fn parse_xlog_db<S: AsRef<str>>(lines: &[S]) -> BarmanResult<HashMap<String, XlogEntry>> {
    let mut entries = HashMap::new();
    for line in non_blank(lines) {
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        let [name, size, created, compression] = fields[..] else {
            return Err(malformed("xlog.db", line));
        };
        let size_bytes = size.parse().map_err(|_| malformed("xlog.db", line))?;
        // Creation times are fractional epoch seconds; whole seconds are kept.
        let created: f64 = created.parse().map_err(|_| malformed("xlog.db", line))?;
        let entry = XlogEntry {
            size_bytes,
            created_at: created.into_timestamp()?,
            compression: compression.parse()?,
        };
        if entries.insert(name.to_string(), entry).is_some() {
            return Err(BarmanError::DuplicateXlogEntry(name.to_string()));
        }
    }
    debug!(entries = entries.len(), "Parsed xlog.db");
    Ok(entries)
}
