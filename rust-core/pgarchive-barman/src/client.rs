// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive barman integration - Client
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `BarmanClient` answers catalog questions by running barman sub-commands
// and reading the metadata barman keeps under its home directory:
//
//   list-backup <server>                  -> backups of a server
//   <home>/<server>/base/<id>/backup.info -> details of one backup
//   list-files --target wal <server> <id> -> WAL segments of a backup
//   <home>/<server>/wals/xlog.db          -> size/time/compression of each
//   list-server, show-server, check       -> servers and their health
//   delete, backup, recover               -> lifecycle actions

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use pgarchive_catalog::{BackupCatalog, BackupRecord, IntoTimestamp, WalSegments};
use tracing::{debug, info, instrument};

use crate::command::{CommandRunner, ProcessRunner};
use crate::config::BarmanConfig;
use crate::error::{BarmanError, BarmanResult};
use crate::parse;
use crate::server::Server;

/// What to load beyond the listing itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Load each server's backups.
    pub with_backups: bool,
    /// Load each backup's WAL segments from `list-files` and `xlog.db`.
    pub with_wal_segments: bool,
}

impl FetchOptions {
    pub fn with_backups(mut self) -> Self {
        self.with_backups = true;
        self
    }

    pub fn with_wal_segments(mut self) -> Self {
        self.with_wal_segments = true;
        self
    }
}

/// Arguments for `barman recover`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryOptions {
    /// Recover onto a remote host; the target path is then remote too.
    pub remote_ssh_command: Option<String>,
    pub target_time: Option<DateTime<Utc>>,
    pub target_xid: Option<String>,
    /// Stop just before the recovery target instead of just after it.
    pub exclusive: bool,
}

impl RecoveryOptions {
    pub fn remote_ssh_command(mut self, command: impl Into<String>) -> Self {
        self.remote_ssh_command = Some(command.into());
        self
    }

    pub fn target_time(mut self, time: impl IntoTimestamp) -> BarmanResult<Self> {
        self.target_time = Some(time.into_timestamp()?);
        Ok(self)
    }

    pub fn target_xid(mut self, xid: impl Into<String>) -> Self {
        self.target_xid = Some(xid.into());
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Options as separate arguments, in the order barman documents them.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(command) = &self.remote_ssh_command {
            args.push("--remote-ssh-command".to_string());
            args.push(command.clone());
        }
        if let Some(time) = &self.target_time {
            args.push("--target-time".to_string());
            args.push(time.format("%Y-%m-%d %H:%M:%S%:z").to_string());
        }
        if let Some(xid) = &self.target_xid {
            args.push("--target-xid".to_string());
            args.push(xid.clone());
        }
        if self.exclusive {
            args.push("--exclusive".to_string());
        }
        args
    }
}

/// Talks to one barman installation.
#[derive(Debug, Clone)]
pub struct BarmanClient<R = ProcessRunner> {
    config: BarmanConfig,
    runner: R,
}

impl BarmanClient<ProcessRunner> {
    /// A client running the configured barman binary.
    pub fn new(config: BarmanConfig) -> Self {
        let runner = ProcessRunner::from_config(&config);
        Self { config, runner }
    }
}

impl<R: CommandRunner> BarmanClient<R> {
    pub fn with_runner(config: BarmanConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &BarmanConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn run(&self, args: &[&str]) -> BarmanResult<Vec<String>> {
        self.run_with(args, true)
    }

    fn run_with(&self, args: &[&str], abort_on_error: bool) -> BarmanResult<Vec<String>> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        self.runner.run(&args, abort_on_error)
    }

    // -- backups ------------------------------------------------------------

    /// All backups of `server`, each completed from its `backup.info`.
    #[instrument(skip(self))]
    pub fn backups(&self, server: &str, options: FetchOptions) -> BarmanResult<BackupCatalog> {
        let lines = self.run(&["list-backup", server])?;
        let mut catalog = BackupCatalog::new();
        for mut backup in parse::parse_backup_list(&lines)? {
            self.complete(&mut backup, options)?;
            catalog.push(backup);
        }
        debug!(backups = catalog.len(), "Loaded backups");
        Ok(catalog)
    }

    /// One backup of `server`.
    #[instrument(skip(self))]
    pub fn backup(&self, server: &str, id: &str, options: FetchOptions) -> BarmanResult<BackupRecord> {
        let lines: Vec<String> = self
            .run(&["list-backup", server])?
            .into_iter()
            .filter(|line| line.contains(id))
            .collect();
        let mut backup = parse::parse_backup_list(&lines)?
            .into_iter()
            .find(|backup| backup.id().is_some_and(|backup_id| backup_id == id))
            .ok_or_else(|| BarmanError::BackupNotFound {
                server: server.to_string(),
                id: id.to_string(),
            })?;
        self.complete(&mut backup, options)?;
        Ok(backup)
    }

    fn complete(&self, backup: &mut BackupRecord, options: FetchOptions) -> BarmanResult<()> {
        let (server, id) = backup.key()?;
        let (server, id) = (server.to_string(), id.to_string());

        let info = read_lines(&self.config.backup_info_path(&server, &id))?;
        parse::parse_backup_info(backup, &info)?;

        if options.with_wal_segments {
            backup.set_segments(self.wal_segments(&server, &id)?);
            // xlog.db sizes are exact, the listing's are rounded.
            backup.refresh_wal_size_from_segments();
        }
        Ok(())
    }

    /// WAL segments barman holds for a backup, with size, creation time and
    /// compression taken from `xlog.db`.
    #[instrument(skip(self))]
    pub fn wal_segments(&self, server: &str, id: &str) -> BarmanResult<WalSegments> {
        let lines = self.run(&["list-files", "--target", "wal", server, id])?;
        let listed = parse::parse_wal_files_list(&lines)?;
        let index = parse::parse_xlog_db(&read_lines(&self.config.xlog_db_path(server))?)?;

        let mut segments = WalSegments::new();
        for mut segment in listed {
            let name = segment.name();
            let entry = index
                .get(&name)
                .ok_or(BarmanError::MissingXlogEntry(name))?;
            entry.apply_to(&mut segment);
            segments.push(segment);
        }
        debug!(segments = segments.len(), "Loaded WAL segments");
        Ok(segments)
    }

    // -- servers ------------------------------------------------------------

    /// Settings and check results of one server.
    #[instrument(skip(self))]
    pub fn server(&self, name: &str, options: FetchOptions) -> BarmanResult<Server> {
        let lines = self.run(&["show-server", name])?;
        let mut server = parse::parse_show_server_lines(name, &lines)?;

        // `check` exits non-zero whenever a check fails; the output is what
        // matters.
        let lines = self.run_with(&["check", name], false)?;
        parse::parse_check_lines(&mut server, &lines);

        if options.with_backups {
            server.backups = Some(self.backups(name, options)?);
        }
        Ok(server)
    }

    /// Every server barman knows, in `list-server` order.
    pub fn servers(&self, options: FetchOptions) -> BarmanResult<Vec<Server>> {
        let lines = self.run(&["list-server"])?;
        parse::parse_list_server_lines(&lines)
            .iter()
            .map(|name| self.server(name, options))
            .collect()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Delete the backup in barman and mark the record deleted.
    pub fn delete(&self, backup: &mut BackupRecord) -> BarmanResult<()> {
        let (server, id) = backup.key()?;
        self.run(&["delete", server, id.as_str()])?;
        info!(server, backup = %id, "Deleted backup");
        backup.mark_deleted();
        Ok(())
    }

    /// Take a new base backup of `server` and return it with its WAL
    /// segments.
    pub fn create(&self, server: &str) -> BarmanResult<BackupRecord> {
        info!(server, "Starting base backup");
        self.run(&["backup", server])?;

        let catalog = self.backups(server, FetchOptions::default())?;
        let id = catalog
            .latest()
            .and_then(|backup| backup.id())
            .map(|id| id.to_string())
            .ok_or_else(|| BarmanError::BackupNotFound {
                server: server.to_string(),
                id: "latest".to_string(),
            })?;
        info!(server, backup = %id, "Base backup finished");
        self.backup(server, &id, FetchOptions::default().with_wal_segments())
    }

    /// Restore `backup` into `path`, which is on the remote host when a
    /// remote ssh command is given.
    pub fn recover(
        &self,
        backup: &BackupRecord,
        path: &Path,
        options: &RecoveryOptions,
    ) -> BarmanResult<()> {
        let (server, id) = backup.key()?;
        let mut args = vec!["recover".to_string()];
        args.extend(options.args());
        args.push(server.to_string());
        args.push(id.to_string());
        args.push(path.display().to_string());

        info!(server, backup = %id, path = %path.display(), "Recovering backup");
        self.runner.run(&args, true)?;
        Ok(())
    }
}

fn read_lines(path: &Path) -> BarmanResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| BarmanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recovery_has_no_args() {
        assert!(RecoveryOptions::default().args().is_empty());
    }

    #[test]
    fn test_recovery_args_order() {
        let options = RecoveryOptions::default()
            .remote_ssh_command("ssh postgres@10.20.20.2")
            .target_time("2013-03-04 08:00:02")
            .unwrap()
            .target_xid("1234")
            .exclusive(true);
        assert_eq!(
            options.args(),
            vec![
                "--remote-ssh-command",
                "ssh postgres@10.20.20.2",
                "--target-time",
                "2013-03-04 08:00:02+00:00",
                "--target-xid",
                "1234",
                "--exclusive",
            ]
        );
    }

    #[test]
    fn test_recovery_rejects_bad_time() {
        assert!(RecoveryOptions::default().target_time("yesterday").is_err());
    }

    #[test]
    fn test_fetch_options_builders() {
        let options = FetchOptions::default().with_backups().with_wal_segments();
        assert!(options.with_backups);
        assert!(options.with_wal_segments);
    }
}
