// SPDX-License-Identifier: PMPL-1.0-or-later
//! A database server configured in barman.

use std::path::PathBuf;

use pgarchive_catalog::BackupCatalog;
use serde::{Deserialize, Serialize};

/// Settings and health of one server, as reported by `show-server` and
/// `check`. Every field but the name is `None` until barman reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub active: Option<bool>,
    pub ssh_command: Option<String>,
    pub conninfo: Option<String>,
    pub backup_directory: Option<PathBuf>,
    pub base_backups_directory: Option<PathBuf>,
    pub wals_directory: Option<PathBuf>,
    /// `check`: barman can reach the server over ssh.
    pub ssh_check_ok: Option<bool>,
    /// `check`: barman can connect to PostgreSQL.
    pub pg_connection_ok: Option<bool>,
    /// As printed by barman, e.g. `9.2.3`.
    pub pg_version: Option<String>,
    /// Only loaded on request.
    pub backups: Option<BackupCatalog>,
}

impl Server {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Both connectivity checks ran and passed.
    pub fn is_healthy(&self) -> bool {
        self.ssh_check_ok == Some(true) && self.pg_connection_ok == Some(true)
    }
}
