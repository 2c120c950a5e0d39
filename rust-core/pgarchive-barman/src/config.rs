// SPDX-License-Identifier: PMPL-1.0-or-later
//! Barman integration configuration.
//!
//! Built once at process start (defaults, then environment, then explicit
//! overrides) and handed to [`crate::BarmanClient`] by value.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BarmanError, BarmanResult};

/// Name the barman executable must have.
pub const BARMAN_BINARY_NAME: &str = "barman";

/// Used when `barman` is not on `PATH`.
pub const DEFAULT_BINARY: &str = "/usr/bin/barman";

/// Used when `$HOME` is unset.
pub const DEFAULT_BARMAN_HOME: &str = "/var/lib/barman";

/// Base backups can take many hours.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 12 * 60 * 60;

pub const ENV_BINARY: &str = "PGARCHIVE_BARMAN_BINARY";
pub const ENV_BARMAN_HOME: &str = "PGARCHIVE_BARMAN_HOME";
pub const ENV_COMMAND_TIMEOUT_SECS: &str = "PGARCHIVE_COMMAND_TIMEOUT_SECS";

/// Where barman lives and how long its commands may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarmanConfig {
    /// Path to the barman executable.
    pub binary: PathBuf,
    /// Barman's backup root, holding `<server>/base/<id>/backup.info` and
    /// `<server>/wals/xlog.db`.
    pub barman_home: PathBuf,
    /// Upper bound on a single barman invocation, in seconds.
    pub command_timeout_secs: u64,
}

impl Default for BarmanConfig {
    fn default() -> Self {
        Self {
            binary: find_on_path(BARMAN_BINARY_NAME)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
            barman_home: env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BARMAN_HOME)),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl BarmanConfig {
    /// Defaults overridden by the `PGARCHIVE_*` environment variables.
    pub fn from_env() -> BarmanResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `PGARCHIVE_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BarmanResult<Self> {
        let mut config = Self::default();
        if let Some(binary) = lookup(ENV_BINARY) {
            config.binary = PathBuf::from(binary);
        }
        if let Some(home) = lookup(ENV_BARMAN_HOME) {
            config.barman_home = PathBuf::from(home);
        }
        if let Some(timeout) = lookup(ENV_COMMAND_TIMEOUT_SECS) {
            config.command_timeout_secs = timeout.trim().parse().map_err(|_| {
                BarmanError::Config(format!(
                    "{ENV_COMMAND_TIMEOUT_SECS} must be a whole number of seconds, got {timeout:?}"
                ))
            })?;
        }
        Ok(config)
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_barman_home(mut self, barman_home: impl Into<PathBuf>) -> Self {
        self.barman_home = barman_home.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_secs = timeout.as_secs();
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Check that the binary exists and is called `barman`, and that the
    /// backup root exists.
    pub fn validate(&self) -> BarmanResult<()> {
        if !self.binary.exists() {
            return Err(BarmanError::Config(format!(
                "binary {} doesn't exist",
                self.binary.display()
            )));
        }
        if self.binary.file_name().and_then(|name| name.to_str()) != Some(BARMAN_BINARY_NAME) {
            return Err(BarmanError::Config(format!(
                "binary {} isn't called '{BARMAN_BINARY_NAME}'",
                self.binary.display()
            )));
        }
        if !self.barman_home.is_dir() {
            return Err(BarmanError::Config(format!(
                "barman home {} doesn't exist",
                self.barman_home.display()
            )));
        }
        if self.command_timeout_secs == 0 {
            return Err(BarmanError::Config("command timeout must be positive".into()));
        }
        Ok(())
    }

    /// `<home>/<server>/base/<id>/backup.info`
    pub fn backup_info_path(&self, server: &str, backup_id: &str) -> PathBuf {
        self.barman_home
            .join(server)
            .join("base")
            .join(backup_id)
            .join("backup.info")
    }

    /// `<home>/<server>/wals/xlog.db`
    pub fn xlog_db_path(&self, server: &str) -> PathBuf {
        self.barman_home.join(server).join("wals").join("xlog.db")
    }
}

/// First regular file called `name` in a `PATH` directory.
fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
