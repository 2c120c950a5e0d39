// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive barman integration - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::path::PathBuf;
use std::time::Duration;

use pgarchive_catalog::CatalogError;
use thiserror::Error;

/// Errors raised while driving the barman command or reading its files.
#[derive(Debug, Error)]
pub enum BarmanError {
    /// A value reported by barman failed catalog validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Reading `backup.info` or `xlog.db` failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The barman process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// barman exited unsuccessfully.
    #[error("`barman {command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        /// Exit code, or `None` if killed by a signal.
        status: ExitCode,
        stderr: String,
    },

    #[error("`barman {command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// A line of barman output did not have the expected shape.
    #[error("unexpected {context} line: {line:?}")]
    MalformedLine { context: &'static str, line: String },

    /// barman listed a WAL segment that has no entry in `xlog.db`.
    #[error("WAL segment {0} is listed but has no entry in xlog.db")]
    MissingXlogEntry(String),

    #[error("WAL segment {0} appears more than once in xlog.db")]
    DuplicateXlogEntry(String),

    #[error("backup {id} not found on server {server}")]
    BackupNotFound { server: String, id: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub Option<i32>);

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(code) => write!(f, "status {code}"),
            None => f.write_str("a signal"),
        }
    }
}

/// Convenience type alias for barman integration results.
pub type BarmanResult<T> = Result<T, BarmanError>;
