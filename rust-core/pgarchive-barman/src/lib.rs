// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive barman integration
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Feeds the catalog from a barman installation: runs barman sub-commands,
// parses their output and joins in the metadata barman keeps on disk.
//
// # Structure
//
// - `config`  : BarmanConfig (binary, home directory, command timeout)
// - `command` : CommandRunner seam and the process-backed ProcessRunner
// - `parse`   : pure parsers for barman output, backup.info and xlog.db
// - `server`  : Server record
// - `client`  : BarmanClient with FetchOptions and RecoveryOptions

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod parse;
pub mod server;

// Re-export the primary public API for ergonomic imports.
pub use client::{BarmanClient, FetchOptions, RecoveryOptions};
pub use command::{CommandRunner, ProcessRunner};
pub use config::BarmanConfig;
pub use error::{BarmanError, BarmanResult, ExitCode};
pub use parse::XlogEntry;
pub use server::Server;
