// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive barman integration - Command execution
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// barman is driven through its command line and answers with line-oriented
// text on stdout. `CommandRunner` is the seam between the client and the
// process: `ProcessRunner` spawns the real binary, tests substitute a
// scripted runner.
//
// Arguments are passed as an argument vector, never through a shell.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::BarmanConfig;
use crate::error::{BarmanError, BarmanResult, ExitCode};

/// How often a running command is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs barman sub-commands.
pub trait CommandRunner {
    /// Run barman with `args` and return its stdout split into lines.
    ///
    /// With `abort_on_error` a non-zero exit is an error; without it the
    /// output is returned regardless (barman's `check` exits non-zero when
    /// any check fails but still prints every result).
    fn run(&self, args: &[String], abort_on_error: bool) -> BarmanResult<Vec<String>>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, args: &[String], abort_on_error: bool) -> BarmanResult<Vec<String>> {
        (**self).run(args, abort_on_error)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    fn run(&self, args: &[String], abort_on_error: bool) -> BarmanResult<Vec<String>> {
        (**self).run(args, abort_on_error)
    }
}

/// Runs the barman executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &BarmanConfig) -> Self {
        Self::new(config.binary.clone(), config.command_timeout())
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[String], abort_on_error: bool) -> BarmanResult<Vec<String>> {
        let command = args.join(" ");
        debug!(binary = %self.binary.display(), %command, "Running barman");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BarmanError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        // Drain both pipes while waiting so a chatty command cannot block on
        // a full pipe buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match wait_with_timeout(&mut child, self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                terminate(&mut child);
                return Err(BarmanError::Timeout {
                    command,
                    timeout: self.timeout,
                });
            }
            Err(source) => {
                terminate(&mut child);
                return Err(BarmanError::Spawn {
                    program: self.binary.clone(),
                    source,
                });
            }
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            let code = ExitCode(status.code());
            if abort_on_error {
                return Err(BarmanError::CommandFailed {
                    command,
                    status: code,
                    stderr: stderr.trim().to_string(),
                });
            }
            warn!(%command, status = %code, "barman exited unsuccessfully, keeping its output");
        }

        let lines: Vec<String> = stdout.lines().map(str::to_string).collect();
        debug!(%command, lines = lines.len(), "barman finished");
        Ok(lines)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Kill `child` and reap it. Closing its pipes lets the drain threads finish.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// `Ok(None)` if `timeout` elapsed first.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
