// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transfer abstraction over the external `sqlite3_rsync` tool.
//!
//! Provides a trait-based seam that enables:
//! - The real subprocess runner for production
//! - Recording mocks for syncer tests

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};

/// Marker the tool prints in its closing size summary.
const SUMMARY_MARKER: &str = "total size";

/// Output fragments that mean the source database simply isn't there.
const MISSING_SOURCE_MARKERS: &[&str] = &[
    "no such file",
    "does not exist",
    "unable to open",
    "cannot open",
];

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded {
        output: String,
    },
    Failed {
        /// Exit status, or `None` if the tool never ran or was killed.
        status: Option<i32>,
        output: String,
    },
}

impl TransferOutcome {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self::Succeeded {
            output: output.into(),
        }
    }

    pub fn failed(status: Option<i32>, output: impl Into<String>) -> Self {
        Self::Failed {
            status,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Combined stdout and stderr of the tool.
    pub fn output(&self) -> &str {
        match self {
            Self::Succeeded { output } | Self::Failed { output, .. } => output,
        }
    }

    /// Whether a failure reads like "the source does not exist".
    ///
    /// The exit status alone can't tell a missing remote backup apart from a
    /// broken transfer, so this looks at the tool's output.
    pub fn looks_like_missing_source(&self) -> bool {
        match self {
            Self::Succeeded { .. } => false,
            Self::Failed { output, .. } => {
                let output = output.to_lowercase();
                MISSING_SOURCE_MARKERS.iter().any(|m| output.contains(m))
            }
        }
    }
}

/// Moves a database file from `source` to `destination`.
///
/// Failures are reported through [`TransferOutcome`], never as errors; the
/// caller decides whether a failure matters.
pub trait Transfer: Send + Sync + 'static {
    /// Copy `source` to `destination` using the given settings.
    fn run<'a>(
        &'a self,
        source: &'a OsStr,
        destination: &'a OsStr,
        settings: &'a Settings,
    ) -> Pin<Box<dyn Future<Output = TransferOutcome> + Send + 'a>>;

    /// Release transient artifacts (credential files) created by `run`.
    fn cleanup(&self);
}

/// Runs the `sqlite3_rsync` binary as a child process.
#[derive(Debug, Default)]
pub struct SqliteRsync {
    credentials: CredentialStore,
}

impl SqliteRsync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: CredentialStore) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Build the argument vector (without the program name).
    ///
    /// Materializes the key file and wrapper script when a key is configured.
    pub fn build_args(
        &self,
        source: &OsStr,
        destination: &OsStr,
        settings: &Settings,
    ) -> Result<Vec<OsString>> {
        let mut args: Vec<OsString> = vec![
            source.to_os_string(),
            destination.to_os_string(),
            "--protocol".into(),
            "1".into(),
            "-v".into(),
        ];

        if let Some(ref key) = settings.ssh_key {
            let key_file = self.credentials.resolve_key_file(key)?;
            let wrapper = self.credentials.resolve_wrapper_script(&key_file)?;
            args.push("--ssh".into());
            args.push(wrapper.into_os_string());
        }

        Ok(args)
    }

    async fn execute(
        &self,
        source: &OsStr,
        destination: &OsStr,
        settings: &Settings,
    ) -> Result<TransferOutcome> {
        let args = self.build_args(source, destination, settings)?;
        debug!("running: {} {:?}", settings.program, args);

        // Both streams share one pipe so the output keeps the order it was
        // printed in, as `2>&1` would.
        let (mut reader, writer) = io::pipe()?;

        // No shell: locators are passed verbatim as discrete arguments.
        let mut command = Command::new(&settings.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| Error::Spawn {
            program: settings.program.clone(),
            source,
        })?;
        // The command still holds the write ends; the reader only sees EOF
        // once they are closed.
        drop(command);

        let collect = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });
        let status = child.wait().await?;
        let bytes = collect.await.map_err(io::Error::other)??;
        let combined = String::from_utf8_lossy(&bytes).into_owned();

        if !status.success() {
            return Ok(TransferOutcome::failed(status.code(), combined));
        }

        if let Some(stats) = summarize(&combined) {
            info!("{}", stats);
        }
        Ok(TransferOutcome::succeeded(combined))
    }
}

impl Transfer for SqliteRsync {
    fn run<'a>(
        &'a self,
        source: &'a OsStr,
        destination: &'a OsStr,
        settings: &'a Settings,
    ) -> Pin<Box<dyn Future<Output = TransferOutcome> + Send + 'a>> {
        Box::pin(async move {
            match self.execute(source, destination, settings).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("transfer could not run: {}", e);
                    TransferOutcome::failed(None, e.to_string())
                }
            }
        })
    }

    fn cleanup(&self) {
        self.credentials.cleanup();
    }
}

/// The last two output lines when the tool printed its size summary.
pub fn summarize(output: &str) -> Option<String> {
    if !output.contains(SUMMARY_MARKER) {
        return None;
    }
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let tail = &lines[lines.len().saturating_sub(2)..];
    Some(tail.join(" | "))
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
