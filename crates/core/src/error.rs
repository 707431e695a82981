// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for litesync operations.
//!
//! None of these escape the public sync operations: the syncer turns them
//! into failed outcomes and log lines.

use thiserror::Error;

/// All possible errors that can occur while preparing or running a transfer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {name}: '{value}'\n  hint: expected a whole number of seconds")]
    InvalidSetting { name: &'static str, value: String },
}

/// A specialized Result type for litesync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
