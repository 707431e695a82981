// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! Every variable the sync loop reads is defined here with a typed accessor.
//! The name constants are generated by `build.rs` and live in [`names`].
//! Accessors treat an empty value the same as an unset one.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the value of `SQLITE_REMOTE` if set.
pub fn remote() -> Option<String> {
    non_empty(names::SQLITE_REMOTE)
}

/// Returns the value of `SQLITE_LOCAL_PATH` if set.
pub fn local_path() -> Option<PathBuf> {
    non_empty(names::SQLITE_LOCAL_PATH).map(PathBuf::from)
}

/// Returns the raw value of `SQLITE_SYNC_INTERVAL` if set.
pub fn sync_interval() -> Option<String> {
    non_empty(names::SQLITE_SYNC_INTERVAL)
}

/// Returns `true` if `SQLITE_SYNC_ON_WRITE=true`.
pub fn sync_on_write() -> bool {
    std::env::var(names::SQLITE_SYNC_ON_WRITE).is_ok_and(|v| v == "true")
}

/// Returns the raw value of `SQLITE_WRITE_DEBOUNCE` if set.
pub fn write_debounce() -> Option<String> {
    non_empty(names::SQLITE_WRITE_DEBOUNCE)
}

/// Returns the value of `SQLITE_SSH_KEY` if set.
pub fn ssh_key() -> Option<String> {
    non_empty(names::SQLITE_SSH_KEY)
}

/// Returns the value of `SQLITE_RSYNC_BIN` if set.
pub fn rsync_bin() -> Option<String> {
    non_empty(names::SQLITE_RSYNC_BIN)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
