// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! litesync-core: keep a local SQLite file in sync with a remote copy
//!
//! This crate provides configuration resolution, SSH credential handling,
//! the `sqlite3_rsync` transfer runner, and the sync loop used by the
//! litesyncd daemon and by embedding hosts.

pub mod config;
pub mod credentials;
pub mod env;
pub mod error;
pub mod hooks;
pub mod syncer;
pub mod transfer;

#[cfg(test)]
mod test_helpers;

pub use config::{Callback, Callbacks, Configuration, Overrides, Settings};
pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use hooks::{Lifecycle, WriteHook};
pub use syncer::{SyncStatus, Syncer};
pub use transfer::{SqliteRsync, Transfer, TransferOutcome};
