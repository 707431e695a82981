// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Host integration hooks.
//!
//! [`Lifecycle`] maps server lifecycle events onto the syncer, and
//! [`WriteHook`] is what a persistence layer calls after each committed write.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::syncer::{SyncStatus, Syncer};
use crate::transfer::{SqliteRsync, Transfer};

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;

/// Server lifecycle adapter.
pub struct Lifecycle<T: Transfer = SqliteRsync> {
    syncer: Syncer<T>,
}

impl<T: Transfer> Lifecycle<T> {
    pub fn new(syncer: Syncer<T>) -> Self {
        Self { syncer }
    }

    pub fn syncer(&self) -> &Syncer<T> {
        &self.syncer
    }

    /// Server finished booting: pull the backup if needed, then start syncing.
    pub async fn on_started(&self) {
        if !self.syncer.config().is_valid() {
            info!("sync not configured, skipping");
            return;
        }
        self.syncer.restore().await;
        self.syncer.start().await;
    }

    /// Server is shutting down.
    pub async fn on_stopped(&self) {
        self.syncer.stop().await;
    }

    /// Server is about to restart; `on_started` follows once it is back.
    pub async fn on_restart(&self) {
        self.syncer.stop().await;
    }
}

/// After-commit hook for the persistence layer.
pub struct WriteHook<T: Transfer = SqliteRsync> {
    syncer: Syncer<T>,
}

impl<T: Transfer> Clone for WriteHook<T> {
    fn clone(&self) -> Self {
        Self {
            syncer: self.syncer.clone(),
        }
    }
}

impl<T: Transfer> WriteHook<T> {
    pub fn new(syncer: Syncer<T>) -> Self {
        Self { syncer }
    }

    /// Record a committed write, syncing if the debounce window allows.
    ///
    /// Never panics into the caller: a failure inside the sync path is logged
    /// and reported through `on_error`.
    pub async fn after_write(&self) -> SyncStatus {
        match AssertUnwindSafe(self.syncer.sync_debounced())
            .catch_unwind()
            .await
        {
            Ok(status) => status,
            Err(_) => {
                error!("write-triggered sync panicked");
                self.syncer.config().get().callbacks.errored();
                SyncStatus::Failed
            }
        }
    }

    /// Fire-and-forget variant of [`after_write`](Self::after_write).
    pub fn spawn_after_write(&self) -> JoinHandle<SyncStatus> {
        let hook = self.clone();
        tokio::spawn(async move { hook.after_write().await })
    }
}
