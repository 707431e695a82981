// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync loop manager.
//!
//! A [`Syncer`] owns at most one background task that periodically pushes the
//! local database to the remote. It also exposes one-shot `restore`, `sync`,
//! and `sync_debounced` operations that any number of tasks may call at once.
//!
//! Two independent locks guard the mutable state:
//! - the state lock serializes `start`/`stop` and owns the task handle
//! - the debounce lock covers only the "is the window over?" decision
//!
//! Write-triggered syncs therefore never wait on loop bookkeeping, and a
//! slow `stop` never blocks a debounce decision.

use std::any::Any;
use std::ffi::OsStr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::transfer::{SqliteRsync, Transfer};

/// How long `stop` waits for the loop task before aborting it.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// What a sync operation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing to do: invalid configuration, missing file, or feature disabled.
    Skipped,
    /// A write-triggered sync arrived inside the debounce window.
    Debounced,
    Completed,
    Failed,
}

#[derive(Default)]
struct LoopState {
    running: bool,
    task: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

struct Inner<T> {
    config: Arc<Configuration>,
    transfer: T,
    state: Mutex<LoopState>,
    /// Instant of the last write-triggered sync decision; `None` means never.
    last_write_sync: Mutex<Option<Instant>>,
    grace_period: Duration,
}

/// Handle to the sync loop. Clones share the same loop.
pub struct Syncer<T: Transfer = SqliteRsync> {
    inner: Arc<Inner<T>>,
}

impl<T: Transfer> Clone for Syncer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Syncer<SqliteRsync> {
    /// Create a syncer that shells out to `sqlite3_rsync`.
    pub fn new(config: Arc<Configuration>) -> Self {
        Self::with_transfer(config, SqliteRsync::new())
    }
}

impl<T: Transfer> Syncer<T> {
    pub fn with_transfer(config: Arc<Configuration>, transfer: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transfer,
                state: Mutex::new(LoopState::default()),
                last_write_sync: Mutex::new(None),
                grace_period: STOP_GRACE_PERIOD,
            }),
        }
    }

    /// Override how long `stop` waits before aborting the loop task.
    ///
    /// Only meaningful before the syncer is shared.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.grace_period = grace_period;
        }
        self
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.inner.config
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.running
    }

    /// Pull the remote copy if there is no local database yet.
    ///
    /// Never overwrites an existing local file. A failed pull is treated as
    /// "no backup yet", which is expected on first run.
    pub async fn restore(&self) -> SyncStatus {
        self.inner.restore().await
    }

    /// Push the local database to the remote now.
    pub async fn sync(&self) -> SyncStatus {
        self.inner.sync().await
    }

    /// Push after a write, at most once per debounce window.
    ///
    /// The window is measured from the last decision to sync, not from the
    /// end of that sync. The sync itself runs outside the debounce lock.
    pub async fn sync_debounced(&self) -> SyncStatus {
        let settings = self.inner.config.get();
        if !settings.sync_on_write || !settings.is_valid() {
            return SyncStatus::Skipped;
        }

        let due = {
            let mut last = self.inner.last_write_sync.lock().await;
            let now = Instant::now();
            let due = match *last {
                Some(at) => now.duration_since(at) >= settings.write_debounce,
                None => true,
            };
            if due {
                *last = Some(now);
            }
            due
        };

        if due {
            self.inner.sync().await
        } else {
            debug!("write sync debounced");
            SyncStatus::Debounced
        }
    }

    /// Launch the periodic loop.
    ///
    /// Returns `false` without side effects if the configuration is invalid
    /// or a loop is already running.
    pub async fn start(&self) -> bool {
        let settings = self.inner.config.get();
        if !settings.is_valid() {
            return false;
        }

        let mut state = self.inner.state.lock().await;
        if state.running {
            return false;
        }
        state.running = true;

        info!("starting sync loop (every {:?})", settings.interval);
        let cancel = CancellationToken::new();
        state.task = Some(tokio::spawn(run_loop(
            Arc::clone(&self.inner),
            cancel.clone(),
        )));
        state.cancel = Some(cancel);
        true
    }

    /// Stop the periodic loop, flushing one last sync first.
    ///
    /// Holds the state lock throughout, so a concurrent `start` waits until
    /// the old loop is gone and its credentials are cleaned up. Returns
    /// `false` if no loop was running.
    pub async fn stop(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if !state.running {
            return false;
        }
        state.running = false;

        info!("stopping sync loop");
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        self.inner.sync().await;

        if let Some(mut task) = state.task.take() {
            match tokio::time::timeout(self.inner.grace_period, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("sync loop task ended abnormally: {}", e),
                Err(_) => {
                    warn!(
                        "sync loop did not stop within {:?}, aborting",
                        self.inner.grace_period
                    );
                    task.abort();
                }
            }
        }

        self.inner.transfer.cleanup();
        info!("sync loop stopped");
        true
    }
}

impl<T: Transfer> Inner<T> {
    async fn restore(&self) -> SyncStatus {
        let settings = self.config.get();
        if !settings.is_valid() || settings.local_path.exists() {
            return SyncStatus::Skipped;
        }

        info!("restoring from {}...", settings.remote);
        let outcome = self
            .transfer
            .run(
                OsStr::new(&settings.remote),
                settings.local_path.as_os_str(),
                &settings,
            )
            .await;

        if outcome.is_success() {
            info!("restore completed");
            settings.callbacks.restore_succeeded();
            SyncStatus::Completed
        } else {
            if outcome.looks_like_missing_source() {
                info!("no remote backup found, starting fresh");
            } else {
                warn!(
                    "restore failed, starting fresh: {}",
                    outcome.output().trim()
                );
            }
            SyncStatus::Failed
        }
    }

    async fn sync(&self) -> SyncStatus {
        let settings = self.config.get();
        if !settings.is_valid() {
            return SyncStatus::Skipped;
        }
        if !settings.local_path.exists() {
            debug!(
                "{} does not exist yet, nothing to sync",
                settings.local_path.display()
            );
            return SyncStatus::Skipped;
        }

        info!("syncing to {}...", settings.remote);
        let outcome = self
            .transfer
            .run(
                settings.local_path.as_os_str(),
                OsStr::new(&settings.remote),
                &settings,
            )
            .await;

        if outcome.is_success() {
            info!("sync completed");
            settings.callbacks.sync_succeeded();
            SyncStatus::Completed
        } else {
            error!("sync failed, will retry: {}", outcome.output().trim());
            settings.callbacks.errored();
            SyncStatus::Failed
        }
    }
}

/// Body of the background task: sleep, sync, repeat until cancelled.
async fn run_loop<T: Transfer>(inner: Arc<Inner<T>>, cancel: CancellationToken) {
    loop {
        // Re-read every tick so interval changes apply without a restart.
        let interval = inner.config.get().interval;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        // A panicking tick must not take the loop down with it.
        if let Err(panic) = AssertUnwindSafe(inner.sync()).catch_unwind().await {
            error!("sync tick panicked: {}", panic_message(panic.as_ref()));
            inner.config.get().callbacks.errored();
        }
    }
    debug!("sync loop exited");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "syncer_tests.rs"]
mod tests;
