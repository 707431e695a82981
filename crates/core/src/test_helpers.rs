// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: an env var guard and a recording transfer.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{Configuration, Overrides, Settings};
use crate::transfer::{Transfer, TransferOutcome};

/// RAII guard that sets/removes an env var and restores it on drop.
pub struct EnvGuard {
    key: &'static str,
    original: Option<String>,
}

impl EnvGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        let original = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, original }
    }

    pub fn remove(key: &'static str) -> Self {
        let original = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key, original }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.original {
            Some(val) => std::env::set_var(self.key, val),
            None => std::env::remove_var(self.key),
        }
    }
}

/// What a scripted call to [`MockTransfer`] does.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Succeed,
    Fail,
    /// Sleep before succeeding.
    Delay(Duration),
    /// Never complete.
    Hang,
    Panic,
}

/// A recorded transfer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub source: String,
    pub destination: String,
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<Call>>,
    script: Mutex<VecDeque<Step>>,
    cleanups: AtomicUsize,
}

/// Transfer that records calls instead of spawning a process.
///
/// Calls follow the queued [`Step`]s in order and succeed once the queue is
/// empty. Clones share state, so a test keeps one and hands the other to the
/// syncer.
#[derive(Clone, Default)]
pub struct MockTransfer {
    state: Arc<MockState>,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, step: Step) {
        self.state.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().unwrap().len()
    }

    pub fn cleanups(&self) -> usize {
        self.state.cleanups.load(Ordering::SeqCst)
    }
}

impl Transfer for MockTransfer {
    fn run<'a>(
        &'a self,
        source: &'a OsStr,
        destination: &'a OsStr,
        _settings: &'a Settings,
    ) -> Pin<Box<dyn Future<Output = TransferOutcome> + Send + 'a>> {
        self.state.calls.lock().unwrap().push(Call {
            source: source.to_string_lossy().into_owned(),
            destination: destination.to_string_lossy().into_owned(),
        });
        let step = self
            .state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Succeed);

        Box::pin(async move {
            match step {
                Step::Succeed => TransferOutcome::succeeded("total size 4096"),
                Step::Fail => TransferOutcome::failed(Some(1), "connection refused"),
                Step::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    TransferOutcome::succeeded("")
                }
                Step::Hang => std::future::pending().await,
                Step::Panic => panic!("transfer exploded"),
            }
        })
    }

    fn cleanup(&self) {
        self.state.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

pub const REMOTE: &str = "backup:/srv/app.db";

/// Overrides that make a valid configuration without touching the environment.
pub fn valid_overrides(local_path: &Path) -> Overrides {
    Overrides {
        remote: Some(REMOTE.to_string()),
        local_path: Some(local_path.to_path_buf()),
        interval: Some(Duration::from_secs(10)),
        sync_on_write: Some(true),
        write_debounce: Some(Duration::from_secs(2)),
        ssh_key: Some(String::new()),
        program: Some("sqlite3_rsync".to_string()),
        ..Overrides::default()
    }
}

/// A temp dir holding an existing local database file.
pub fn local_db() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    std::fs::write(&path, b"SQLite format 3\0").unwrap();
    (dir, path)
}

pub fn configuration(overrides: Overrides) -> Arc<Configuration> {
    Arc::new(Configuration::with_overrides(overrides))
}
