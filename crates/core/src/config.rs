// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync loop configuration.
//!
//! Every value resolves in the same order: explicit override, then the
//! matching `SQLITE_*` environment variable, then the built-in default.
//! Nothing is cached. Each call to [`Configuration::get`] produces a fresh
//! [`Settings`] snapshot, so changes to overrides or the environment apply to
//! the next operation.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::env;
use crate::error::{Error, Result};

/// Default time between periodic syncs.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
/// Default minimum time between write-triggered syncs.
pub const DEFAULT_WRITE_DEBOUNCE: Duration = Duration::from_secs(2);
/// Default transfer program.
pub const DEFAULT_PROGRAM: &str = "sqlite3_rsync";

/// A user callback fired after a sync event.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Optional hooks fired by the syncer. Absent hooks are skipped.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// Fired after a successful local→remote sync.
    pub on_sync: Option<Callback>,
    /// Fired after a successful remote→local restore.
    pub on_restore: Option<Callback>,
    /// Fired when a sync fails or a loop tick panics.
    pub on_error: Option<Callback>,
}

impl Callbacks {
    pub fn sync_succeeded(&self) {
        fire("on_sync", self.on_sync.as_ref());
    }

    pub fn restore_succeeded(&self) {
        fire("on_restore", self.on_restore.as_ref());
    }

    pub fn errored(&self) {
        fire("on_error", self.on_error.as_ref());
    }
}

/// Invoke a callback if present. A panicking callback is logged, not propagated.
fn fire(name: &str, callback: Option<&Callback>) {
    let Some(callback) = callback else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
        error!("{} callback panicked", name);
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_sync", &self.on_sync.is_some())
            .field("on_restore", &self.on_restore.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Explicit values that take precedence over the environment.
///
/// An override set to an empty string or path wins over the environment and
/// resolves to "unset".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub remote: Option<String>,
    pub local_path: Option<PathBuf>,
    pub interval: Option<Duration>,
    pub sync_on_write: Option<bool>,
    pub write_debounce: Option<Duration>,
    /// Raw key text or a path to an existing key file.
    pub ssh_key: Option<String>,
    pub program: Option<String>,
    pub callbacks: Callbacks,
}

/// A resolved configuration snapshot.
#[derive(Clone)]
pub struct Settings {
    pub remote: String,
    pub local_path: PathBuf,
    pub interval: Duration,
    pub sync_on_write: bool,
    pub write_debounce: Duration,
    pub ssh_key: Option<String>,
    pub program: String,
    pub callbacks: Callbacks,
}

impl Settings {
    /// A configuration is usable once both ends of the transfer are known.
    pub fn is_valid(&self) -> bool {
        !self.remote.trim().is_empty() && !self.local_path.as_os_str().is_empty()
    }
}

// Key material stays out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("remote", &self.remote)
            .field("local_path", &self.local_path)
            .field("interval", &self.interval)
            .field("sync_on_write", &self.sync_on_write)
            .field("write_debounce", &self.write_debounce)
            .field("ssh_key", &self.ssh_key.as_ref().map(|_| "<redacted>"))
            .field("program", &self.program)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// Live configuration shared between the host application and the syncer.
#[derive(Debug, Default)]
pub struct Configuration {
    overrides: RwLock<Overrides>,
}

impl Configuration {
    /// Configuration driven purely by the environment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: Overrides) -> Self {
        Self {
            overrides: RwLock::new(overrides),
        }
    }

    /// Mutate the overrides in place.
    pub fn configure<F>(&self, f: F)
    where
        F: FnOnce(&mut Overrides),
    {
        let mut overrides = self
            .overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut overrides);
    }

    pub fn set_remote(&self, remote: impl Into<String>) {
        let remote = remote.into();
        self.configure(|o| o.remote = Some(remote));
    }

    pub fn set_local_path(&self, local_path: impl Into<PathBuf>) {
        let local_path = local_path.into();
        self.configure(|o| o.local_path = Some(local_path));
    }

    pub fn set_interval(&self, interval: Duration) {
        self.configure(|o| o.interval = Some(interval));
    }

    pub fn set_sync_on_write(&self, enabled: bool) {
        self.configure(|o| o.sync_on_write = Some(enabled));
    }

    pub fn set_write_debounce(&self, window: Duration) {
        self.configure(|o| o.write_debounce = Some(window));
    }

    /// Raw key text or a path to an existing key file.
    pub fn set_ssh_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.configure(|o| o.ssh_key = Some(key));
    }

    pub fn set_program(&self, program: impl Into<String>) {
        let program = program.into();
        self.configure(|o| o.program = Some(program));
    }

    pub fn set_callbacks(&self, callbacks: Callbacks) {
        self.configure(|o| o.callbacks = callbacks);
    }

    /// Resolve the current settings.
    pub fn get(&self) -> Settings {
        let overrides = self
            .overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let interval = overrides
            .interval
            .or_else(|| env_seconds(env::names::SQLITE_SYNC_INTERVAL, env::sync_interval()))
            .unwrap_or(DEFAULT_INTERVAL);
        let interval = if interval.is_zero() {
            let message = format!("sync interval must be positive, using {:?}", DEFAULT_INTERVAL);
            warn_once(env::names::SQLITE_SYNC_INTERVAL, "0", &message);
            DEFAULT_INTERVAL
        } else {
            interval
        };

        Settings {
            remote: overrides.remote.or_else(env::remote).unwrap_or_default(),
            local_path: overrides
                .local_path
                .or_else(env::local_path)
                .unwrap_or_default(),
            interval,
            sync_on_write: overrides.sync_on_write.unwrap_or_else(env::sync_on_write),
            write_debounce: overrides
                .write_debounce
                .or_else(|| {
                    env_seconds(env::names::SQLITE_WRITE_DEBOUNCE, env::write_debounce())
                })
                .unwrap_or(DEFAULT_WRITE_DEBOUNCE),
            ssh_key: overrides
                .ssh_key
                .or_else(env::ssh_key)
                .filter(|key| !key.trim().is_empty()),
            program: overrides
                .program
                .or_else(env::rsync_bin)
                .filter(|program| !program.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
            callbacks: overrides.callbacks,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.get().is_valid()
    }
}

/// Parse an environment value as whole seconds, warning on garbage.
fn env_seconds(name: &'static str, raw: Option<String>) -> Option<Duration> {
    let raw = raw?;
    match parse_seconds(name, &raw) {
        Ok(duration) => Some(duration),
        Err(e) => {
            warn_once(name, &raw, &format!("{}; using default", e));
            None
        }
    }
}

/// Last bad value reported per setting. Settings are re-read on every tick
/// and write, so a value is warned about once and then only at debug level.
static REPORTED: Mutex<BTreeMap<&'static str, String>> = Mutex::new(BTreeMap::new());

fn warn_once(name: &'static str, value: &str, message: &str) {
    if first_report(name, value) {
        warn!("{}", message);
    } else {
        debug!("{}", message);
    }
}

/// True unless `value` is the bad value last reported for `name`.
fn first_report(name: &'static str, value: &str) -> bool {
    let mut reported = REPORTED.lock().unwrap_or_else(PoisonError::into_inner);
    if reported.get(name).is_some_and(|last| last == value) {
        return false;
    }
    reported.insert(name, value.to_string());
    true
}

pub(crate) fn parse_seconds(name: &'static str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::InvalidSetting {
            name,
            value: raw.to_string(),
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
