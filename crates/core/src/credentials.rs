// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transient SSH credentials for the transfer tool.
//!
//! The transfer tool only accepts a remote-shell command, so key material is
//! materialized as two files: a private key (mode 0600) and a wrapper script
//! (mode 0755) that execs `ssh` with that key. Both are created lazily, reused
//! for the life of the process, and removed by [`CredentialStore::cleanup`].
//! File names embed the process id so concurrent instances on one host never
//! share artifacts.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const KEY_FILE_MODE: u32 = 0o600;
const WRAPPER_MODE: u32 = 0o755;

#[derive(Debug, Default)]
struct Artifacts {
    /// Key file written by this store. User-supplied key paths never land here.
    key_file: Option<PathBuf>,
    /// Wrapper script and the key file it was generated for.
    wrapper: Option<(PathBuf, PathBuf)>,
}

/// Owner of the materialized key file and wrapper script.
#[derive(Debug)]
pub struct CredentialStore {
    dir: PathBuf,
    cache: Mutex<Artifacts>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Store artifacts in the system temp directory.
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(Artifacts::default()),
        }
    }

    /// Where raw key material is written for this process.
    pub fn key_file_path(&self) -> PathBuf {
        self.dir
            .join(format!("litesync-key-{}", std::process::id()))
    }

    /// Where the wrapper script is written for this process.
    pub fn wrapper_path(&self) -> PathBuf {
        self.dir
            .join(format!("litesync-ssh-{}", std::process::id()))
    }

    /// Resolve configured key material to a usable private key file.
    ///
    /// A value naming an existing file is returned as-is and never deleted.
    /// Anything else is treated as key text, normalized with [`normalize_key`],
    /// and written once per process.
    pub fn resolve_key_file(&self, material: &str) -> Result<PathBuf> {
        let candidate = Path::new(material.trim());
        if !material.contains('\n') && candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }

        let mut cache = self.lock();
        if let Some(path) = cache.key_file.as_ref().filter(|p| p.exists()) {
            return Ok(path.clone());
        }

        let contents = normalize_key(material);
        if contents.trim().is_empty() {
            return Err(Error::Credential("ssh key material is empty".to_string()));
        }

        let path = self.key_file_path();
        write_with_mode(&path, &contents, KEY_FILE_MODE)?;
        debug!(
            "wrote ssh key to {} ({} bytes)",
            path.display(),
            contents.len()
        );

        cache.key_file = Some(path.clone());
        Ok(path)
    }

    /// Resolve the wrapper script that runs `ssh` with `key_file`.
    ///
    /// A cached script that still exists is reused unless it was generated
    /// for a different key file.
    pub fn resolve_wrapper_script(&self, key_file: &Path) -> Result<PathBuf> {
        let mut cache = self.lock();
        if let Some((path, for_key)) = &cache.wrapper {
            if for_key == key_file && path.exists() {
                return Ok(path.clone());
            }
        }

        let path = self.wrapper_path();
        write_with_mode(&path, &wrapper_script(key_file), WRAPPER_MODE)?;
        debug!("wrote ssh wrapper to {}", path.display());

        cache.wrapper = Some((path.clone(), key_file.to_path_buf()));
        Ok(path)
    }

    /// Delete every artifact this store created. Safe to call repeatedly.
    pub fn cleanup(&self) {
        let mut cache = self.lock();
        let key_file = cache.key_file.take();
        let wrapper = cache.wrapper.take().map(|(path, _)| path);

        for path in key_file.iter().chain(wrapper.iter()) {
            match fs::remove_file(path) {
                Ok(()) => debug!("removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove {}: {}", path.display(), e),
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Artifacts> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Normalize pasted key text into a well-formed key file body.
///
/// Strips surrounding whitespace and quote characters, drops blank lines, and
/// ends with exactly one newline.
pub fn normalize_key(raw: &str) -> String {
    let unquoted = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();

    let mut body = unquoted
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    body.push('\n');
    body
}

/// The POSIX shell wrapper handed to the transfer tool's `--ssh` option.
pub fn wrapper_script(key_file: &Path) -> String {
    format!(
        "#!/bin/sh\nexec ssh -i {} -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null \"$@\"\n",
        shell_quote(&key_file.to_string_lossy())
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Write `contents` to `path`, creating it with `mode` and forcing `mode` if
/// the file already existed.
fn write_with_mode(path: &Path, contents: &str, mode: u32) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
