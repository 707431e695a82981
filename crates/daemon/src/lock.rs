// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance lock, one per local database.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

/// Where lock files go when `--lock-dir` is not given.
pub fn default_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

/// Lock file path for a database, stable across relative/absolute spellings.
pub fn lock_path(dir: &Path, local_path: &Path) -> PathBuf {
    // The database may not exist yet, so canonicalize can't be used here.
    let absolute = std::path::absolute(local_path).unwrap_or_else(|_| local_path.to_path_buf());

    let mut hasher = Sha256::new();
    hasher.update(absolute.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    dir.join(format!("litesyncd-{}.lock", hex::encode(&result[..8])))
}

/// Take an exclusive lock; fails if another daemon holds it.
pub fn acquire(lock_path: &Path) -> io::Result<fs::File> {
    use fs2::FileExt;

    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)?;
    file.try_lock_exclusive().map_err(|_| {
        io::Error::other("another litesyncd is already syncing this database")
    })?;
    Ok(file)
}
