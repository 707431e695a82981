// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("cargo:warning=OUT_DIR not set: {e}");
            std::process::exit(1);
        }
    };
    let dest_path = Path::new(&out_dir).join("env_names.rs");

    let mut file = match fs::File::create(&dest_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("cargo:warning=failed to create env_names.rs: {e}");
            std::process::exit(1);
        }
    };

    let contents = r#"/// Environment variable: remote locator handed to the transfer tool.
pub const SQLITE_REMOTE: &str = "SQLITE_REMOTE";

/// Environment variable: path of the local database file.
pub const SQLITE_LOCAL_PATH: &str = "SQLITE_LOCAL_PATH";

/// Environment variable: seconds between periodic syncs.
pub const SQLITE_SYNC_INTERVAL: &str = "SQLITE_SYNC_INTERVAL";

/// Environment variable: `true` enables write-triggered syncs.
pub const SQLITE_SYNC_ON_WRITE: &str = "SQLITE_SYNC_ON_WRITE";

/// Environment variable: minimum seconds between write-triggered syncs.
pub const SQLITE_WRITE_DEBOUNCE: &str = "SQLITE_WRITE_DEBOUNCE";

/// Environment variable: SSH private key material, or a path to a key file.
pub const SQLITE_SSH_KEY: &str = "SQLITE_SSH_KEY";

/// Environment variable: transfer program to invoke.
pub const SQLITE_RSYNC_BIN: &str = "SQLITE_RSYNC_BIN";
"#;

    if let Err(e) = file.write_all(contents.as_bytes()) {
        eprintln!("cargo:warning=failed to write env_names.rs: {e}");
        std::process::exit(1);
    }
}
