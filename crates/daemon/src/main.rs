// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! litesyncd - keeps a local SQLite database in sync with a remote copy.
//!
//! Configuration comes from the `SQLITE_*` environment variables. On start the
//! daemon restores a missing database from the remote, then pushes it every
//! interval until it receives SIGINT or SIGTERM. SIGHUP restarts the loop.
//!
//! Usage:
//!   litesyncd [--log-file <path>] [--verbose] [--lock-dir <dir>]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use litesync::env::names;
use litesync::{Configuration, Lifecycle, Syncer};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{error, info, warn};

mod lock;

/// litesyncd: SQLite backup sync daemon
#[derive(Parser, Debug)]
#[command(name = "litesyncd", version)]
#[command(about = "Keep a local SQLite database in sync with a remote copy")]
struct Args {
    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory for the single-instance lock file
    #[arg(long)]
    lock_dir: Option<PathBuf>,
}

struct Signals {
    terminate: Signal,
    interrupt: Signal,
    hangup: Signal,
}

impl Signals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logging(args.log_file.as_deref(), args.verbose);

    let config = Arc::new(Configuration::new());
    let settings = config.get();
    if !settings.is_valid() {
        warn!(
            "sync not configured: set {} and {}",
            names::SQLITE_REMOTE,
            names::SQLITE_LOCAL_PATH
        );
        return;
    }

    info!(
        "litesyncd starting, local={}, remote={}",
        settings.local_path.display(),
        settings.remote
    );

    let lock_dir = args.lock_dir.unwrap_or_else(lock::default_dir);
    let lock_path = lock::lock_path(&lock_dir, &settings.local_path);
    let lock_file = match lock::acquire(&lock_path) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to acquire lock {}: {}", lock_path.display(), e);
            std::process::exit(1);
        }
    };

    // Installed before the first restore so early signals are not lost.
    let mut signals = match Signals::install() {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install signal handlers: {}", e);
            std::process::exit(1);
        }
    };

    let lifecycle = Lifecycle::new(Syncer::new(config));
    lifecycle.on_started().await;

    // Signal readiness to parent process
    println!("READY");
    let _ = std::io::stdout().flush();

    loop {
        tokio::select! {
            _ = signals.terminate.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = signals.interrupt.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = signals.hangup.recv() => {
                info!("received SIGHUP, restarting sync loop");
                lifecycle.on_restart().await;
                lifecycle.on_started().await;
            }
        }
    }

    lifecycle.on_stopped().await;
    drop(lock_file);
    info!("litesyncd stopped");
}

fn setup_logging(log_file: Option<&Path>, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Try to open log file, fall back to stderr
    let file = log_file.and_then(|path| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    if let Some(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
