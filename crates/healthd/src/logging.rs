//! Logging setup
//!
//! Console output always, plus an appending log file when it can be opened.
//! `RUST_LOG` overrides the configured level unless `--verbose` is given.

use anyhow::{anyhow, Result};
use health_common::LoggingConfig;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter for the configured level, `debug` when verbose
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter_directive()))
}

/// Open the log file for appending, creating its directory if possible
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            // Missing permissions surface on open below
            let _ = fs::create_dir_all(dir);
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let file_layer = match open_log_file(&config.log_file) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!(
                "Warning: Could not set up file logging at {}: {}",
                config.log_file.display(),
                e
            );
            None
        }
    };

    tracing_subscriber::registry()
        .with(build_filter(config, verbose))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
