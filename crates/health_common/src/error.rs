//! Error types for the health checker.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors. Any of these aborts startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config from {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid interval: {0} seconds (must be at least 1)")]
    InvalidInterval(u64),
}

/// Per-service configuration errors. The offending entry is skipped,
/// the remaining services still load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceConfigError {
    #[error("Unknown check type: {0}")]
    UnknownCheckType(String),

    #[error("Service entry has no name")]
    MissingName,

    #[error("Invalid service entry: {0}")]
    Invalid(String),

    #[error("Duplicate service name: {0}")]
    DuplicateName(String),
}
