//! Configuration loading for the health checker.
//!
//! Reads `./config.json` by default, falling back to
//! `/etc/service-health-checker/config.json`. The format follows the file
//! extension: `.toml`, `.yaml`/`.yml`, otherwise JSON.

use crate::error::{ConfigError, ServiceConfigError};
use crate::service::{RawServiceEntry, ServiceSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Config path used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// System-wide config location
pub const SYSTEM_CONFIG_PATH: &str = "/etc/service-health-checker/config.json";

/// Log file used when the config names none
pub const DEFAULT_LOG_FILE: &str = "/var/log/service-health-checker.log";

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Level name, case-insensitive (DEBUG, INFO, WARNING, ...)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_interval() -> u64 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Tracing filter directive for the configured level.
    /// Unrecognized names fall back to `info`.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" | "critical" | "fatal" => "error",
            _ => "info",
        }
    }
}

/// Full checker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Service entries, resolved one by one so a bad entry cannot
    /// take the others down with it
    #[serde(default)]
    pub services: Vec<serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            logging: LoggingConfig::default(),
            services: Vec::new(),
        }
    }
}

/// A service entry that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedService {
    /// Entry name if it had one, otherwise its position
    pub label: String,
    pub error: ServiceConfigError,
}

/// Services resolved from a config
#[derive(Debug, Clone, Default)]
pub struct ServiceSet {
    pub services: Vec<ServiceSpec>,
    pub rejected: Vec<RejectedService>,
}

impl Config {
    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(path, &content)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text, picking the format from the path's extension
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))
            }
            _ => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval(self.interval_seconds));
        }
        Ok(())
    }

    /// Resolve every service entry. Rejected entries are logged and
    /// reported; valid ones keep their configured order.
    pub fn resolve_services(&self) -> ServiceSet {
        let mut set = ServiceSet::default();
        let mut seen = HashSet::new();

        for (index, value) in self.services.iter().enumerate() {
            let label = value
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));

            let resolved = serde_json::from_value::<RawServiceEntry>(value.clone())
                .map_err(|e| ServiceConfigError::Invalid(e.to_string()))
                .and_then(|entry| ServiceSpec::from_entry(&entry))
                .and_then(|spec| {
                    if seen.insert(spec.name.clone()) {
                        Ok(spec)
                    } else {
                        Err(ServiceConfigError::DuplicateName(spec.name))
                    }
                });

            match resolved {
                Ok(spec) => set.services.push(spec),
                Err(e) => {
                    error!(
                        service = %label,
                        "Failed to initialize service check for {}: {}",
                        label,
                        e
                    );
                    set.rejected.push(RejectedService { label, error: e });
                }
            }
        }

        set
    }
}

/// Pick the config file to read.
///
/// An explicit path is used as given. The default path falls back to the
/// system location when it does not exist.
pub fn resolve_config_path(requested: &Path) -> PathBuf {
    resolve_config_path_with(requested, Path::new(SYSTEM_CONFIG_PATH))
}

fn resolve_config_path_with(requested: &Path, system_path: &Path) -> PathBuf {
    if requested == Path::new(DEFAULT_CONFIG_PATH) && !requested.exists() && system_path.exists() {
        return system_path.to_path_buf();
    }
    requested.to_path_buf()
}
