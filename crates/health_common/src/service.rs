//! Service specifications and check-type resolution
//!
//! A `ServiceSpec` is built once from a raw config entry and never changes
//! afterwards. The set of check variants is closed: systemd unit status or an
//! HTTP endpoint status.

use crate::error::ServiceConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default HTTP check timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: f64 = 5.0;

/// Default expected HTTP status
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Kind of health check, as named by `check.type` in the config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Systemd,
    Http,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Systemd => "systemd",
            CheckKind::Http => "http",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = ServiceConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "systemd" => Ok(CheckKind::Systemd),
            "http" => Ok(CheckKind::Http),
            other => Err(ServiceConfigError::UnknownCheckType(other.to_string())),
        }
    }
}

/// Resolve a `check.type` string to a check kind
pub fn resolve_check_type(check_type: &str) -> Result<CheckKind, ServiceConfigError> {
    check_type.parse()
}

/// Parameters of an HTTP endpoint check
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCheckSpec {
    pub url: String,
    pub timeout: Duration,
    pub expected_status: u16,
}

impl HttpCheckSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs_f64(DEFAULT_HTTP_TIMEOUT_SECS),
            expected_status: DEFAULT_EXPECTED_STATUS,
        }
    }
}

/// Check variant with its type-specific parameters
#[derive(Debug, Clone, PartialEq)]
pub enum CheckSpec {
    /// `systemctl is-active <unit>`
    Systemd,
    /// GET on an endpoint, compared against an expected status
    Http(HttpCheckSpec),
}

impl CheckSpec {
    pub fn kind(&self) -> CheckKind {
        match self {
            CheckSpec::Systemd => CheckKind::Systemd,
            CheckSpec::Http(_) => CheckKind::Http,
        }
    }
}

/// A declared service, immutable for the lifetime of the process
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSpec {
    /// Unique identifier used for lookups and logging
    pub name: String,
    /// How liveness is probed
    pub check: CheckSpec,
    /// Systemd unit restarted on remediation
    pub unit: String,
    /// Opt-in to automatic restarts
    pub restart_on_failure: bool,
    /// Rate budget per trailing hour; 0 disables automatic restarts
    pub max_restarts_per_hour: u32,
}

impl ServiceSpec {
    /// Systemd-checked service whose unit shares its name
    pub fn systemd(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unit: name.clone(),
            name,
            check: CheckSpec::Systemd,
            restart_on_failure: false,
            max_restarts_per_hour: 0,
        }
    }

    /// HTTP-checked service with default timeout and expected status
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            unit: name.clone(),
            name,
            check: CheckSpec::Http(HttpCheckSpec::new(url)),
            restart_on_failure: false,
            max_restarts_per_hour: 0,
        }
    }

    /// Enable automatic restarts with the given hourly budget
    pub fn with_auto_restart(mut self, max_restarts_per_hour: u32) -> Self {
        self.restart_on_failure = true;
        self.max_restarts_per_hour = max_restarts_per_hour;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn kind(&self) -> CheckKind {
        self.check.kind()
    }

    /// Build a spec from a raw config entry.
    ///
    /// The check type is resolved first, so an unknown type is reported as
    /// such even when the rest of the entry is malformed too.
    pub fn from_entry(entry: &RawServiceEntry) -> Result<Self, ServiceConfigError> {
        let name = match entry.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => return Err(ServiceConfigError::MissingName),
        };

        let raw_check = entry.check.as_ref().ok_or_else(|| {
            ServiceConfigError::Invalid(format!("{}: missing check section", name))
        })?;

        let check = match resolve_check_type(&raw_check.kind)? {
            CheckKind::Systemd => CheckSpec::Systemd,
            CheckKind::Http => {
                let url = raw_check
                    .url
                    .clone()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        ServiceConfigError::Invalid(format!("{}: http check requires a url", name))
                    })?;

                let timeout_secs = raw_check.timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
                if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
                    return Err(ServiceConfigError::Invalid(format!(
                        "{}: timeout_seconds must be positive, got {}",
                        name, timeout_secs
                    )));
                }

                CheckSpec::Http(HttpCheckSpec {
                    url,
                    timeout: Duration::from_secs_f64(timeout_secs),
                    expected_status: raw_check.expected_status.unwrap_or(DEFAULT_EXPECTED_STATUS),
                })
            }
        };

        let unit = match entry.unit.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => {
                if check.kind() == CheckKind::Http && entry.restart_on_failure {
                    warn!(
                        service = %name,
                        "No unit configured for http-checked service, restarts will target unit '{}'",
                        name
                    );
                }
                name.clone()
            }
        };

        Ok(Self {
            name,
            check,
            unit,
            restart_on_failure: entry.restart_on_failure,
            max_restarts_per_hour: entry.max_restarts_per_hour,
        })
    }
}

/// Service entry as written in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawServiceEntry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub check: Option<RawCheck>,

    /// Systemd unit to restart; defaults to `name`
    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub restart_on_failure: bool,

    #[serde(default)]
    pub max_restarts_per_hour: u32,
}

/// `check` section of a service entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCheck {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub timeout_seconds: Option<f64>,

    #[serde(default)]
    pub expected_status: Option<u16>,
}
