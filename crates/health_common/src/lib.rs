//! Health Common - shared types for the service health checker
//!
//! Configuration model, service specs, the restart ledger and the clock
//! used to drive it.

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, LoggingConfig, RejectedService, ServiceSet};
pub use error::{ConfigError, ServiceConfigError};
pub use ledger::{RestartLedger, RESTART_WINDOW_SECS};
pub use service::{resolve_check_type, CheckKind, CheckSpec, HttpCheckSpec, ServiceSpec};
