//! Restart actuator
//!
//! Both check variants restart the service's systemd unit. Failures are
//! logged and returned as `RestartOutcome::Failed`, never raised.

use crate::supervisor::ServiceManager;
use health_common::{CheckSpec, ServiceSpec};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    Succeeded,
    Failed,
}

impl fmt::Display for RestartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartOutcome::Succeeded => write!(f, "succeeded"),
            RestartOutcome::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Clone)]
pub struct Actuator {
    manager: Arc<dyn ServiceManager>,
}

impl Actuator {
    pub fn new(manager: Arc<dyn ServiceManager>) -> Self {
        Self { manager }
    }

    /// Issue one restart for the service's unit
    pub async fn restart(&self, spec: &ServiceSpec) -> RestartOutcome {
        match &spec.check {
            CheckSpec::Systemd => {
                info!(service = %spec.name, "Restarting systemd service: {}", spec.unit);
            }
            CheckSpec::Http(_) => {
                info!(
                    service = %spec.name,
                    "Restarting associated systemd unit for HTTP check: {}",
                    spec.unit
                );
            }
        }

        match self.manager.restart(&spec.unit).await {
            Ok(status) if status.success() => {
                info!(service = %spec.name, "Restarted {}", spec.unit);
                RestartOutcome::Succeeded
            }
            Ok(status) => {
                error!(
                    service = %spec.name,
                    code = ?status.code,
                    "Failed to restart service {}: {}",
                    spec.unit,
                    status.output
                );
                RestartOutcome::Failed
            }
            Err(e) => {
                error!(service = %spec.name, "Failed to restart service {}: {}", spec.unit, e);
                RestartOutcome::Failed
            }
        }
    }
}
