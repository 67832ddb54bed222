//! Liveness probes
//!
//! A probe never fails: supervisor errors, transport errors, timeouts and
//! status mismatches all come back as `HealthStatus::Unhealthy`, with the
//! cause in the log.

use crate::supervisor::ServiceManager;
use health_common::{CheckSpec, HttpCheckSpec, ServiceSpec};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Label used in the status table
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "UP",
            HealthStatus::Unhealthy => "DOWN",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

/// Build the HTTP client shared by all endpoint checks.
/// Per-check timeouts are applied on each request.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("service-health-checker/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Runs checks for any service variant
#[derive(Clone)]
pub struct Prober {
    manager: Arc<dyn ServiceManager>,
    http: reqwest::Client,
}

impl Prober {
    pub fn new(manager: Arc<dyn ServiceManager>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }

    /// Check one service
    pub async fn check(&self, spec: &ServiceSpec) -> HealthStatus {
        match &spec.check {
            CheckSpec::Systemd => check_systemd(self.manager.as_ref(), spec).await,
            CheckSpec::Http(http) => check_http(&self.http, &spec.name, http).await,
        }
    }
}

/// Healthy iff `systemctl is-active` exits zero
pub async fn check_systemd(manager: &dyn ServiceManager, spec: &ServiceSpec) -> HealthStatus {
    match manager.is_active(&spec.unit).await {
        Ok(status) if status.success() => {
            debug!(service = %spec.name, unit = %spec.unit, "Unit is {}", status.output);
            HealthStatus::Healthy
        }
        Ok(status) => {
            warn!(
                service = %spec.name,
                unit = %spec.unit,
                code = ?status.code,
                "Systemd unit not active: {}",
                status.output
            );
            HealthStatus::Unhealthy
        }
        Err(e) => {
            error!(service = %spec.name, "Error checking systemd service {}: {}", spec.unit, e);
            HealthStatus::Unhealthy
        }
    }
}

/// Healthy iff the endpoint answers with the expected status within the timeout.
/// Error statuses are compared too, so an expected 503 counts as healthy.
pub async fn check_http(
    client: &reqwest::Client,
    name: &str,
    http: &HttpCheckSpec,
) -> HealthStatus {
    let response = client.get(&http.url).timeout(http.timeout).send().await;

    match response {
        Ok(resp) => {
            let observed = resp.status().as_u16();
            if observed == http.expected_status {
                debug!(service = %name, status = observed, "HTTP check passed for {}", http.url);
                HealthStatus::Healthy
            } else {
                warn!(
                    service = %name,
                    status = observed,
                    expected = http.expected_status,
                    "HTTP check failed for {}: {}",
                    name,
                    observed
                );
                HealthStatus::Unhealthy
            }
        }
        Err(e) => {
            if e.is_timeout() {
                error!(
                    service = %name,
                    "HTTP check for {} timed out after {:?}",
                    name,
                    http.timeout
                );
            } else {
                error!(service = %name, "HTTP connection error for {}: {}", name, e);
            }
            HealthStatus::Unhealthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::FakeServiceManager;

    fn prober(fake: FakeServiceManager) -> Prober {
        Prober::new(Arc::new(fake), http_client().unwrap())
    }

    #[tokio::test]
    async fn test_systemd_check_success() {
        let p = prober(FakeServiceManager::new().with_status("ssh", 0));
        assert_eq!(p.check(&ServiceSpec::systemd("ssh")).await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_systemd_check_failure() {
        let p = prober(FakeServiceManager::new().with_status("ssh", 3));
        assert_eq!(p.check(&ServiceSpec::systemd("ssh")).await, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_systemd_query_failure_is_unhealthy() {
        let p = prober(FakeServiceManager::new().with_unreachable("ssh"));
        assert_eq!(p.check(&ServiceSpec::systemd("ssh")).await, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_systemd_check_uses_unit() {
        let fake = Arc::new(FakeServiceManager::new().with_status("sshd.service", 0));
        let p = Prober::new(fake.clone(), http_client().unwrap());
        let spec = ServiceSpec::systemd("ssh").with_unit("sshd.service");
        assert!(p.check(&spec).await.is_healthy());
    }

    #[tokio::test]
    async fn test_invalid_url_is_unhealthy() {
        let p = prober(FakeServiceManager::new());
        let spec = ServiceSpec::http("web", "not a url");
        assert_eq!(p.check(&spec).await, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_labels() {
        assert_eq!(HealthStatus::Healthy.label(), "UP");
        assert_eq!(HealthStatus::Unhealthy.label(), "DOWN");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "UNHEALTHY");
    }
}
