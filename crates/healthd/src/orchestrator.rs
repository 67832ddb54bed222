//! Decision loop: probe → rate limiter → actuator
//!
//! Services are processed one at a time in configured order. Each service
//! owns its restart ledger, so nothing is shared between services.

use crate::actuator::{Actuator, RestartOutcome};
use crate::probe::{HealthStatus, Prober};
use crate::supervisor::ServiceManager;
use health_common::{CheckKind, Clock, RestartLedger, ServiceSpec, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Service {0} not found in config.")]
    ServiceNotFound(String),
}

/// What the engine did about one service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    /// Service is healthy, nothing to do
    None,
    /// Unhealthy, but the service did not opt into restarts
    NotRemediated,
    /// Unhealthy, restart denied by the hourly budget
    BudgetExhausted,
    /// Restart logged but not issued
    DryRun,
    /// Restart issued
    Restarted(RestartOutcome),
}

/// Per-service result of a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub name: String,
    pub kind: CheckKind,
    pub status: HealthStatus,
    pub action: SweepAction,
}

/// How long the interval loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One sweep, then return
    Once,
    /// Sweep every interval until shutdown is requested
    Forever,
}

/// A service together with its restart history
#[derive(Debug, Clone)]
pub struct ServiceRuntime {
    pub spec: ServiceSpec,
    pub ledger: RestartLedger,
}

impl ServiceRuntime {
    pub fn new(spec: ServiceSpec) -> Self {
        let ledger = RestartLedger::new(spec.max_restarts_per_hour);
        Self { spec, ledger }
    }
}

pub struct Orchestrator {
    services: Vec<ServiceRuntime>,
    prober: Prober,
    actuator: Actuator,
    clock: Arc<dyn Clock>,
    dry_run: bool,
}

impl Orchestrator {
    pub fn new(
        specs: Vec<ServiceSpec>,
        manager: Arc<dyn ServiceManager>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            services: specs.into_iter().map(ServiceRuntime::new).collect(),
            prober: Prober::new(manager.clone(), http),
            actuator: Actuator::new(manager),
            clock: Arc::new(SystemClock),
            dry_run: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn services(&self) -> &[ServiceRuntime] {
        &self.services
    }

    pub fn find(&self, name: &str) -> Option<&ServiceRuntime> {
        self.services.iter().find(|s| s.spec.name == name)
    }

    /// Restart attempts recorded for a service inside the current window
    pub fn recent_restarts(&mut self, name: &str) -> Option<usize> {
        let now = self.clock.now();
        self.services
            .iter_mut()
            .find(|s| s.spec.name == name)
            .map(|s| s.ledger.recent(now))
    }

    /// Check one service and remediate if it is unhealthy and eligible
    pub async fn process(&mut self, index: usize) -> Option<ServiceReport> {
        let runtime = self.services.get_mut(index)?;
        let spec = &runtime.spec;

        let status = self.prober.check(spec).await;
        let action = if status.is_healthy() {
            debug!(service = %spec.name, "Service {} is HEALTHY", spec.name);
            SweepAction::None
        } else {
            warn!(service = %spec.name, "Service {} is UNHEALTHY", spec.name);

            if !spec.restart_on_failure {
                SweepAction::NotRemediated
            } else if !runtime.ledger.can_restart(self.clock.now()) {
                error!(
                    service = %spec.name,
                    max_per_hour = spec.max_restarts_per_hour,
                    "Max restarts reached for {}, budget exhausted. Skipping restart.",
                    spec.name
                );
                SweepAction::BudgetExhausted
            } else if self.dry_run {
                info!(service = %spec.name, "[DRY-RUN] Would restart {}", spec.name);
                SweepAction::DryRun
            } else {
                let outcome = self.actuator.restart(spec).await;
                runtime.ledger.record_restart(self.clock.now());
                SweepAction::Restarted(outcome)
            }
        };

        Some(ServiceReport {
            name: spec.name.clone(),
            kind: spec.kind(),
            status,
            action,
        })
    }

    /// One pass over every service in configured order
    pub async fn sweep(&mut self) -> Vec<ServiceReport> {
        let mut reports = Vec::with_capacity(self.services.len());
        for index in 0..self.services.len() {
            if let Some(report) = self.process(index).await {
                reports.push(report);
            }
        }
        reports
    }

    /// Check every service without remediating
    pub async fn status(&self) -> Vec<ServiceReport> {
        let mut reports = Vec::with_capacity(self.services.len());
        for runtime in &self.services {
            let status = self.prober.check(&runtime.spec).await;
            reports.push(ServiceReport {
                name: runtime.spec.name.clone(),
                kind: runtime.spec.kind(),
                status,
                action: SweepAction::None,
            });
        }
        reports
    }

    /// Operator-requested restart. Skips the probe and the rate budget and
    /// leaves the ledger untouched.
    pub async fn manual_restart(&self, name: &str) -> Result<SweepAction, OrchestratorError> {
        let runtime = self.find(name).ok_or_else(|| {
            let err = OrchestratorError::ServiceNotFound(name.to_string());
            error!(service = %name, "{}", err);
            err
        })?;

        if self.dry_run {
            info!(service = %name, "[DRY-RUN] Would restart {}", name);
            return Ok(SweepAction::DryRun);
        }

        Ok(SweepAction::Restarted(self.actuator.restart(&runtime.spec).await))
    }

    /// Sweep on an interval until `shutdown` is cancelled.
    ///
    /// Shutdown is observed before each sweep and before each sleep, never
    /// mid-sweep; the sleep itself ends as soon as shutdown is requested.
    /// `RunMode::Once` sweeps exactly once whatever the token says.
    /// Returns the number of sweeps performed.
    pub async fn run(
        &mut self,
        mode: RunMode,
        interval: Duration,
        shutdown: &CancellationToken,
    ) -> usize {
        info!(
            services = self.services.len(),
            interval_secs = interval.as_secs(),
            dry_run = self.dry_run,
            "Starting Service Health Checker"
        );

        let mut sweeps = 0;
        loop {
            if mode == RunMode::Forever && shutdown.is_cancelled() {
                break;
            }

            self.sweep().await;
            sweeps += 1;

            if mode == RunMode::Once || shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!(sweeps, "Service Health Checker stopped");
        sweeps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::http_client;
    use crate::supervisor::FakeServiceManager;
    use health_common::ManualClock;

    fn orchestrator(
        specs: Vec<ServiceSpec>,
        fake: Arc<FakeServiceManager>,
        clock: &ManualClock,
    ) -> Orchestrator {
        Orchestrator::new(specs, fake, http_client().unwrap()).with_clock(Arc::new(clock.clone()))
    }

    fn auto_restart(name: &str, max: u32) -> Vec<ServiceSpec> {
        vec![ServiceSpec::systemd(name).with_auto_restart(max)]
    }

    #[tokio::test]
    async fn test_healthy_service_no_action() {
        let fake = Arc::new(FakeServiceManager::new().with_status("ssh", 0));
        let clock = ManualClock::new(1000);
        let mut orch = orchestrator(auto_restart("ssh", 3), fake.clone(), &clock);

        let reports = orch.sweep().await;
        assert_eq!(reports[0].status, HealthStatus::Healthy);
        assert_eq!(reports[0].action, SweepAction::None);
        assert!(fake.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_unhealthy_without_opt_in_is_not_restarted() {
        let fake = Arc::new(FakeServiceManager::new().with_status("ssh", 3));
        let clock = ManualClock::new(1000);
        let mut orch = orchestrator(vec![ServiceSpec::systemd("ssh")], fake.clone(), &clock);

        let reports = orch.sweep().await;
        assert_eq!(reports[0].action, SweepAction::NotRemediated);
        assert!(fake.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_budget_exhausts_then_recovers() {
        let fake = Arc::new(FakeServiceManager::new().with_status("ssh", 3));
        let clock = ManualClock::new(1000);
        let mut orch = orchestrator(auto_restart("ssh", 2), fake.clone(), &clock);

        let first = orch.sweep().await;
        let second = orch.sweep().await;
        let third = orch.sweep().await;
        assert_eq!(first[0].action, SweepAction::Restarted(RestartOutcome::Succeeded));
        assert_eq!(second[0].action, SweepAction::Restarted(RestartOutcome::Succeeded));
        assert_eq!(third[0].action, SweepAction::BudgetExhausted);
        assert_eq!(fake.restarts().len(), 2);

        clock.set(4599);
        assert_eq!(orch.sweep().await[0].action, SweepAction::BudgetExhausted);

        // Exactly one hour later both attempts have left the window
        clock.set(4600);
        assert_eq!(
            orch.sweep().await[0].action,
            SweepAction::Restarted(RestartOutcome::Succeeded)
        );
        assert_eq!(fake.restarts().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_budget_never_restarts() {
        let fake = Arc::new(FakeServiceManager::new());
        let clock = ManualClock::new(1000);
        let mut orch = orchestrator(auto_restart("ssh", 0), fake.clone(), &clock);

        assert_eq!(orch.sweep().await[0].action, SweepAction::BudgetExhausted);
        assert!(fake.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_failed_restart_consumes_budget() {
        let fake = Arc::new(FakeServiceManager::new().with_restart_code("ssh", 1));
        let clock = ManualClock::new(1000);
        let mut orch = orchestrator(auto_restart("ssh", 1), fake.clone(), &clock);

        assert_eq!(
            orch.sweep().await[0].action,
            SweepAction::Restarted(RestartOutcome::Failed)
        );
        assert_eq!(orch.recent_restarts("ssh"), Some(1));
        assert_eq!(orch.sweep().await[0].action, SweepAction::BudgetExhausted);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_ledger_untouched() {
        let fake = Arc::new(FakeServiceManager::new());
        let clock = ManualClock::new(1000);
        let mut orch =
            orchestrator(auto_restart("ssh", 1), fake.clone(), &clock).with_dry_run(true);

        for _ in 0..3 {
            assert_eq!(orch.sweep().await[0].action, SweepAction::DryRun);
        }
        assert!(fake.restarts().is_empty());
        assert_eq!(orch.recent_restarts("ssh"), Some(0));
    }

    #[tokio::test]
    async fn test_sweep_keeps_configured_order() {
        let fake = Arc::new(
            FakeServiceManager::new()
                .with_status("b", 0)
                .with_status("a", 0),
        );
        let clock = ManualClock::new(0);
        let mut orch = orchestrator(
            vec![ServiceSpec::systemd("b"), ServiceSpec::systemd("a")],
            fake.clone(),
            &clock,
        );
        let names: Vec<_> = orch.sweep().await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_manual_restart_not_found() {
        let fake = Arc::new(FakeServiceManager::new());
        let clock = ManualClock::new(0);
        let orch = orchestrator(vec![ServiceSpec::systemd("ssh")], fake.clone(), &clock);

        assert_eq!(
            orch.manual_restart("nginx").await,
            Err(OrchestratorError::ServiceNotFound("nginx".to_string()))
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_manual_restart_ignores_budget() {
        let fake = Arc::new(FakeServiceManager::new());
        let clock = ManualClock::new(0);
        let orch = orchestrator(auto_restart("ssh", 0), fake.clone(), &clock);

        assert_eq!(
            orch.manual_restart("ssh").await,
            Ok(SweepAction::Restarted(RestartOutcome::Succeeded))
        );
        assert_eq!(fake.restarts(), vec!["ssh".to_string()]);
    }

    #[tokio::test]
    async fn test_status_never_restarts() {
        let fake = Arc::new(FakeServiceManager::new().with_status("web", 0));
        let clock = ManualClock::new(0);
        let orch = orchestrator(
            vec![
                ServiceSpec::systemd("ssh").with_auto_restart(5),
                ServiceSpec::systemd("web"),
            ],
            fake.clone(),
            &clock,
        );

        let reports = orch.status().await;
        assert_eq!(reports[0].status, HealthStatus::Unhealthy);
        assert_eq!(reports[1].status, HealthStatus::Healthy);
        assert!(fake.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_run_once_ignores_cancellation() {
        let fake = Arc::new(FakeServiceManager::new());
        let clock = ManualClock::new(0);
        let mut orch = orchestrator(vec![ServiceSpec::systemd("ssh")], fake.clone(), &clock);

        let token = CancellationToken::new();
        token.cancel();
        let sweeps = orch.run(RunMode::Once, Duration::from_secs(3600), &token).await;
        assert_eq!(sweeps, 1);
    }

    #[tokio::test]
    async fn test_run_forever_stops_before_sweep_when_cancelled() {
        let fake = Arc::new(FakeServiceManager::new());
        let clock = ManualClock::new(0);
        let mut orch = orchestrator(vec![ServiceSpec::systemd("ssh")], fake.clone(), &clock);

        let token = CancellationToken::new();
        token.cancel();
        let sweeps = orch.run(RunMode::Forever, Duration::from_secs(3600), &token).await;
        assert_eq!(sweeps, 0);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forever_sweeps_each_interval() {
        let fake = Arc::new(FakeServiceManager::new().with_status("ssh", 0));
        let clock = ManualClock::new(0);
        let mut orch = orchestrator(vec![ServiceSpec::systemd("ssh")], fake.clone(), &clock);

        let token = CancellationToken::new();
        let stopper = token.clone();
        tokio::spawn(async move {
            // Lands between the third and fourth sweep
            tokio::time::sleep(Duration::from_secs(65)).await;
            stopper.cancel();
        });

        let started = tokio::time::Instant::now();
        let sweeps = orch.run(RunMode::Forever, Duration::from_secs(30), &token).await;
        assert_eq!(sweeps, 3);
        assert_eq!(fake.calls().len(), 3);

        // The third sleep was cut short at 65s instead of running to 90s
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(65), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(66), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_long_sleep() {
        let fake = Arc::new(FakeServiceManager::new().with_status("ssh", 0));
        let clock = ManualClock::new(0);
        let mut orch = orchestrator(vec![ServiceSpec::systemd("ssh")], fake.clone(), &clock);

        let token = CancellationToken::new();
        let stopper = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        let started = tokio::time::Instant::now();
        let sweeps = orch.run(RunMode::Forever, Duration::from_secs(3600), &token).await;
        assert_eq!(sweeps, 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
