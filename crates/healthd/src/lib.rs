//! Service health checker engine - exposes modules for testing.

pub mod actuator;
pub mod app;
pub mod cli;
pub mod logging;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod shutdown;
pub mod supervisor;

pub use actuator::{Actuator, RestartOutcome};
pub use orchestrator::{Orchestrator, OrchestratorError, RunMode, ServiceReport, SweepAction};
pub use probe::{HealthStatus, Prober};
pub use supervisor::{FakeServiceManager, ServiceManager, Systemctl};
