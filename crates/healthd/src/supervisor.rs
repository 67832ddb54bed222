//! Process supervisor abstraction
//!
//! Every interaction with systemd goes through `ServiceManager`:
//! - `Systemctl` shells out to `systemctl` with a bounded runtime
//! - `FakeServiceManager` answers from a table and records every call,
//!   so the engine can be tested without touching real units

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Upper bound on a single supervisor command
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// `systemctl is-active` exit code for an inactive unit
pub const EXIT_INACTIVE: i32 = 3;

/// Failure to get an answer from the supervisor at all
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// Result of a supervisor command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Trimmed stdout, or stderr when stdout was empty
    pub output: String,
}

impl CommandStatus {
    pub fn exited(code: i32, output: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Control surface of the process supervisor
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Query whether `unit` is active
    async fn is_active(&self, unit: &str) -> Result<CommandStatus, SupervisorError>;

    /// Restart `unit`
    async fn restart(&self, unit: &str) -> Result<CommandStatus, SupervisorError>;
}

// ============================================================================
// systemctl
// ============================================================================

/// Real supervisor backed by the `systemctl` binary
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: String,
    timeout: Duration,
}

impl Systemctl {
    pub fn new() -> Self {
        Self {
            program: "systemctl".to_string(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Use a different binary with the same argument conventions
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<CommandStatus, SupervisorError> {
        debug!("Executing: {} {}", self.program, args.join(" "));

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| SupervisorError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| SupervisorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let text = if stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        } else {
            stdout
        };

        Ok(CommandStatus {
            code: output.status.code(),
            output: text,
        })
    }
}

impl Default for Systemctl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceManager for Systemctl {
    async fn is_active(&self, unit: &str) -> Result<CommandStatus, SupervisorError> {
        self.run(&["is-active", unit]).await
    }

    async fn restart(&self, unit: &str) -> Result<CommandStatus, SupervisorError> {
        self.run(&["restart", unit]).await
    }
}

// ============================================================================
// Fake supervisor (testing)
// ============================================================================

/// Call observed by `FakeServiceManager`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCall {
    IsActive(String),
    Restart(String),
}

/// Table-driven supervisor. Units without a configured status report
/// inactive; restarts succeed unless configured otherwise.
#[derive(Debug, Default)]
pub struct FakeServiceManager {
    statuses: Mutex<HashMap<String, i32>>,
    unreachable: Mutex<Vec<String>>,
    restart_codes: Mutex<HashMap<String, i32>>,
    calls: Mutex<Vec<ManagerCall>>,
}

impl FakeServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `is-active` exit code for a unit
    pub fn with_status(self, unit: &str, code: i32) -> Self {
        self.set_status(unit, code);
        self
    }

    /// Make every command for this unit fail to run
    pub fn with_unreachable(self, unit: &str) -> Self {
        lock(&self.unreachable).push(unit.to_string());
        self
    }

    /// Set the `restart` exit code for a unit
    pub fn with_restart_code(self, unit: &str, code: i32) -> Self {
        lock(&self.restart_codes).insert(unit.to_string(), code);
        self
    }

    pub fn set_status(&self, unit: &str, code: i32) {
        lock(&self.statuses).insert(unit.to_string(), code);
    }

    pub fn calls(&self) -> Vec<ManagerCall> {
        lock(&self.calls).clone()
    }

    /// Units restarted so far, in order
    pub fn restarts(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                ManagerCall::Restart(unit) => Some(unit.clone()),
                ManagerCall::IsActive(_) => None,
            })
            .collect()
    }

    fn check_reachable(&self, unit: &str) -> Result<(), SupervisorError> {
        if lock(&self.unreachable).iter().any(|u| u == unit) {
            return Err(SupervisorError::Spawn {
                program: "systemctl".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake: unreachable"),
            });
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ServiceManager for FakeServiceManager {
    async fn is_active(&self, unit: &str) -> Result<CommandStatus, SupervisorError> {
        lock(&self.calls).push(ManagerCall::IsActive(unit.to_string()));
        self.check_reachable(unit)?;

        let code = lock(&self.statuses).get(unit).copied().unwrap_or(EXIT_INACTIVE);
        let state = if code == 0 { "active" } else { "inactive" };
        Ok(CommandStatus::exited(code, state))
    }

    async fn restart(&self, unit: &str) -> Result<CommandStatus, SupervisorError> {
        lock(&self.calls).push(ManagerCall::Restart(unit.to_string()));
        self.check_reachable(unit)?;

        let code = lock(&self.restart_codes).get(unit).copied().unwrap_or(0);
        let output = if code == 0 {
            String::new()
        } else {
            format!("Job for {} failed.", unit)
        };
        Ok(CommandStatus::exited(code, output))
    }
}
