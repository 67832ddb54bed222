//! Restart ledger: sliding one-hour window over restart attempts
//!
//! Pruning happens lazily on every permission check, so the window is exact
//! at decision time no matter how often services are checked.

use std::collections::VecDeque;

/// Length of the restart rate window in seconds
pub const RESTART_WINDOW_SECS: u64 = 3600;

/// Restart attempts for one service, in chronological order
#[derive(Debug, Clone, Default)]
pub struct RestartLedger {
    /// Unix timestamps (seconds) of recorded attempts
    attempts: VecDeque<u64>,
    /// Restarts permitted per trailing window
    max_per_window: u32,
}

impl RestartLedger {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            attempts: VecDeque::new(),
            max_per_window,
        }
    }

    /// Drop attempts that fell out of the window ending at `now`
    pub fn prune(&mut self, now: u64) {
        self.attempts
            .retain(|&t| now.saturating_sub(t) < RESTART_WINDOW_SECS);
    }

    /// Whether another restart is permitted at `now`.
    ///
    /// Exactly `max_per_window` restarts fit in any trailing hour; a budget
    /// of zero always denies.
    pub fn can_restart(&mut self, now: u64) -> bool {
        self.prune(now);
        self.attempts.len() < self.max_per_window as usize
    }

    /// Record an attempt. Called once the actuator has been invoked,
    /// whatever its outcome.
    pub fn record_restart(&mut self, now: u64) {
        self.attempts.push_back(now);
    }

    /// Attempts currently held, including any not yet pruned
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Attempts inside the window ending at `now`
    pub fn recent(&mut self, now: u64) -> usize {
        self.prune(now);
        self.attempts.len()
    }
}
