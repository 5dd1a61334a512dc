//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the orchestrator and scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on each individual executor call, in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Number of scheduler firing reports kept in memory.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Restoring an interface already at its original address succeeds
    /// without issuing any command.
    #[serde(default = "default_skip_restore")]
    pub skip_restore_when_current: bool,
}

fn default_command_timeout() -> u64 {
    30
}

fn default_history_limit() -> usize {
    32
}

fn default_skip_restore() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            history_limit: default_history_limit(),
            skip_restore_when_current: default_skip_restore(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_skip_restore_when_current(mut self, skip: bool) -> Self {
        self.skip_restore_when_current = skip;
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
