//! Randomization Orchestrator
//!
//! The only component that changes real network state. Per interface:
//!
//! ```text
//! Idle ──► Applying ──► Applied | Failed
//! Idle ──► Restoring ─► Restored | Failed
//! ```
//!
//! A transition out of a resting state requires the interface lock, which
//! is taken with [`InterfaceLocks::try_acquire`] and never waited on. The
//! command sequence for an interface runs in its own task holding that
//! lock, so dropping the caller's future cannot leave a link down halfway
//! through a change: the task finishes the sequence, records the outcome
//! and only then releases the name.

use crate::address::{self, MacAddress};
use crate::config::EngineConfig;
use crate::errors::MacaronError;
use crate::executor::{CommandExecutor, CommandResult};
use crate::interface::InterfaceKind;
use crate::lock::{InterfaceGuard, InterfaceLocks};
use crate::registry::{InterfaceRegistry, InterfaceStatus};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Which way an operation moves an interface's address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Apply,
    Restore,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Restore => "restore",
        }
    }

    fn busy_status(&self) -> InterfaceStatus {
        match self {
            Self::Apply => InterfaceStatus::Applying,
            Self::Restore => InterfaceStatus::Restoring,
        }
    }
}

/// Result of one interface's apply or restore within a bulk operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationOutcome {
    pub interface: String,
    pub action: Action,
    /// The address now assigned, or why nothing changed.
    pub result: Result<MacAddress>,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Applies and restores addresses with per-interface exclusion.
#[derive(Clone)]
pub struct RandomizationOrchestrator {
    registry: Arc<InterfaceRegistry>,
    locks: InterfaceLocks,
    config: EngineConfig,
}

impl RandomizationOrchestrator {
    pub fn new(registry: Arc<InterfaceRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            locks: InterfaceLocks::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<InterfaceRegistry> {
        &self.registry
    }

    pub fn locks(&self) -> &InterfaceLocks {
        &self.locks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Assign a fresh random address to `name`.
    ///
    /// Returns the new address, or a validation, state, concurrency or
    /// execution error. Execution errors carry the executor's text unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn apply_one(&self, name: &str) -> Result<MacAddress> {
        self.execute(name, Action::Apply).await
    }

    /// Put `name` back on its original address.
    #[tracing::instrument(skip(self))]
    pub async fn restore_one(&self, name: &str) -> Result<MacAddress> {
        self.execute(name, Action::Restore).await
    }

    /// Apply to each name concurrently; results follow input order.
    pub async fn apply_many<S: AsRef<str>>(&self, names: &[S]) -> Vec<OperationOutcome> {
        self.execute_many(names, Action::Apply).await
    }

    /// Restore each name concurrently; results follow input order.
    pub async fn restore_many<S: AsRef<str>>(&self, names: &[S]) -> Vec<OperationOutcome> {
        self.execute_many(names, Action::Restore).await
    }

    /// Apply to every eligible interface.
    pub async fn randomize_eligible(&self) -> Vec<OperationOutcome> {
        let names = self.registry.all_eligible();
        self.apply_many(&names).await
    }

    /// Apply to every selected interface.
    pub async fn apply_selected(&self) -> Vec<OperationOutcome> {
        let names = self.registry.selected();
        self.apply_many(&names).await
    }

    /// Restore every interface that has a known original address.
    pub async fn restore_all(&self) -> Vec<OperationOutcome> {
        let names = self.registry.restorable();
        self.restore_many(&names).await
    }

    async fn execute_many<S: AsRef<str>>(
        &self,
        names: &[S],
        action: Action,
    ) -> Vec<OperationOutcome> {
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let name = name.as_ref().to_string();
                let this = self.clone();
                let task_name = name.clone();
                let handle = tokio::spawn(async move { this.execute(&task_name, action).await });
                (name, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (interface, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => Err(MacaronError::execution(
                    interface.as_str(),
                    action.as_str(),
                    format!("task failed: {}", err),
                )),
            };
            outcomes.push(OperationOutcome {
                interface,
                action,
                result,
            });
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        tracing::info!(
            action = action.as_str(),
            total = outcomes.len(),
            failed,
            "bulk operation finished"
        );
        outcomes
    }

    async fn execute(&self, name: &str, action: Action) -> Result<MacAddress> {
        // Re-checked here: names may arrive from callers, not only discovery
        address::check_name(name)?;

        let guard = self
            .locks
            .try_acquire(name)
            .ok_or_else(|| MacaronError::OperationInProgress(name.to_string()))?;

        let record = self
            .registry
            .get(name)
            .ok_or_else(|| MacaronError::UnknownInterface(name.to_string()))?;
        if record.status.is_busy() {
            return Err(MacaronError::OperationInProgress(name.to_string()));
        }

        let target = match action {
            Action::Apply => {
                if record.current_address.is_none() {
                    return Err(MacaronError::NoCurrentAddress(name.to_string()));
                }
                let candidate = address::generate();
                address::check(&candidate, false)?;
                candidate
            }
            Action::Restore => {
                let original = record
                    .original_address
                    .ok_or_else(|| MacaronError::NoOriginalAddress(name.to_string()))?;
                address::check(&original, true)?;
                if self.config.skip_restore_when_current
                    && record.current_address == Some(original)
                {
                    tracing::debug!(interface = name, "already on original address");
                    self.registry.record_restored(name, original);
                    return Ok(original);
                }
                original
            }
        };

        let previous = record.status;
        self.registry.begin(name, action.busy_status())?;

        let job = Job {
            name: name.to_string(),
            kind: record.kind,
            action,
            target,
            executor: Arc::clone(self.registry.executor()),
            registry: Arc::clone(&self.registry),
            timeout: self.config.command_timeout(),
            _guard: guard,
        };

        match tokio::spawn(job.run()).await {
            Ok(result) => result,
            Err(err) => {
                // The task panicked before recording anything
                let reason = format!("task failed: {}", err);
                self.registry.record_failed(name, reason.clone());
                tracing::warn!(interface = name, previous = %previous, "{}", reason);
                Err(MacaronError::execution(name, action.as_str(), reason))
            }
        }
    }
}

/// One interface's command sequence. Owns the interface lock until dropped.
struct Job {
    name: String,
    kind: InterfaceKind,
    action: Action,
    target: MacAddress,
    executor: Arc<dyn CommandExecutor>,
    registry: Arc<InterfaceRegistry>,
    timeout: Duration,
    _guard: InterfaceGuard,
}

impl Job {
    async fn run(self) -> Result<MacAddress> {
        let outcome = self.sequence().await;
        match &outcome {
            Ok(()) => {
                match self.action {
                    Action::Apply => self.registry.record_applied(&self.name, self.target),
                    Action::Restore => self.registry.record_restored(&self.name, self.target),
                }
                tracing::info!(
                    interface = %self.name,
                    action = self.action.as_str(),
                    address = %self.target,
                    "address changed"
                );
            }
            Err(err) => {
                self.registry.record_failed(&self.name, err.to_string());
                tracing::warn!(
                    interface = %self.name,
                    action = self.action.as_str(),
                    error = %err,
                    "address change failed"
                );
            }
        }
        outcome.map(|()| self.target)
    }

    async fn sequence(&self) -> Result<()> {
        let executor = &self.executor;
        let name = self.name.as_str();

        if self.kind.needs_link_cycle() {
            // A failed or timed-out down may still have taken effect
            let lowered = self
                .step("link down", executor.set_link_state(name, false))
                .await;
            let written = match lowered {
                Ok(()) => {
                    self.step("set address", executor.set_address(name, &self.target))
                        .await
                }
                Err(err) => Err(err),
            };
            // The link comes back up whatever happened before
            let raised = self
                .step("link up", executor.set_link_state(name, true))
                .await;
            if let (Err(_), Err(raise_err)) = (&written, &raised) {
                tracing::warn!(interface = name, error = %raise_err, "could not bring link back up");
            }
            written.and(raised)
        } else {
            self.step("set address", executor.set_address(name, &self.target))
                .await?;
            self.step("power cycle", executor.power_cycle_bluetooth(name))
                .await
        }
    }

    async fn step<F>(&self, operation: &str, call: F) -> Result<()>
    where
        F: Future<Output = CommandResult<()>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(MacaronError::execution(&self.name, operation, err.0)),
            Err(_) => Err(MacaronError::Timeout {
                interface: self.name.clone(),
                operation: operation.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
