//! Engine facade for collaborators (CLI, GUI).
//!
//! Bundles one registry, one orchestrator and one scheduler around a single
//! executor. Independent engines share nothing, so tests can run several
//! side by side.

use crate::address::MacAddress;
use crate::config::EngineConfig;
use crate::executor::CommandExecutor;
use crate::orchestrator::{OperationOutcome, RandomizationOrchestrator};
use crate::registry::{InterfaceRecord, InterfaceRegistry};
use crate::scheduler::{FiringReport, RandomizationScheduler, StartOutcome};
use crate::Result;
use std::sync::Arc;

pub struct MacaronEngine {
    registry: Arc<InterfaceRegistry>,
    orchestrator: RandomizationOrchestrator,
    scheduler: RandomizationScheduler,
}

impl MacaronEngine {
    pub fn new(executor: Arc<dyn CommandExecutor>, config: EngineConfig) -> Self {
        let registry = Arc::new(InterfaceRegistry::new(executor));
        let orchestrator = RandomizationOrchestrator::new(Arc::clone(&registry), config);
        let scheduler = RandomizationScheduler::new(orchestrator.clone());
        Self {
            registry,
            orchestrator,
            scheduler,
        }
    }

    pub fn with_defaults(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(executor, EngineConfig::default())
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    pub fn orchestrator(&self) -> &RandomizationOrchestrator {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &RandomizationScheduler {
        &self.scheduler
    }

    pub async fn refresh(&self) -> Result<Vec<InterfaceRecord>> {
        self.registry.refresh().await
    }

    pub fn interfaces(&self) -> Vec<InterfaceRecord> {
        self.registry.records()
    }

    pub fn interface(&self, name: &str) -> Option<InterfaceRecord> {
        self.registry.get(name)
    }

    pub fn set_selected(&self, name: &str, selected: bool) -> Result<()> {
        self.registry.set_selected(name, selected)
    }

    pub async fn apply_one(&self, name: &str) -> Result<MacAddress> {
        self.orchestrator.apply_one(name).await
    }

    pub async fn apply_many<S: AsRef<str>>(&self, names: &[S]) -> Vec<OperationOutcome> {
        self.orchestrator.apply_many(names).await
    }

    pub async fn apply_selected(&self) -> Vec<OperationOutcome> {
        self.orchestrator.apply_selected().await
    }

    pub async fn randomize_eligible(&self) -> Vec<OperationOutcome> {
        self.orchestrator.randomize_eligible().await
    }

    pub async fn restore_one(&self, name: &str) -> Result<MacAddress> {
        self.orchestrator.restore_one(name).await
    }

    pub async fn restore_many<S: AsRef<str>>(&self, names: &[S]) -> Vec<OperationOutcome> {
        self.orchestrator.restore_many(names).await
    }

    pub async fn restore_all(&self) -> Vec<OperationOutcome> {
        self.orchestrator.restore_all().await
    }

    pub fn start(&self, interval_minutes: u32) -> Result<StartOutcome> {
        self.scheduler.start(interval_minutes)
    }

    pub fn stop(&self) -> bool {
        self.scheduler.stop()
    }

    /// Stop the scheduler and wait for an in-flight firing to finish.
    pub async fn shutdown(&self) -> bool {
        self.scheduler.shutdown().await
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn firing_reports(&self) -> Vec<FiringReport> {
        self.scheduler.reports()
    }
}
