#![allow(dead_code)]

use async_trait::async_trait;
use macaron_core::executor::{CommandResult, ExecutorCall};
use macaron_core::{
    CommandExecutor, DiscoveredInterface, EngineConfig, InterfaceKind, MacAddress, MacaronEngine,
    MockCommandExecutor,
};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub const ETH0_ADDRESS: &str = "00:11:22:33:44:55";
pub const WLAN0_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

pub fn mac(text: &str) -> MacAddress {
    text.parse().expect("test address")
}

pub fn eth0() -> DiscoveredInterface {
    DiscoveredInterface::new("eth0", InterfaceKind::Ethernet, Some(mac(ETH0_ADDRESS)))
}

pub fn wlan0() -> DiscoveredInterface {
    DiscoveredInterface::new("wlan0", InterfaceKind::Wifi, Some(mac(WLAN0_ADDRESS)))
}

/// Host with eth0 and wlan0, plus a couple of devices discovery must drop.
pub fn scenario_host() -> MockCommandExecutor {
    MockCommandExecutor::new()
        .with_interface(eth0())
        .with_interface(wlan0())
        .with_interface(DiscoveredInterface::new(
            "lo",
            InterfaceKind::Other,
            Some(mac("00:00:00:00:00:00")),
        ))
        .with_interface(DiscoveredInterface::new(
            "ppp0",
            InterfaceKind::Other,
            None,
        ))
}

/// Engine over `executor`, already refreshed.
pub async fn engine_with<E: CommandExecutor + 'static>(
    executor: Arc<E>,
    config: EngineConfig,
) -> MacaronEngine {
    let engine = MacaronEngine::new(executor, config);
    engine.refresh().await.expect("refresh");
    engine
}

/// Executor that parks every `set_address` until the test opens the gate.
///
/// Lets a test hold an interface mid-sequence deterministically, without
/// relying on sleeps.
pub struct GatedExecutor {
    pub inner: MockCommandExecutor,
    gate: Semaphore,
    reached: Notify,
}

impl GatedExecutor {
    pub fn new(inner: MockCommandExecutor) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            reached: Notify::new(),
        }
    }

    /// Wait until some call is parked at the gate.
    pub async fn wait_until_parked(&self) {
        self.reached.notified().await;
    }

    /// Release `n` parked calls.
    pub fn open(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls_for(&self, name: &str) -> Vec<ExecutorCall> {
        self.inner.calls_for(name)
    }
}

#[async_trait]
impl CommandExecutor for GatedExecutor {
    async fn list_interfaces(&self) -> CommandResult<Vec<DiscoveredInterface>> {
        self.inner.list_interfaces().await
    }

    async fn set_link_state(&self, name: &str, up: bool) -> CommandResult<()> {
        self.inner.set_link_state(name, up).await
    }

    async fn set_address(&self, name: &str, address: &MacAddress) -> CommandResult<()> {
        self.reached.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| macaron_core::CommandError::new(e.to_string()))?;
        permit.forget();
        self.inner.set_address(name, address).await
    }

    async fn power_cycle_bluetooth(&self, name: &str) -> CommandResult<()> {
        self.inner.power_cycle_bluetooth(name).await
    }
}
