//! In-memory executor for tests and dry runs.
//!
//! Keeps a fake host: a set of interfaces with link state and address.
//! Every call is journaled so tests can assert on ordering, and individual
//! steps can be scripted to fail or to stall.

use super::{CommandError, CommandExecutor, CommandResult, DiscoveredInterface};
use crate::address::MacAddress;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Executor step, used to target scripted failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStep {
    List,
    LinkDown,
    LinkUp,
    SetAddress,
    PowerCycle,
}

/// A journaled executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorCall {
    ListInterfaces,
    SetLinkState { name: String, up: bool },
    SetAddress { name: String, address: MacAddress },
    PowerCycleBluetooth { name: String },
}

impl ExecutorCall {
    pub fn interface(&self) -> Option<&str> {
        match self {
            Self::ListInterfaces => None,
            Self::SetLinkState { name, .. }
            | Self::SetAddress { name, .. }
            | Self::PowerCycleBluetooth { name } => Some(name),
        }
    }
}

#[derive(Debug, Clone)]
struct FakeInterface {
    info: DiscoveredInterface,
    link_up: bool,
}

#[derive(Default)]
struct MockState {
    interfaces: BTreeMap<String, FakeInterface>,
    calls: Vec<ExecutorCall>,
    failures: HashMap<(String, MockStep), String>,
    list_failure: Option<String>,
}

/// Mock command executor.
#[derive(Default)]
pub struct MockCommandExecutor {
    state: Mutex<MockState>,
    delay: Option<Duration>,
}

impl MockCommandExecutor {
    /// Create an executor with no interfaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface to the fake host.
    pub fn with_interface(self, info: DiscoveredInterface) -> Self {
        self.add_interface(info);
        self
    }

    /// Stall every mutating call for `delay` before it takes effect.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script `step` on `name` to fail with `reason`.
    pub fn failing_on(self, name: &str, step: MockStep, reason: &str) -> Self {
        self.fail_on(name, step, reason);
        self
    }

    pub fn add_interface(&self, info: DiscoveredInterface) {
        self.lock().interfaces.insert(
            info.name.clone(),
            FakeInterface {
                info,
                link_up: true,
            },
        );
    }

    pub fn remove_interface(&self, name: &str) {
        self.lock().interfaces.remove(name);
    }

    pub fn fail_on(&self, name: &str, step: MockStep, reason: &str) {
        if step == MockStep::List {
            self.lock().list_failure = Some(reason.to_string());
        } else {
            self.lock()
                .failures
                .insert((name.to_string(), step), reason.to_string());
        }
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failures.clear();
        state.list_failure = None;
    }

    /// Address the fake host currently reports for `name`.
    pub fn address_of(&self, name: &str) -> Option<MacAddress> {
        self.lock()
            .interfaces
            .get(name)
            .and_then(|iface| iface.info.address)
    }

    pub fn is_link_up(&self, name: &str) -> Option<bool> {
        self.lock().interfaces.get(name).map(|iface| iface.link_up)
    }

    /// Snapshot of the call journal.
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.lock().calls.clone()
    }

    /// Journal entries touching `name`, in order.
    pub fn calls_for(&self, name: &str) -> Vec<ExecutorCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.interface() == Some(name))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn scripted_failure(&self, name: &str, step: MockStep) -> CommandResult<()> {
        match self.lock().failures.get(&(name.to_string(), step)) {
            Some(reason) => Err(CommandError::new(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn list_interfaces(&self) -> CommandResult<Vec<DiscoveredInterface>> {
        let mut state = self.lock();
        state.calls.push(ExecutorCall::ListInterfaces);
        if let Some(reason) = &state.list_failure {
            return Err(CommandError::new(reason.clone()));
        }
        Ok(state
            .interfaces
            .values()
            .map(|iface| iface.info.clone())
            .collect())
    }

    async fn set_link_state(&self, name: &str, up: bool) -> CommandResult<()> {
        self.lock().calls.push(ExecutorCall::SetLinkState {
            name: name.to_string(),
            up,
        });
        self.stall().await;
        let step = if up { MockStep::LinkUp } else { MockStep::LinkDown };
        self.scripted_failure(name, step)?;

        let mut state = self.lock();
        let iface = state
            .interfaces
            .get_mut(name)
            .ok_or_else(|| CommandError::new(format!("Cannot find device \"{}\"", name)))?;
        iface.link_up = up;
        Ok(())
    }

    async fn set_address(&self, name: &str, address: &MacAddress) -> CommandResult<()> {
        self.lock().calls.push(ExecutorCall::SetAddress {
            name: name.to_string(),
            address: *address,
        });
        self.stall().await;
        self.scripted_failure(name, MockStep::SetAddress)?;

        let mut state = self.lock();
        let iface = state
            .interfaces
            .get_mut(name)
            .ok_or_else(|| CommandError::new(format!("Cannot find device \"{}\"", name)))?;
        iface.info.address = Some(*address);
        Ok(())
    }

    async fn power_cycle_bluetooth(&self, name: &str) -> CommandResult<()> {
        self.lock().calls.push(ExecutorCall::PowerCycleBluetooth {
            name: name.to_string(),
        });
        self.stall().await;
        self.scripted_failure(name, MockStep::PowerCycle)?;
        if !self.lock().interfaces.contains_key(name) {
            return Err(CommandError::new(format!("Can't get device info: {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceKind;

    fn eth0() -> DiscoveredInterface {
        DiscoveredInterface::new(
            "eth0",
            InterfaceKind::Ethernet,
            Some("00:11:22:33:44:55".parse().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_mock_applies_address() {
        let mock = MockCommandExecutor::new().with_interface(eth0());
        let mac: MacAddress = "02:aa:bb:cc:dd:ee".parse().unwrap();

        mock.set_link_state("eth0", false).await.unwrap();
        assert_eq!(mock.is_link_up("eth0"), Some(false));
        mock.set_address("eth0", &mac).await.unwrap();
        mock.set_link_state("eth0", true).await.unwrap();

        assert_eq!(mock.address_of("eth0"), Some(mac));
        assert_eq!(mock.calls_for("eth0").len(), 3);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let mock = MockCommandExecutor::new()
            .with_interface(eth0())
            .failing_on("eth0", MockStep::SetAddress, "Operation not permitted");
        let mac: MacAddress = "02:aa:bb:cc:dd:ee".parse().unwrap();

        let err = mock.set_address("eth0", &mac).await.unwrap_err();
        assert_eq!(err.to_string(), "Operation not permitted");
        assert_eq!(
            mock.address_of("eth0"),
            Some("00:11:22:33:44:55".parse().unwrap())
        );
    }

    #[test]
    fn test_mock_unknown_device() {
        let mock = MockCommandExecutor::new();
        tokio_test::assert_err!(tokio_test::block_on(mock.set_link_state("eth9", true)));
        tokio_test::assert_err!(tokio_test::block_on(mock.power_cycle_bluetooth("hci9")));
    }

    #[test]
    fn test_mock_removed_interface() {
        let mock = MockCommandExecutor::new().with_interface(eth0());
        mock.remove_interface("eth0");
        let listed = tokio_test::assert_ok!(tokio_test::block_on(mock.list_interfaces()));
        assert!(listed.is_empty());
        assert_eq!(mock.address_of("eth0"), None);
    }

    #[tokio::test]
    async fn test_mock_list_failure() {
        let mock = MockCommandExecutor::new()
            .with_interface(eth0())
            .failing_on("", MockStep::List, "ip: command not found");
        assert!(mock.list_interfaces().await.is_err());
        mock.clear_failures();
        assert_eq!(mock.list_interfaces().await.unwrap().len(), 1);
    }
}
