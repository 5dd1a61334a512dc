//! Command Executor boundary
//!
//! The engine never touches the operating system itself. Every effect goes
//! through a [`CommandExecutor`], which receives already-validated names and
//! addresses as typed arguments and never has to interpolate a shell string.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │               RandomizationOrchestrator                  │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                 CommandExecutor                    │  │
//! │  │  - list_interfaces                                 │  │
//! │  │  - set_link_state / set_address                    │  │
//! │  │  - power_cycle_bluetooth                           │  │
//! │  │                                                    │  │
//! │  │  Implementations:                                  │  │
//! │  │  - SystemCommandExecutor (ip, hciconfig, bdaddr)   │  │
//! │  │  - MockCommandExecutor (testing)                   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod mock;
pub mod system;

pub use config::SystemExecutorConfig;
pub use mock::{ExecutorCall, MockCommandExecutor};
pub use system::SystemCommandExecutor;

use crate::address::MacAddress;
use crate::interface::InterfaceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque executor failure. The text is surfaced to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CommandError(pub String);

impl CommandError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// One physical interface as reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredInterface {
    pub name: String,
    pub kind: InterfaceKind,
    /// Address currently assigned, if it could be read.
    pub address: Option<MacAddress>,
    /// Burned-in address, when the platform exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_address: Option<MacAddress>,
}

impl DiscoveredInterface {
    pub fn new(name: impl Into<String>, kind: InterfaceKind, address: Option<MacAddress>) -> Self {
        Self {
            name: name.into(),
            kind,
            address,
            permanent_address: None,
        }
    }

    pub fn with_permanent_address(mut self, address: MacAddress) -> Self {
        self.permanent_address = Some(address);
        self
    }
}

/// Performs interface discovery and mutation against the host.
///
/// Implementations must exclude virtual, loopback and tunnel devices from
/// [`list_interfaces`](Self::list_interfaces). Calls may block for as long
/// as the underlying tool takes; the orchestrator bounds each call with its
/// own timeout and drops the future when it expires.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Enumerate physical interfaces and their current addresses.
    async fn list_interfaces(&self) -> CommandResult<Vec<DiscoveredInterface>>;

    /// Bring the link administratively up or down.
    async fn set_link_state(&self, name: &str, up: bool) -> CommandResult<()>;

    /// Write a new hardware address.
    async fn set_address(&self, name: &str, address: &MacAddress) -> CommandResult<()>;

    /// Power-cycle a bluetooth controller so a written address takes effect.
    async fn power_cycle_bluetooth(&self, name: &str) -> CommandResult<()>;
}
