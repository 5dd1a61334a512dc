//! Error types for MACARON operations.
//!
//! Every failure the engine can report maps onto one of five categories
//! through [`MacaronError::kind`], so callers can explain a rejected name
//! differently from a command that failed or an interface that is busy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error categories exposed to collaborators (CLI, GUI, logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid name or address, rejected before any external call.
    Validation,
    /// The command executor reported a failure or timed out.
    Execution,
    /// A precondition on the interface record is missing.
    State,
    /// Another operation is already in flight for the interface.
    Concurrency,
    /// Invalid engine or scheduler configuration.
    Configuration,
}

impl ErrorKind {
    /// Short lowercase label used in log fields and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Execution => "execution",
            Self::State => "state",
            Self::Concurrency => "concurrency",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comprehensive error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacaronError {
    /// Interface name failed the character-set or length check.
    #[error("invalid interface name {name:?}: {reason}")]
    InvalidInterfaceName {
        /// Offending name, as supplied
        name: String,
        /// Which rule it broke
        reason: String,
    },

    /// Address is malformed or has the wrong administration bits.
    #[error("invalid address {address}: {reason}")]
    InvalidAddress {
        /// Address text, as supplied
        address: String,
        /// Which rule it broke
        reason: String,
    },

    /// No record exists for the interface.
    #[error("unknown interface: {0}")]
    UnknownInterface(String),

    /// Restore requested for an interface whose original address was never captured.
    #[error("no original address recorded for {0}")]
    NoOriginalAddress(String),

    /// The interface has no known current address.
    #[error("no current address known for {0}")]
    NoCurrentAddress(String),

    /// Another apply or restore holds the interface lock.
    #[error("operation already in progress on {0}")]
    OperationInProgress(String),

    /// The executor rejected one step of the command sequence.
    #[error("{operation} failed on {interface}: {reason}")]
    Execution {
        /// Interface being changed
        interface: String,
        /// Step that failed (e.g. "set address")
        operation: String,
        /// Executor's error text, preserved verbatim
        reason: String,
    },

    /// A command did not finish within the configured timeout.
    #[error("{operation} on {interface} timed out after {timeout_ms}ms")]
    Timeout {
        /// Interface being changed
        interface: String,
        /// Step that timed out
        operation: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Scheduler interval outside 1..=1440 minutes.
    #[error("interval must be between 1 and 1440 minutes, got {0}")]
    InvalidInterval(u32),

    /// The scheduler was started outside a tokio runtime.
    #[error("scheduler requires a running tokio runtime")]
    NoRuntime,
}

impl MacaronError {
    /// Get the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInterfaceName { .. } | Self::InvalidAddress { .. } => {
                ErrorKind::Validation
            }
            Self::Execution { .. } | Self::Timeout { .. } => ErrorKind::Execution,
            Self::UnknownInterface(_)
            | Self::NoOriginalAddress(_)
            | Self::NoCurrentAddress(_) => ErrorKind::State,
            Self::OperationInProgress(_) => ErrorKind::Concurrency,
            Self::InvalidInterval(_) | Self::NoRuntime => ErrorKind::Configuration,
        }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInterfaceName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an execution error.
    pub fn execution(
        interface: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Execution {
            interface: interface.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}
