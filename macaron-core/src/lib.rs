//! MACARON core
//!
//! Randomizes the hardware addresses of network interfaces for privacy.
//! The crate discovers interfaces, generates unicast locally-administered
//! addresses, applies them through an injected [`CommandExecutor`], keeps
//! the original addresses for restoration, and can repeat the whole thing
//! on a timer.
//!
//! # Example
//!
//! ```rust,no_run
//! use macaron_core::{MacaronEngine, SystemCommandExecutor};
//! use std::sync::Arc;
//!
//! # async fn run() -> macaron_core::Result<()> {
//! let engine = MacaronEngine::with_defaults(Arc::new(SystemCommandExecutor::default()));
//! engine.refresh().await?;
//! let new_address = engine.apply_one("wlan0").await?;
//! println!("wlan0 is now {}", new_address);
//! engine.restore_one("wlan0").await?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod interface;
pub mod lock;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;

pub use address::{generate, validate, validate_name, MacAddress};
pub use config::EngineConfig;
pub use diagnostics::{diagnose, DiagnosticReport, Readiness};
pub use engine::MacaronEngine;
pub use errors::{ErrorKind, MacaronError};
pub use executor::{
    CommandError, CommandExecutor, DiscoveredInterface, MockCommandExecutor,
    SystemCommandExecutor, SystemExecutorConfig,
};
pub use interface::{is_virtual_interface, InterfaceKind};
pub use orchestrator::{Action, OperationOutcome, RandomizationOrchestrator};
pub use registry::{InterfaceRecord, InterfaceRegistry, InterfaceStatus};
pub use scheduler::{FiringReport, RandomizationScheduler, StartOutcome};

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, MacaronError>;
