//! CLI command implementations

pub mod auto;
pub mod diagnose;
pub mod randomize;
pub mod restore;
pub mod scan;

use anyhow::{bail, Result};
use macaron_core::address::check_name;
use macaron_core::{EngineConfig, MacaronEngine, SystemCommandExecutor, SystemExecutorConfig};
use std::sync::Arc;

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub use_sudo: bool,
    pub allow_fallbacks: bool,
    pub timeout_secs: u64,
}

impl GlobalOptions {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().with_command_timeout(self.timeout_secs)
    }

    pub fn executor_config(&self) -> SystemExecutorConfig {
        SystemExecutorConfig::new()
            .with_sudo(self.use_sudo)
            .with_fallbacks(self.allow_fallbacks)
    }

    /// Engine over the real system tools.
    pub fn engine(&self) -> MacaronEngine {
        let executor = SystemCommandExecutor::new(self.executor_config());
        MacaronEngine::new(Arc::new(executor), self.engine_config())
    }
}

/// Resolve the interface list for a bulk command.
///
/// Names are checked before anything touches the host.
pub fn resolve_targets(names: &[String], all: bool) -> Result<Option<Vec<String>>> {
    if all && !names.is_empty() {
        bail!("pass interface names or --all, not both");
    }
    if !all && names.is_empty() {
        bail!("no interfaces given (use --all for every interface)");
    }
    for name in names {
        check_name(name)?;
    }
    Ok(if all { None } else { Some(names.to_vec()) })
}
