//! Configuration for the system command executor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`SystemCommandExecutor`](super::SystemCommandExecutor).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemExecutorConfig {
    /// Prefix every mutating command with `sudo -n`.
    #[serde(default)]
    pub use_sudo: bool,

    /// Try `ifconfig` / `hciconfig` when the primary tool fails.
    #[serde(default = "default_allow_fallbacks")]
    pub allow_fallbacks: bool,

    /// Root of the per-interface sysfs tree.
    #[serde(default = "default_sysfs_net_root")]
    pub sysfs_net_root: PathBuf,
}

fn default_allow_fallbacks() -> bool {
    true
}

fn default_sysfs_net_root() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

impl Default for SystemExecutorConfig {
    fn default() -> Self {
        Self {
            use_sudo: false,
            allow_fallbacks: default_allow_fallbacks(),
            sysfs_net_root: default_sysfs_net_root(),
        }
    }
}

impl SystemExecutorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run mutating commands through `sudo -n`.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Enable or disable fallback tools.
    pub fn with_fallbacks(mut self, allow: bool) -> Self {
        self.allow_fallbacks = allow;
        self
    }

    /// Point sysfs lookups somewhere else (used by tests).
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_net_root = root.into();
        self
    }
}
