//! Host readiness checks.
//!
//! Reports which of the external tools used by
//! [`SystemCommandExecutor`](crate::executor::SystemCommandExecutor) are on
//! `PATH` and whether the process has the privileges to change addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Overall readiness, worst check wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Everything needed is present.
    Ready,
    /// Usable, but some optional capability is missing.
    Degraded,
    /// Addresses cannot be changed on this host as configured.
    Unavailable,
}

impl Readiness {
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

/// What a tool is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolRole {
    /// Network address changes (either tool suffices).
    Network,
    /// Bluetooth address changes (optional).
    Bluetooth,
}

/// Tools probed, with their role.
pub const TOOLS: &[(&str, ToolRole)] = &[
    ("ip", ToolRole::Network),
    ("ifconfig", ToolRole::Network),
    ("hciconfig", ToolRole::Bluetooth),
    ("bdaddr", ToolRole::Bluetooth),
    ("systemctl", ToolRole::Bluetooth),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCheck {
    pub tool: String,
    pub role: ToolRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ToolCheck {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub checked_at: DateTime<Utc>,
    pub tools: Vec<ToolCheck>,
    /// Effective uid is 0.
    pub privileged: bool,
}

impl DiagnosticReport {
    pub fn readiness(&self) -> Readiness {
        let has = |role: ToolRole| self.tools.iter().any(|t| t.role == role && t.is_available());
        if !has(ToolRole::Network) {
            return Readiness::Unavailable;
        }
        if !self.privileged || !has(ToolRole::Bluetooth) {
            return Readiness::Degraded;
        }
        Readiness::Ready
    }

    pub fn missing(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|t| !t.is_available())
            .map(|t| t.tool.as_str())
            .collect()
    }
}

/// Probe the current `PATH`.
pub fn diagnose() -> DiagnosticReport {
    let path = std::env::var_os("PATH").unwrap_or_default();
    diagnose_with_path(&path, is_privileged())
}

/// Probe an explicit search path.
pub fn diagnose_with_path(path_var: &OsStr, privileged: bool) -> DiagnosticReport {
    let tools = TOOLS
        .iter()
        .map(|(tool, role)| ToolCheck {
            tool: tool.to_string(),
            role: *role,
            path: find_in_path(tool, path_var),
        })
        .collect();
    let report = DiagnosticReport {
        checked_at: Utc::now(),
        tools,
        privileged,
    };
    tracing::debug!(readiness = ?report.readiness(), missing = ?report.missing(), "diagnostics complete");
    report
}

/// First executable named `tool` in `path_var`.
pub fn find_in_path(tool: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
pub fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    false
}
