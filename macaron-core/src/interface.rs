//! Interface kinds and the virtual-device filter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name prefixes of devices that have no hardware address worth randomizing.
pub const VIRTUAL_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vboxnet", "tun", "tap", "dummy", "sit",
    "gre", "teql", "ppp", "slip",
];

/// Kind of a network interface.
///
/// Selects the command sequence the orchestrator issues: wired and wireless
/// links are taken down around the address write, bluetooth controllers are
/// power-cycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Ethernet,
    Wifi,
    Bluetooth,
    #[default]
    Other,
}

impl InterfaceKind {
    /// Guess the kind from conventional Linux naming.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("wl") {
            Self::Wifi
        } else if lower.starts_with("eth") || lower.starts_with("en") {
            Self::Ethernet
        } else if lower.starts_with("hci") {
            Self::Bluetooth
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethernet => "ethernet",
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::Other => "other",
        }
    }

    /// Whether the link must be administratively down during the address write.
    pub fn needs_link_cycle(&self) -> bool {
        !matches!(self, Self::Bluetooth)
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for loopback, bridge, tunnel and other software-only devices.
pub fn is_virtual_interface(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VIRTUAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}
