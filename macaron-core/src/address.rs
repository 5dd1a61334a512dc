//! Hardware address generation and validation.
//!
//! Everything here is pure: no registry, no executor, no clock. The
//! orchestrator calls these at the point of use, so a name or address that
//! slipped in through a manual-override path is still rejected before any
//! command is issued.

use crate::errors::MacaronError;
use crate::Result;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Bit 0 of the first octet.
pub const MULTICAST_BIT: u8 = 0x01;
/// Bit 1 of the first octet.
pub const LOCALLY_ADMINISTERED_BIT: u8 = 0x02;
/// Linux IFNAMSIZ minus the terminating NUL.
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// A 6-octet hardware address.
///
/// Parses from and displays as colon-separated hex (`aa:bb:cc:dd:ee:ff`).
/// Parsing is case-insensitive; display is always lowercase.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Wrap raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// True if the multicast (group) bit is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & MULTICAST_BIT != 0
    }

    /// True if the locally-administered bit is set.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & LOCALLY_ADMINISTERED_BIT != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl FromStr for MacAddress {
    type Err = MacaronError;

    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| MacaronError::invalid_address(s, "expected 6 octets"))?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(MacaronError::invalid_address(
                    s,
                    format!("octet {:?} is not two hex digits", part),
                ));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|e| MacaronError::invalid_address(s, e.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(MacaronError::invalid_address(s, "expected 6 octets"));
        }
        Ok(Self(octets))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Generate a random unicast, locally-administered address from the OS CSPRNG.
pub fn generate() -> MacAddress {
    let mut octets = [0u8; 6];
    OsRng.fill_bytes(&mut octets);
    octets[0] = (octets[0] & !MULTICAST_BIT) | LOCALLY_ADMINISTERED_BIT;
    MacAddress(octets)
}

/// Check an address, returning the first rule it breaks.
///
/// With `allow_global` the locally-administered check is skipped; use that
/// mode for manufacturer addresses being restored.
pub fn check(addr: &MacAddress, allow_global: bool) -> Result<()> {
    if addr.is_multicast() {
        return Err(MacaronError::invalid_address(
            addr.to_string(),
            "multicast bit is set",
        ));
    }
    if !allow_global && !addr.is_locally_administered() {
        return Err(MacaronError::invalid_address(
            addr.to_string(),
            "locally-administered bit is not set",
        ));
    }
    Ok(())
}

/// Boolean form of [`check`].
pub fn validate(addr: &MacAddress, allow_global: bool) -> bool {
    check(addr, allow_global).is_ok()
}

/// Parse and validate address text in one step.
pub fn validate_str(text: &str, allow_global: bool) -> bool {
    text.parse::<MacAddress>()
        .map(|addr| validate(&addr, allow_global))
        .unwrap_or(false)
}

/// Check an interface name, returning the first rule it breaks.
///
/// Allowed: ASCII letters, digits, `-`, `_`, `.`; 1 to 15 bytes. Rejected on
/// top of that: `.`, `..`, any `..` sequence, and a leading `-` (which an
/// external tool would parse as an option).
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MacaronError::invalid_name(name, "empty"));
    }
    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(MacaronError::invalid_name(
            name,
            format!("longer than {} bytes", MAX_INTERFACE_NAME_LEN),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(MacaronError::invalid_name(
            name,
            format!("character {:?} not allowed", bad),
        ));
    }
    if name == "." || name.contains("..") {
        return Err(MacaronError::invalid_name(name, "path traversal sequence"));
    }
    if name.starts_with('-') {
        return Err(MacaronError::invalid_name(name, "leading '-'"));
    }
    Ok(())
}

/// Boolean form of [`check_name`].
pub fn validate_name(name: &str) -> bool {
    check_name(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_address_bits() {
        for _ in 0..256 {
            let mac = generate();
            assert!(!mac.is_multicast());
            assert!(mac.is_locally_administered());
            assert!(validate(&mac, false));
        }
    }

    #[test]
    fn test_generated_addresses_are_distinct() {
        let macs: HashSet<_> = (0..100).map(|_| generate()).collect();
        assert_eq!(macs.len(), 100);
    }

    #[test]
    fn test_manufacturer_address() {
        let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        assert!(validate(&mac, true));
        assert!(!validate(&mac, false));
    }

    #[test]
    fn test_multicast_rejected_in_both_modes() {
        for text in ["01:00:00:00:00:00", "03:00:00:00:00:00"] {
            assert!(!validate_str(text, false));
            assert!(!validate_str(text, true));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let upper: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let lower: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:ff:00",
            "aa-bb-cc-dd-ee-ff",
            "aa:bb:cc:dd:ee:f",
            "aa:bb:cc:dd:ee:fg",
            "aaa:bb:cc:dd:ee:f",
            "+a:bb:cc:dd:ee:ff",
        ] {
            assert!(text.parse::<MacAddress>().is_err(), "{text:?} parsed");
        }
    }

    #[test]
    fn test_valid_names() {
        for name in ["eth0", "wlan0", "enp3s0", "hci0", "wlp2s0.1", "br_lan", "a-b"] {
            assert!(validate_name(name), "{name} rejected");
        }
    }

    #[test]
    fn test_injection_names_rejected() {
        for name in [
            "eth0; rm -rf /",
            "eth0 && reboot",
            "eth0|cat",
            "$(whoami)",
            "`id`",
            "eth0>out",
            "../etc",
            "..",
            ".",
            "-v",
            "eth 0",
            "",
            "aaaaaaaaaaaaaaaaaaaa",
        ] {
            assert!(!validate_name(name), "{name:?} accepted");
        }
    }

    #[test]
    fn test_name_length_boundary() {
        assert!(validate_name(&"a".repeat(15)));
        assert!(!validate_name(&"a".repeat(16)));
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = "02:00:5e:10:00:01".parse().unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"02:00:5e:10:00:01\"");
        let back: MacAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }
}
