//! Linux executor built on `ip`, `ifconfig`, `hciconfig` and `bdaddr`.
//!
//! Arguments are passed to the child as separate argv entries; no shell is
//! involved. Children are spawned with `kill_on_drop`, so when the
//! orchestrator's timeout drops a call the process does not linger.

use super::{
    CommandError, CommandExecutor, CommandResult, DiscoveredInterface, SystemExecutorConfig,
};
use crate::address::MacAddress;
use crate::interface::{is_virtual_interface, InterfaceKind};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Executor that shells out to the standard Linux networking tools.
pub struct SystemCommandExecutor {
    config: SystemExecutorConfig,
}

impl SystemCommandExecutor {
    pub fn new(config: SystemExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SystemExecutorConfig {
        &self.config
    }

    async fn run(&self, program: &str, args: &[&str], privileged: bool) -> CommandResult<String> {
        let mut command = if privileged && self.config.use_sudo {
            let mut c = Command::new("sudo");
            c.arg("-n").arg(program);
            c
        } else {
            Command::new(program)
        };
        command.args(args).kill_on_drop(true);

        tracing::debug!(program, ?args, "running command");
        let output = command
            .output()
            .await
            .map_err(|e| CommandError::new(format!("{}: {}", program, e)))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(CommandError::new(format!(
                "{} exited with {}",
                program, output.status
            )))
        } else {
            Err(CommandError::new(stderr))
        }
    }

    /// Run `primary`; on failure, run `fallback` if fallbacks are enabled.
    /// The primary error is reported when both fail.
    async fn run_with_fallback(
        &self,
        primary: (&str, &[&str]),
        fallback: (&str, &[&str]),
    ) -> CommandResult<()> {
        match self.run(primary.0, primary.1, true).await {
            Ok(_) => Ok(()),
            Err(err) if self.config.allow_fallbacks => {
                tracing::debug!(
                    primary = primary.0,
                    fallback = fallback.0,
                    error = %err,
                    "primary tool failed, trying fallback"
                );
                self.run(fallback.0, fallback.1, true)
                    .await
                    .map(|_| ())
                    .map_err(|fallback_err| {
                        CommandError::new(format!("{} (fallback: {})", err, fallback_err))
                    })
            }
            Err(err) => Err(err),
        }
    }

    async fn network_interfaces(&self) -> CommandResult<Vec<DiscoveredInterface>> {
        let parsed = match self.run("ip", &["-o", "link", "show"], false).await {
            Ok(stdout) => parse_ip_link(&stdout),
            Err(err) if self.config.allow_fallbacks => {
                tracing::debug!(error = %err, "ip unavailable, reading sysfs");
                read_sysfs_interfaces(&self.config.sysfs_net_root).await?
            }
            Err(err) => return Err(err),
        };

        let mut interfaces = Vec::with_capacity(parsed.len());
        for mut iface in parsed {
            if is_virtual_interface(&iface.name) {
                continue;
            }
            if is_wireless(&self.config.sysfs_net_root, &iface.name).await {
                iface.kind = InterfaceKind::Wifi;
            }
            interfaces.push(iface);
        }
        Ok(interfaces)
    }

    async fn bluetooth_interfaces(&self) -> Vec<DiscoveredInterface> {
        match self.run("hciconfig", &["-a"], false).await {
            Ok(stdout) => parse_hciconfig(&stdout),
            Err(err) => {
                tracing::debug!(error = %err, "no bluetooth controllers listed");
                Vec::new()
            }
        }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new(SystemExecutorConfig::default())
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn list_interfaces(&self) -> CommandResult<Vec<DiscoveredInterface>> {
        let mut interfaces = self.network_interfaces().await?;
        interfaces.extend(self.bluetooth_interfaces().await);
        Ok(interfaces)
    }

    async fn set_link_state(&self, name: &str, up: bool) -> CommandResult<()> {
        let state = if up { "up" } else { "down" };
        self.run_with_fallback(
            ("ip", &["link", "set", "dev", name, state]),
            ("ifconfig", &[name, state]),
        )
        .await
    }

    async fn set_address(&self, name: &str, address: &MacAddress) -> CommandResult<()> {
        let addr = address.to_string();
        let addr = addr.as_str();
        // Controllers are only ever discovered through hciconfig, which names
        // them hci<N>, so the name alone selects the bluetooth tools
        if InterfaceKind::from_name(name) == InterfaceKind::Bluetooth {
            self.run_with_fallback(
                ("bdaddr", &["-i", name, addr]),
                ("hciconfig", &[name, "address", addr]),
            )
            .await
        } else {
            self.run_with_fallback(
                ("ip", &["link", "set", "dev", name, "address", addr]),
                ("ifconfig", &[name, "hw", "ether", addr]),
            )
            .await
        }
    }

    async fn power_cycle_bluetooth(&self, name: &str) -> CommandResult<()> {
        let reset = async {
            self.run("hciconfig", &[name, "reset"], true).await?;
            self.run("hciconfig", &[name, "up"], true).await
        };
        match reset.await {
            Ok(_) => Ok(()),
            Err(err) if self.config.allow_fallbacks => {
                tracing::debug!(interface = name, error = %err, "hciconfig reset failed, restarting service");
                self.run("systemctl", &["restart", "bluetooth"], true)
                    .await
                    .map(|_| ())
                    .map_err(|fallback_err| {
                        CommandError::new(format!("{} (fallback: {})", err, fallback_err))
                    })
            }
            Err(err) => Err(err),
        }
    }
}

async fn is_wireless(sysfs_root: &Path, name: &str) -> bool {
    let dir = sysfs_root.join(name);
    tokio::fs::metadata(dir.join("wireless")).await.is_ok()
        || tokio::fs::metadata(dir.join("phy80211")).await.is_ok()
}

/// Parse `ip -o link show`. Interfaces without a `link/ether` address are
/// skipped.
pub(crate) fn parse_ip_link(output: &str) -> Vec<DiscoveredInterface> {
    output.lines().filter_map(parse_ip_link_line).collect()
}

fn parse_ip_link_line(line: &str) -> Option<DiscoveredInterface> {
    let mut fields = line.splitn(3, ": ");
    let _index = fields.next()?;
    let raw_name = fields.next()?.trim();
    let rest = fields.next()?;

    // "eth0.10@enp3s0" is a VLAN or macvlan stacked on a parent; its address
    // follows the parent, so only the parent is managed
    if raw_name.contains('@') {
        return None;
    }
    let name = raw_name;

    let mut tokens = rest.split_whitespace();
    let mut address = None;
    let mut permanent = None;
    let mut is_ether = false;
    while let Some(token) = tokens.next() {
        match token {
            "link/ether" => {
                is_ether = true;
                address = tokens.next().and_then(|t| t.parse::<MacAddress>().ok());
            }
            "permaddr" => {
                permanent = tokens.next().and_then(|t| t.parse::<MacAddress>().ok());
            }
            _ => {}
        }
    }
    if !is_ether {
        return None;
    }

    Some(DiscoveredInterface {
        name: name.to_string(),
        kind: InterfaceKind::from_name(name),
        address,
        permanent_address: permanent,
    })
}

/// Parse `hciconfig -a`, one block per controller.
pub(crate) fn parse_hciconfig(output: &str) -> Vec<DiscoveredInterface> {
    let mut controllers = Vec::new();
    for line in output.lines() {
        if !line.starts_with(char::is_whitespace) && !line.is_empty() {
            if let Some((name, _)) = line.split_once(':') {
                controllers.push(DiscoveredInterface::new(
                    name.trim(),
                    InterfaceKind::Bluetooth,
                    None,
                ));
            }
        } else if let Some((_, tail)) = line.split_once("BD Address:") {
            if let Some(current) = controllers.last_mut() {
                current.address = tail
                    .split_whitespace()
                    .next()
                    .and_then(|t| t.parse().ok());
            }
        }
    }
    controllers
}

async fn read_sysfs_interfaces(root: &Path) -> CommandResult<Vec<DiscoveredInterface>> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut interfaces = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let address = match tokio::fs::read_to_string(entry.path().join("address")).await {
            Ok(text) => text.trim().parse::<MacAddress>().ok(),
            Err(_) => None,
        };
        // Interfaces without a 6-octet address (tunnels, infiniband) are skipped
        if let Some(address) = address {
            interfaces.push(DiscoveredInterface::new(
                name.clone(),
                InterfaceKind::from_name(&name),
                Some(address),
            ));
        }
    }
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_LINK: &str = "\
1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN mode DEFAULT group default qlen 1000\\    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00
2: enp3s0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc fq_codel state UP mode DEFAULT group default qlen 1000\\    link/ether 02:11:22:33:44:55 brd ff:ff:ff:ff:ff:ff permaddr 00:11:22:33:44:55
3: wlan0: <BROADCAST,MULTICAST> mtu 1500 qdisc noop state DOWN mode DORMANT group default qlen 1000\\    link/ether AA:BB:CC:DD:EE:FF brd ff:ff:ff:ff:ff:ff
4: eth0.10@enp3s0: <BROADCAST,MULTICAST> mtu 1500 qdisc noop state DOWN mode DEFAULT group default qlen 1000\\    link/ether 02:11:22:33:44:55 brd ff:ff:ff:ff:ff:ff
5: tun0: <POINTOPOINT,MULTICAST,NOARP,UP,LOWER_UP> mtu 1500 qdisc fq_codel state UNKNOWN mode DEFAULT group default qlen 500\\    link/none
";

    const HCICONFIG: &str = "\
hci0:\tType: Primary  Bus: USB
\tBD Address: 00:1A:7D:DA:71:13  ACL MTU: 310:10  SCO MTU: 64:8
\tUP RUNNING
\tRX bytes:1234 acl:0 sco:0 events:56 errors:0

hci1:\tType: Primary  Bus: UART
\tBD Address: 00:00:00:00:00:00  ACL MTU: 0:0  SCO MTU: 0:0
\tDOWN
";

    #[test]
    fn test_parse_ip_link() {
        let parsed = parse_ip_link(IP_LINK);
        let names: Vec<_> = parsed.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["enp3s0", "wlan0"]);

        let enp = &parsed[0];
        assert_eq!(enp.kind, InterfaceKind::Ethernet);
        assert_eq!(enp.address, Some("02:11:22:33:44:55".parse().unwrap()));
        assert_eq!(
            enp.permanent_address,
            Some("00:11:22:33:44:55".parse().unwrap())
        );

        let wlan = &parsed[1];
        assert_eq!(wlan.kind, InterfaceKind::Wifi);
        assert_eq!(wlan.address, Some("aa:bb:cc:dd:ee:ff".parse().unwrap()));
        assert_eq!(wlan.permanent_address, None);
    }

    #[test]
    fn test_parse_ip_link_skips_stacked_links() {
        let parsed = parse_ip_link(IP_LINK);
        assert!(parsed.iter().all(|i| !i.name.contains('.')));
        assert!(parse_ip_link(
            "7: mv0@enp3s0: <BROADCAST> mtu 1500\\    link/ether 02:00:00:00:00:07 brd ff:ff:ff:ff:ff:ff\n"
        )
        .is_empty());
    }

    #[test]
    fn test_discovered_kind_matches_address_routing() {
        // set_address picks its tools from the name; discovery must agree
        let network = parse_ip_link(IP_LINK);
        let bluetooth = parse_hciconfig(HCICONFIG);
        for iface in network.iter().chain(bluetooth.iter()) {
            assert_eq!(
                InterfaceKind::from_name(&iface.name) == InterfaceKind::Bluetooth,
                iface.kind == InterfaceKind::Bluetooth,
                "{}",
                iface.name
            );
        }
        assert!(bluetooth.iter().all(|i| i.kind == InterfaceKind::Bluetooth));
    }

    #[test]
    fn test_parse_ip_link_ignores_garbage() {
        assert!(parse_ip_link("").is_empty());
        assert!(parse_ip_link("not a link line\n").is_empty());
    }

    #[test]
    fn test_parse_hciconfig() {
        let parsed = parse_hciconfig(HCICONFIG);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "hci0");
        assert_eq!(parsed[0].kind, InterfaceKind::Bluetooth);
        assert_eq!(
            parsed[0].address,
            Some("00:1a:7d:da:71:13".parse().unwrap())
        );
        assert_eq!(parsed[1].name, "hci1");
    }

    #[tokio::test]
    async fn test_read_sysfs_interfaces() {
        let dir = tempfile::tempdir().unwrap();
        for (name, address) in [
            ("eth0", "00:11:22:33:44:55\n"),
            ("wlan0", "aa:bb:cc:dd:ee:ff\n"),
            ("ib0", "80:00:02:08:fe:80:00:00:00:00:00:00\n"),
        ] {
            let iface = dir.path().join(name);
            std::fs::create_dir(&iface).unwrap();
            std::fs::write(iface.join("address"), address).unwrap();
        }
        std::fs::create_dir(dir.path().join("wlan0").join("wireless")).unwrap();

        let parsed = read_sysfs_interfaces(dir.path()).await.unwrap();
        let names: Vec<_> = parsed.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "wlan0"]);
        assert!(is_wireless(dir.path(), "wlan0").await);
        assert!(!is_wireless(dir.path(), "eth0").await);
    }
}
