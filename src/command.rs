//! Rendering of the NAT shell script and detection of its completion marker

use crate::ports::PortMapping;
use std::net::IpAddr;

/// Echoed by the script once every rule has been installed
pub const SENTINEL_TOKEN: &str = "iptables_finished_flag";

/// Builder for the shell script that installs the forwarding rules
///
/// ```
/// use container_nat_forward::{NatScript, PortMapping};
///
/// let script = NatScript::new("172.17.0.1".parse().unwrap())
///     .sudo(false)
///     .render(&[PortMapping::new(9200, 9300).unwrap()]);
/// assert!(script.ends_with("echo iptables_finished_flag"));
/// ```
#[derive(Debug, Clone)]
pub struct NatScript {
    host: IpAddr,
    sudo: bool,
}

impl NatScript {
    pub fn new(host: IpAddr) -> Self {
        Self { host, sudo: true }
    }

    /// Prefix iptables invocations with `sudo` (on by default)
    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    fn iptables(&self) -> &'static str {
        if self.sudo {
            "sudo iptables"
        } else {
            "iptables"
        }
    }

    /// Render the `&&`-chained script for the given mappings, in order
    pub fn render(&self, mappings: &[PortMapping]) -> String {
        let iptables = self.iptables();
        let mut statements = vec!["echo 1 > /proc/sys/net/ipv4/ip_forward".to_string()];

        for port in mappings.iter().flat_map(PortMapping::ports) {
            statements.push(format!(
                "{} -t nat -A PREROUTING -p tcp --dport {} -j DNAT --to-destination {}:{}",
                iptables,
                port,
                self.host,
                port
            ));
        }

        statements.push(format!("{} -t nat -A POSTROUTING -j MASQUERADE", iptables));
        statements.push(format!("echo {}", SENTINEL_TOKEN));
        statements.join(" && ")
    }
}

/// Render the script with default options
pub fn render_nat_script(mappings: &[PortMapping], host: IpAddr) -> String {
    NatScript::new(host).render(mappings)
}

/// Decides whether captured exec output means the script ran to completion
pub trait SuccessDetector: Send + Sync {
    fn indicates_success(&self, output: &str) -> bool;
}

/// Looks for a marker string anywhere in the output
#[derive(Debug, Clone)]
pub struct SentinelDetector {
    token: String,
}

impl SentinelDetector {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Default for SentinelDetector {
    fn default() -> Self {
        Self::new(SENTINEL_TOKEN)
    }
}

impl SuccessDetector for SentinelDetector {
    fn indicates_success(&self, output: &str) -> bool {
        output.contains(&self.token)
    }
}
