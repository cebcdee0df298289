use crate::{ports::PortMapping, retry::RetryPolicy, Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Settings for a NAT configuration pass
#[derive(Debug, Clone)]
pub struct NatConfig {
    /// Ports to forward, in rule order
    pub ports: Vec<PortMapping>,
    /// Polling schedule applied to each container
    pub policy: RetryPolicy,
    /// Run iptables through sudo
    pub use_sudo: bool,
    /// Fixed host address; if None the Docker bridge gateway is looked up
    pub host_address: Option<IpAddr>,
    /// Docker network whose gateway is the forwarding target
    pub bridge_network: String,
}

impl Default for NatConfig {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            policy: RetryPolicy::default(),
            use_sudo: true,
            host_address: None,
            bridge_network: "bridge".to_string(),
        }
    }
}

impl NatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from defaults overridden by `NAT_FORWARD_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(ports) = lookup("NAT_FORWARD_PORTS") {
            config.ports = PortMapping::parse_list(&ports)
                .map_err(|e| Error::Config(format!("NAT_FORWARD_PORTS: {}", e)))?;
        }

        if let Some(addr) = lookup("NAT_FORWARD_HOST_ADDRESS") {
            let addr = addr.trim().parse().map_err(|_| {
                Error::Config(format!("NAT_FORWARD_HOST_ADDRESS '{}' is not an IP address", addr))
            })?;
            config.host_address = Some(addr);
        }

        if let Some(ms) = lookup("NAT_FORWARD_POLL_INTERVAL_MS") {
            config.policy.poll_interval = Duration::from_millis(parse_number(
                "NAT_FORWARD_POLL_INTERVAL_MS",
                &ms,
            )?);
        }

        if let Some(secs) = lookup("NAT_FORWARD_TIMEOUT_SECS") {
            config.policy.timeout =
                Duration::from_secs(parse_number("NAT_FORWARD_TIMEOUT_SECS", &secs)?);
        }

        if lookup("NAT_FORWARD_NO_SUDO").is_some() {
            config.use_sudo = false;
        }

        if let Some(network) = lookup("NAT_FORWARD_BRIDGE_NETWORK") {
            config.bridge_network = network;
        }

        Ok(config)
    }

    /// Set the ports to forward
    pub fn ports(mut self, ports: impl IntoIterator<Item = PortMapping>) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    /// Set the delay between attempts
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.policy.poll_interval = interval;
        self
    }

    /// Set how long a single container may take to accept the rules
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    pub fn sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Forward to a fixed address instead of the bridge gateway
    pub fn host_address(mut self, addr: IpAddr) -> Self {
        self.host_address = Some(addr);
        self
    }

    pub fn bridge_network(mut self, network: impl Into<String>) -> Self {
        self.bridge_network = network.into();
        self
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse() {
        Ok(0) => Err(Error::Config(format!("{} must be greater than zero", key))),
        Ok(n) => Ok(n),
        Err(_) => Err(Error::Config(format!("{} '{}' is not a number", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NatConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.ports.is_empty());
        assert_eq!(config.policy, RetryPolicy::default());
        assert_eq!(config.policy.poll_interval, Duration::from_secs(1));
        assert_eq!(config.policy.timeout, Duration::from_secs(30));
        assert!(config.use_sudo);
        assert_eq!(config.host_address, None);
        assert_eq!(config.bridge_network, "bridge");
    }

    #[test]
    fn test_env_overrides() {
        let config = NatConfig::from_lookup(lookup(&[
            ("NAT_FORWARD_PORTS", "9200:9300,9201:9301"),
            ("NAT_FORWARD_HOST_ADDRESS", "172.17.0.1"),
            ("NAT_FORWARD_POLL_INTERVAL_MS", "250"),
            ("NAT_FORWARD_TIMEOUT_SECS", "5"),
            ("NAT_FORWARD_NO_SUDO", "1"),
            ("NAT_FORWARD_BRIDGE_NETWORK", "test-net"),
        ]))
        .unwrap();

        assert_eq!(config.ports.len(), 2);
        assert_eq!(config.ports[1].client(), 9201);
        assert_eq!(config.host_address, Some("172.17.0.1".parse().unwrap()));
        assert_eq!(config.policy.poll_interval, Duration::from_millis(250));
        assert_eq!(config.policy.timeout, Duration::from_secs(5));
        assert!(!config.use_sudo);
        assert_eq!(config.bridge_network, "test-net");
    }

    #[test]
    fn test_malformed_env() {
        for vars in [
            [("NAT_FORWARD_PORTS", "9200")],
            [("NAT_FORWARD_HOST_ADDRESS", "docker0")],
            [("NAT_FORWARD_TIMEOUT_SECS", "soon")],
            [("NAT_FORWARD_TIMEOUT_SECS", "0")],
            [("NAT_FORWARD_POLL_INTERVAL_MS", "0")],
        ] {
            assert!(matches!(
                NatConfig::from_lookup(lookup(&vars)),
                Err(Error::Config(_))
            ));
        }
    }

    #[test]
    fn test_builder() {
        let config = NatConfig::new()
            .ports([PortMapping::new(9200, 9300).unwrap()])
            .poll_interval(Duration::from_millis(100))
            .timeout(Duration::from_secs(2))
            .sudo(false)
            .bridge_network("custom");

        assert_eq!(config.ports.len(), 1);
        assert_eq!(
            config.policy,
            RetryPolicy::new(Duration::from_millis(100), Duration::from_secs(2))
        );
        assert!(!config.use_sudo);
        assert_eq!(config.bridge_network, "custom");
    }
}
