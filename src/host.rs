//! Resolution of the host-side address that forwarded traffic is sent to

use crate::{Error, Result};
use async_trait::async_trait;
use bollard::{network::InspectNetworkOptions, Docker};
use std::net::IpAddr;

/// Supplies the address the DNAT rules redirect to
///
/// Called once for every rendered script, so implementations may return a
/// different address between attempts.
#[async_trait]
pub trait HostAddressResolver: Send + Sync {
    async fn resolve(&self) -> Result<IpAddr>;
}

/// A fixed, preconfigured address
#[derive(Debug, Clone, Copy)]
pub struct StaticHostAddress(pub IpAddr);

#[async_trait]
impl HostAddressResolver for StaticHostAddress {
    async fn resolve(&self) -> Result<IpAddr> {
        Ok(self.0)
    }
}

/// Looks up the gateway of a Docker bridge network (the docker0 adaptor for `bridge`)
#[derive(Debug, Clone)]
pub struct DockerBridgeResolver {
    docker: Docker,
    network: String,
}

impl DockerBridgeResolver {
    pub fn new(docker: Docker, network: impl Into<String>) -> Self {
        Self {
            docker,
            network: network.into(),
        }
    }
}

#[async_trait]
impl HostAddressResolver for DockerBridgeResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        let network = self
            .docker
            .inspect_network(&self.network, None::<InspectNetworkOptions<String>>)
            .await
            .map_err(|e| {
                Error::HostAddress(format!("Failed to inspect network {}: {}", self.network, e))
            })?;

        let gateway = network
            .ipam
            .and_then(|ipam| ipam.config)
            .unwrap_or_default()
            .into_iter()
            .find_map(|config| config.gateway)
            .ok_or_else(|| {
                Error::HostAddress(format!("Network {} has no gateway configured", self.network))
            })?;

        gateway.parse().map_err(|e| {
            Error::HostAddress(format!(
                "Gateway '{}' of network {} is not an IP address: {}",
                gateway, self.network, e
            ))
        })
    }
}
