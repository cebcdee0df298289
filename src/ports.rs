use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pair of service ports that must be reachable from outside the container
///
/// Both ports are forwarded to the same port number on the host address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPortMapping")]
pub struct PortMapping {
    client: u16,
    transport: u16,
}

#[derive(Deserialize)]
struct RawPortMapping {
    client: u16,
    transport: u16,
}

impl TryFrom<RawPortMapping> for PortMapping {
    type Error = Error;

    fn try_from(raw: RawPortMapping) -> Result<Self> {
        Self::new(raw.client, raw.transport)
    }
}

impl PortMapping {
    /// Create a mapping, rejecting port 0
    pub fn new(client: u16, transport: u16) -> Result<Self> {
        for port in [client, transport] {
            if port == 0 {
                return Err(Error::InvalidPort(port));
            }
        }
        Ok(Self { client, transport })
    }

    /// Port used by clients (e.g. HTTP)
    pub fn client(&self) -> u16 {
        self.client
    }

    /// Port used for node-to-node transport
    pub fn transport(&self) -> u16 {
        self.transport
    }

    /// Both ports in rule order
    pub fn ports(&self) -> [u16; 2] {
        [self.client, self.transport]
    }

    /// Parse a comma separated list such as `9200:9300,9201:9301`
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for PortMapping {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (client, transport) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidPortMapping(s.to_string()))?;
        let parse = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|_| Error::InvalidPortMapping(s.to_string()))
        };
        Self::new(parse(client)?, parse(transport)?)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client, self.transport)
    }
}

/// A running container that needs forwarding rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetContainer {
    /// Container id or name understood by the exec client
    pub container_id: String,
    /// Externally visible address, only used for logging
    pub address: String,
}

impl TargetContainer {
    pub fn new(container_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            address: address.into(),
        }
    }
}

/// Everything produced by a single exec of the NAT script
#[derive(Debug, Clone)]
pub struct ConfigurationAttempt {
    /// The rendered script passed to `sh -c`
    pub command: String,
    /// Exec id returned by the exec client
    pub exec_id: String,
    /// Combined stdout/stderr; `None` if the output could not be read
    pub output: Option<String>,
}
