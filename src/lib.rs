//! NAT forwarding for containerised test clusters
//!
//! This crate installs iptables DNAT rules inside already-running containers so
//! that service ports are forwarded to an address on the Docker host. Rules are
//! applied through the container exec API and retried until the script reports
//! completion or a deadline passes.

mod command;
mod config;
mod configurator;
pub mod exec;
mod host;
mod ports;
mod retry;

pub use command::{
    render_nat_script, NatScript, SentinelDetector, SuccessDetector, SENTINEL_TOKEN,
};
pub use config::NatConfig;
pub use configurator::NatConfigurator;
pub use exec::{execute, DockerExecClient, ExecClient, OutputStream};
pub use host::{DockerBridgeResolver, HostAddressResolver, StaticHostAddress};
pub use ports::{ConfigurationAttempt, PortMapping, TargetContainer};
pub use retry::{poll_until, PollOutcome, PollState, RetryPolicy};

use std::time::Duration;

/// Result type used throughout this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring NAT in a container
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid port mapping '{0}', expected <client>:<transport>")]
    InvalidPortMapping(String),

    #[error("Failed to create exec in container {container}: {source}")]
    ExecCreate {
        container: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "NAT rules for container {container} ({address}) not confirmed after {attempts} attempt(s) in {elapsed:?}"
    )]
    Timeout {
        container: String,
        address: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("Could not resolve host address: {0}")]
    HostAddress(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}
