use crate::{
    command::{NatScript, SentinelDetector, SuccessDetector},
    config::NatConfig,
    exec::{self, DockerExecClient, ExecClient},
    host::{DockerBridgeResolver, HostAddressResolver, StaticHostAddress},
    ports::{ConfigurationAttempt, TargetContainer},
    retry::{poll_until, PollOutcome},
    Result,
};
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;

/// Installs the forwarding rules in a set of containers
///
/// Each container is polled independently; the only state shared between
/// them is the read-only configuration and the exec client.
pub struct NatConfigurator {
    client: Arc<dyn ExecClient>,
    resolver: Arc<dyn HostAddressResolver>,
    detector: Arc<dyn SuccessDetector>,
    config: NatConfig,
}

impl NatConfigurator {
    pub fn new(
        client: Arc<dyn ExecClient>,
        resolver: Arc<dyn HostAddressResolver>,
        config: NatConfig,
    ) -> Self {
        Self {
            client,
            resolver,
            detector: Arc::new(SentinelDetector::default()),
            config,
        }
    }

    /// Connect to the local Docker daemon
    ///
    /// Rules forward to `config.host_address` if set, otherwise to the gateway
    /// of `config.bridge_network`.
    pub async fn docker(config: NatConfig) -> Result<Self> {
        let client = DockerExecClient::connect().await?;
        let resolver: Arc<dyn HostAddressResolver> = match config.host_address {
            Some(addr) => Arc::new(StaticHostAddress(addr)),
            None => Arc::new(DockerBridgeResolver::new(
                client.docker().clone(),
                config.bridge_network.clone(),
            )),
        };
        Ok(Self::new(Arc::new(client), resolver, config))
    }

    /// Replace the sentinel check with another success detector
    pub fn with_detector(mut self, detector: Arc<dyn SuccessDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &NatConfig {
        &self.config
    }

    /// Configure every target in order, stopping at the first failure
    pub async fn apply(&self, targets: &[TargetContainer]) -> Result<()> {
        for target in targets {
            self.configure_target(target).await?;
        }
        Ok(())
    }

    /// Configure up to `max_parallel` targets at a time; any failure fails the pass
    pub async fn apply_concurrently(
        &self,
        targets: &[TargetContainer],
        max_parallel: usize,
    ) -> Result<()> {
        stream::iter(targets)
            .map(|target| self.configure_target(target))
            .buffer_unordered(max_parallel.max(1))
            .try_for_each(|_| async { Ok(()) })
            .await
    }

    /// Poll a single container until its rules are confirmed
    pub async fn configure_target(&self, target: &TargetContainer) -> Result<PollOutcome> {
        tracing::debug!(
            "Applying iptables redirect to {} ({})",
            target.address,
            target.container_id
        );

        let outcome = poll_until(&self.config.policy, target, self.detector.as_ref(), || {
            self.attempt(target)
        })
        .await?;

        tracing::info!(
            "NAT rules installed in {} ({}) after {} attempt(s)",
            target.container_id,
            target.address,
            outcome.attempts
        );
        Ok(outcome)
    }

    async fn attempt(&self, target: &TargetContainer) -> Result<ConfigurationAttempt> {
        let host = self.resolver.resolve().await?;
        let command = NatScript::new(host)
            .sudo(self.config.use_sudo)
            .render(&self.config.ports);
        exec::execute(self.client.as_ref(), target, &command).await
    }
}
