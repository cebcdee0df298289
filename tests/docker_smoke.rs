//! Needs a running Docker daemon and a container with iptables installed.
//!
//! Run with: NAT_FORWARD_TEST_CONTAINER=<id> cargo test --test docker_smoke -- --ignored

use container_nat_forward::{NatConfig, NatConfigurator, PortMapping, TargetContainer};

#[tokio::test]
#[ignore]
async fn test_apply_to_running_container() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("container_nat_forward=debug")
        .try_init();

    let container_id = std::env::var("NAT_FORWARD_TEST_CONTAINER")?;
    let config = NatConfig::from_env()?
        .ports([PortMapping::new(9200, 9300)?])
        .sudo(false);

    let configurator = NatConfigurator::docker(config).await?;
    let outcome = configurator
        .configure_target(&TargetContainer::new(container_id, "unknown"))
        .await?;

    assert!(outcome.attempts >= 1);
    Ok(())
}
