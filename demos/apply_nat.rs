//! Forward service ports inside running containers to the Docker host
//!
//! Run with:
//!   NAT_FORWARD_PORTS=9200:9300 cargo run --example apply_nat -- <container-id>...

use container_nat_forward::{NatConfig, NatConfigurator, TargetContainer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,container_nat_forward=debug".into()),
        )
        .init();

    let targets: Vec<TargetContainer> = std::env::args()
        .skip(1)
        .map(|id| TargetContainer::new(id.clone(), id))
        .collect();
    if targets.is_empty() {
        anyhow::bail!("usage: apply_nat <container-id>...");
    }

    let config = NatConfig::from_env()?;
    println!(
        "Forwarding {} port pair(s) in {} container(s)",
        config.ports.len(),
        targets.len()
    );

    let configurator = NatConfigurator::docker(config).await?;
    configurator.apply(&targets).await?;

    println!("✓ NAT rules installed");
    Ok(())
}
