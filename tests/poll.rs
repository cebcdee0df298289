//! The polling loop on its own, without an exec client

use container_nat_forward::{
    poll_until, ConfigurationAttempt, Error, RetryPolicy, SentinelDetector, TargetContainer,
};
use std::time::Duration;

fn attempt(output: Option<&str>) -> ConfigurationAttempt {
    ConfigurationAttempt {
        command: "true".to_string(),
        exec_id: "exec".to_string(),
        output: output.map(str::to_string),
    }
}

#[tokio::test(start_paused = true)]
async fn test_hung_attempt_does_not_overrun_deadline() {
    let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(5));
    let target = TargetContainer::new("agent-1", "10.0.0.2");

    let start = tokio::time::Instant::now();
    let result = poll_until(&policy, &target, &SentinelDetector::default(), || {
        std::future::pending::<container_nat_forward::Result<ConfigurationAttempt>>()
    })
    .await;

    assert!(matches!(result, Err(Error::Timeout { attempts: 1, .. })));
    assert!(start.elapsed() <= Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_custom_detector_and_poll_interval() -> anyhow::Result<()> {
    let policy = RetryPolicy::new(Duration::from_millis(200), Duration::from_secs(2));
    let target = TargetContainer::new("agent-1", "10.0.0.2");
    let detector = SentinelDetector::new("rules-ok");

    let mut calls = 0;
    let outcome = poll_until(&policy, &target, &detector, || {
        calls += 1;
        let output = match calls {
            1 => None,
            2 => Some("iptables_finished_flag"),
            _ => Some("rules-ok"),
        };
        async move { Ok::<_, Error>(attempt(output)) }
    })
    .await?;

    assert_eq!(outcome.attempts, 3);
    assert!(outcome.elapsed >= Duration::from_millis(400));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_never_succeeding_attempt_count() {
    let policy = RetryPolicy::new(Duration::from_millis(500), Duration::from_secs(10));
    let target = TargetContainer::new("agent-1", "10.0.0.2");

    let mut calls = 0u32;
    let result = poll_until(&policy, &target, &SentinelDetector::default(), || {
        calls += 1;
        async { Ok::<_, Error>(attempt(Some("permission denied"))) }
    })
    .await;

    assert!(matches!(result, Err(Error::Timeout { .. })));
    // timeout / poll_interval = 20
    assert!((19..=21).contains(&calls), "calls = {}", calls);
}
