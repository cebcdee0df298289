//! Deadline-bounded polling of a container until its NAT rules are confirmed

use crate::{
    command::SuccessDetector,
    ports::{ConfigurationAttempt, TargetContainer},
    Error, Result,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// How often and for how long a container is polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

/// State of the polling loop for one container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Succeeded,
    TimedOut,
}

/// Result of a successful polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Number of attempts made, including the successful one
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Call `attempt` until its output satisfies `detector` or the policy's timeout expires
///
/// An `Err` from `attempt` is treated as fatal and returned immediately. An
/// attempt whose output is missing or lacks the success marker is retried
/// after `poll_interval`. Each attempt is bounded by the remaining time
/// budget, so a hung exec cannot hold the loop past the deadline.
pub async fn poll_until<F, Fut>(
    policy: &RetryPolicy,
    target: &TargetContainer,
    detector: &dyn SuccessDetector,
    mut attempt: F,
) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ConfigurationAttempt>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut state = PollState::Polling;

    loop {
        match state {
            PollState::Polling => {
                attempts += 1;
                let remaining = policy.timeout.saturating_sub(start.elapsed());

                let succeeded = match tokio::time::timeout(remaining, attempt()).await {
                    Ok(Ok(result)) => result
                        .output
                        .as_deref()
                        .is_some_and(|output| detector.indicates_success(output)),
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        tracing::warn!(
                            "Attempt {} on {} did not finish before the deadline",
                            attempts,
                            target.container_id
                        );
                        false
                    }
                };

                state = if succeeded {
                    PollState::Succeeded
                } else if start.elapsed() + policy.poll_interval >= policy.timeout {
                    PollState::TimedOut
                } else {
                    tracing::debug!(
                        "NAT rules on {} not confirmed yet (attempt {}), retrying in {:?}",
                        target.container_id,
                        attempts,
                        policy.poll_interval
                    );
                    tokio::time::sleep(policy.poll_interval).await;
                    PollState::Polling
                };
            }
            PollState::Succeeded => {
                return Ok(PollOutcome {
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            PollState::TimedOut => {
                let elapsed = start.elapsed();
                tracing::warn!(
                    "Giving up on {} ({}) after {} attempt(s) in {:?}",
                    target.container_id,
                    target.address,
                    attempts,
                    elapsed
                );
                return Err(Error::Timeout {
                    container: target.container_id.clone(),
                    address: target.address.clone(),
                    attempts,
                    elapsed,
                });
            }
        }
    }
}
