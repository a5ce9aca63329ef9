//! Bounded retry with jittered exponential backoff

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 0.0 to 1.0, fraction of the delay randomised either way
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_factor: 0.0,
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = (self.base_delay_ms as f64) * 2_f64.powi(attempt.min(30) as i32);
        let capped = exp.min(self.max_delay_ms as f64);

        let jitter_range = capped * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is used up. The last error is returned on exhaustion.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_retryable: C,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    log::debug!("{} succeeded after {} attempts", operation_name, attempt + 1);
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    log::warn!("{} failed permanently: {}", operation_name, err);
                    return Err(err);
                }
                if attempt + 1 >= attempts {
                    log::warn!(
                        "{} exhausted {} attempts: {}",
                        operation_name,
                        attempts,
                        err
                    );
                    return Err(err);
                }

                let delay = policy.backoff(attempt);
                log::debug!(
                    "{} attempt {} failed ({}), backing off {:?}",
                    operation_name,
                    attempt + 1,
                    err,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
