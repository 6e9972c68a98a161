//! Bounded retry with exponential backoff and jitter

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::timeout::with_timeout;
use crate::config::PipelineConfig;
use crate::types::{ErrorCategory, FactweaveError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Calls per operation, first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
    /// Time box of a single call
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
            backoff_factor: config.backoff_factor,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Random jitter of up to a quarter of the base delay
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let jitter_ms = rand::rng().random_range(0..max_jitter_ms);
    Duration::from_millis(jitter_ms)
}

/// Products that are not a valid duration (NaN, negative, overflow) fall back to `max`
fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    Duration::try_from_secs_f32(current.as_secs_f32() * factor).map_or(max, |next| next.min(max))
}

/// A successful value and the number of calls it took
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub tries: u32,
}

/// Call `operation` until it succeeds, fails permanently or runs out of
/// attempts. Every call is time boxed; a timeout counts as a retryable failure.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    collaborator: &str,
    mut operation: F,
) -> Result<Attempted<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut current_delay = policy.base_delay;
    let mut last_error: Option<FactweaveError> = None;

    for attempt in 1..=policy.max_attempts {
        match with_timeout(policy.timeout, operation(), operation_name).await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    tries: attempt,
                });
            }
            Err(err) => {
                let classified = err.classify(collaborator);
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    category = %classified.category,
                    "Call failed"
                );

                if !classified.is_retryable() {
                    return Err(err);
                }
                last_error = Some(err);

                if attempt < policy.max_attempts {
                    let delay = match classified.category {
                        ErrorCategory::RateLimit => classified.recommended_delay().min(policy.max_delay),
                        _ => current_delay + random_jitter(current_delay),
                    };
                    debug!(delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                    sleep(delay).await;
                    current_delay =
                        calculate_backoff(current_delay, policy.backoff_factor, policy.max_delay);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        FactweaveError::Context(format!("{} made no attempts", operation_name))
    }))
}
