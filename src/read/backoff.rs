use async_trait::async_trait;
use std::time;

/// Waits between retries of unprocessed keys.
///
/// `attempt` is the 1-based number of the request that left keys unprocessed.
/// Implementations must not wait less for a later attempt than for an earlier one.
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Suspend before the request following `attempt`.
    async fn wait(&self, attempt: u32);
}

/// Exponential backoff settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first attempt.
    pub initial_delay: time::Duration,
    /// Upper bound of any delay.
    pub max_delay: time::Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: time::Duration::from_millis(50),
            max_delay: time::Duration::from_secs(5),
        }
    }
}

/// Doubles the delay after every attempt, capped at `max_delay`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExponentialBackoff {
    /// The delay settings.
    pub config: BackoffConfig,
}

impl ExponentialBackoff {
    /// Delay after `attempt`: `min(initial_delay * 2^(attempt - 1), max_delay)`.
    pub fn delay(&self, attempt: u32) -> time::Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.config
            .initial_delay
            .saturating_mul(1 << exponent)
            .min(self.config.max_delay)
    }
}

#[async_trait]
impl Backoff for ExponentialBackoff {
    async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.delay(attempt)).await;
    }
}

/// Retries immediately.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NoBackoff;

#[async_trait]
impl Backoff for NoBackoff {
    async fn wait(&self, _attempt: u32) {}
}
