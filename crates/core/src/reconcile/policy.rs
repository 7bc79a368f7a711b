//! Bounded retry with jitter.

use std::time::Duration;

use rand::Rng;

/// Attempt budget and pacing for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of the random delay added on top of `base_delay`.
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        let max_jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_jitter_ms)
        };
        self.base_delay + Duration::from_millis(jitter)
    }

    pub async fn pause(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
