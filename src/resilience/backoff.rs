//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is 1-based; attempt 0 means no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Tracks consecutive failures of one resource and when it may be retried.
#[derive(Debug, Clone)]
pub struct RetryGate {
    base_ms: u64,
    max_ms: u64,
    failures: u32,
    not_before: Option<Instant>,
}

impl RetryGate {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            failures: 0,
            not_before: None,
        }
    }

    /// Record a failure and push the next allowed attempt back.
    pub fn record_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = calculate_backoff(self.failures, self.base_ms, self.max_ms);
        self.not_before = Some(Instant::now() + delay);
        delay
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.not_before = None;
    }

    /// Whether an attempt is allowed now.
    pub fn is_open(&self) -> bool {
        self.not_before.map_or(true, |t| Instant::now() >= t)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
