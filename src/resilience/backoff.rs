//! Exponential backoff with jitter between executor attempts.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Delay to wait before attempt number `attempt` (1-based; the first attempt never waits).
///
/// `base_delay_ms == 0` disables backoff entirely.
pub fn delay_before(attempt: u32, config: &RetryConfig) -> Duration {
    if attempt <= 1 || config.base_delay_ms == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 2);
    let delay_ms = config.base_delay_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(config.max_delay_ms);

    // Up to 10% jitter so concurrent retries spread out.
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
