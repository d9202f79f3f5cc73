//! Jittered exponential backoff between registry lookups.

use std::time::Duration;

use rand::Rng;

/// Delay schedule: `base * 2^(n-1)` up to `cap`, plus up to 10% jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    cap_ms: u64,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        let base_ms = base.as_millis().min(u64::MAX as u128) as u64;
        let cap_ms = cap.as_millis().min(u64::MAX as u128) as u64;
        Self {
            base_ms,
            cap_ms: cap_ms.max(base_ms),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.base_ms == 0 {
            return Duration::ZERO;
        }

        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        let delay_ms = self.base_ms.saturating_mul(factor).min(self.cap_ms);

        let jitter_ms = match delay_ms / 10 {
            0 => 0,
            range => rand::thread_rng().gen_range(0..range),
        };

        Duration::from_millis(delay_ms + jitter_ms)
    }
}
