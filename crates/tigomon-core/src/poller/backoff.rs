// ── Failure backoff ──

use std::time::Duration;

/// Exponential backoff over the poll interval.
///
/// `delay = min(base * 2^min(failures, cap_exponent), max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub cap_exponent: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            cap_exponent: 6,
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    /// Zero failures is the healthy interval.
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(self.cap_exponent).min(31);
        self.base.saturating_mul(factor).min(self.max)
    }
}
