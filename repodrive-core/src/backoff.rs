use rand::Rng;
use std::time::Duration;

/// Exponential delay used when the server signals a rate limit without a
/// usable wait hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: bool,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, jitter: bool) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, false)
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let mut rng = rand::thread_rng();
        self.delay_with_rng(attempt, &mut rng)
    }

    pub fn delay_with_rng<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base_ms = self.base.as_millis().min(u128::from(u64::MAX)) as u64;
        let max_ms = self.max.as_millis().min(u128::from(u64::MAX)) as u64;
        let exp = base_ms.saturating_mul(1u64 << attempt.min(16)).min(max_ms);
        if self.jitter && exp > 0 {
            // Keep at least half of the step so retries never collapse to zero.
            Duration::from_millis(rng.gen_range(exp / 2..=exp))
        } else {
            Duration::from_millis(exp)
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), true)
    }
}
