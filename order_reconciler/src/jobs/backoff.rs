use std::time::Duration;

/// How long a failed message waits before it is redelivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry `n` (starting at 1) waits `base_delay * 2^(n-1)`.
    Exponential { base_delay: Duration },
    /// Every retry waits the same `delay`.
    Fixed { delay: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed { delay: Duration::ZERO }
    }
}

impl Backoff {
    pub fn exponential(base_delay: Duration) -> Self {
        Self::Exponential { base_delay }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay }
    }

    /// The delay before retry number `attempt`. Attempt 0 (the first delivery) never waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self {
            Self::Exponential { base_delay } => {
                2u32.checked_pow(attempt - 1).and_then(|factor| base_delay.checked_mul(factor)).unwrap_or(Duration::MAX)
            },
            Self::Fixed { delay } => *delay,
        }
    }
}
