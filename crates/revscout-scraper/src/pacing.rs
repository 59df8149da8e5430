//! Human-paced delays between page fetches.
//!
//! Review sites rate-limit and fingerprint bursty access, so the walker
//! sleeps a jittered interval between pages, with an occasional longer pause
//! to break up the rhythm. Tests use [`DelayPolicy::none`] to run at full
//! speed.

use std::time::Duration;

use rand::Rng;

/// One-in-ten pages gets an extended pause on top of the base jitter.
const LONG_PAUSE_CHANCE: f64 = 0.1;
const LONG_PAUSE_MIN_MS: u64 = 5_000;
const LONG_PAUSE_MAX_MS: u64 = 15_000;

/// Bounds for the jittered inter-page delay.
#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    min_ms: u64,
    max_ms: u64,
}

impl DelayPolicy {
    /// Creates a policy sleeping a uniform interval in `[min_ms, max_ms]`.
    /// Inverted bounds are swapped rather than rejected.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    /// A policy that never sleeps. Used in tests and dry runs.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }

    /// Samples the next delay in milliseconds.
    #[must_use]
    pub fn sample_ms(&self) -> u64 {
        if self.max_ms == 0 {
            return 0;
        }
        let mut rng = rand::rng();
        let mut ms = rng.random_range(self.min_ms..=self.max_ms);
        if rng.random_bool(LONG_PAUSE_CHANCE) {
            ms += rng.random_range(LONG_PAUSE_MIN_MS..=LONG_PAUSE_MAX_MS);
        }
        ms
    }

    /// Sleeps for one sampled interval; returns immediately under
    /// [`DelayPolicy::none`].
    pub async fn wait(&self) {
        let ms = self.sample_ms();
        if ms > 0 {
            tracing::debug!(delay_ms = ms, "pacing before next page");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}
