//! Exponential backoff with jitter for `requeue_with_backoff` (§4.A).
//!
//! A full-jitter scheme over an injectable `RngCore`, so monotonicity of
//! the backoff envelope is deterministically testable without real sleeps.

use rand::{Rng, RngCore};
use std::time::Duration;
use vectorizer_config::RetryConfig;

/// Compute the next `retry_after` delay for a queue entry with `attempts`
/// prior attempts, using full jitter in `[base, min(cap, base * 2^(attempts-1))]`.
///
/// `attempts` is clamped to at least 1 so the first retry always draws from
/// `[base, base]`.
pub fn backoff_duration(attempts: u32, config: &RetryConfig, rng: &mut dyn RngCore) -> Duration {
    let attempts = attempts.max(1);
    let base = config.backoff_base_seconds as f64;
    let cap = config.backoff_cap_seconds as f64;

    let exponent = i32::try_from(attempts - 1).unwrap_or(i32::MAX);
    let exp = base * 2f64.powi(exponent);
    let upper = cap.min(exp);
    let lower = base.min(upper);

    let secs = if upper > lower {
        rng.gen_range(lower..upper)
    } else {
        upper
    };

    Duration::from_secs_f64(secs)
}

/// `backoff_duration` using the thread-local RNG, for production call sites.
#[must_use]
pub fn backoff_duration_default(attempts: u32, config: &RetryConfig) -> Duration {
    backoff_duration(attempts, config, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn config() -> RetryConfig {
        RetryConfig {
            max_attempts: 6,
            backoff_base_seconds: 30,
            backoff_cap_seconds: 1800,
        }
    }

    #[test]
    fn minimum_rng_draw_returns_base() {
        let config = config();
        let mut rng = StepRng::new(0, 0);
        for attempts in 1..=10 {
            let d = backoff_duration(attempts, &config, &mut rng);
            assert_eq!(d.as_secs_f64(), config.backoff_base_seconds as f64);
        }
    }

    #[test]
    fn maximum_rng_draw_grows_monotonically_until_capped() {
        let config = config();
        let mut rng = StepRng::new(u64::MAX, 0);
        let mut prev = 0.0;
        for attempts in 1..=10 {
            let d = backoff_duration(attempts, &config, &mut rng).as_secs_f64();
            assert!(d >= prev, "backoff should not shrink as attempts grow");
            assert!(d <= config.backoff_cap_seconds as f64);
            prev = d;
        }
        // Eventually hits the cap.
        let d = backoff_duration(20, &config, &mut rng);
        assert_eq!(d.as_secs_f64(), config.backoff_cap_seconds as f64);
    }

    #[test]
    fn first_attempt_never_exceeds_base() {
        let config = config();
        let mut rng = StepRng::new(u64::MAX / 2, 0);
        let d = backoff_duration(1, &config, &mut rng);
        assert_eq!(d.as_secs_f64(), config.backoff_base_seconds as f64);
    }
}
