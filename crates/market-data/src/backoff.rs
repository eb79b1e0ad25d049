//! Exponential backoff for reconnect scheduling.
//!
//! Deterministic: `delay = base * factor^attempt`, capped at a maximum
//! delay, with the attempt count capped so the caller can settle into
//! a terminal error state.

use config::ReconnectConfig;
use std::time::Duration;

/// Backoff state machine for one reconnect sequence
#[derive(Debug)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    factor: f64,
    max_attempts: u32,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            factor: config.backoff_factor.max(1.0),
            max_attempts: config.max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the attempt
    /// budget is exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }

        let scaled = self.base_delay.as_secs_f64() * self.factor.powi(self.attempt as i32);
        let delay = Duration::from_secs_f64(scaled).min(self.max_delay);

        self.attempt += 1;
        Some(delay)
    }

    /// Attempts consumed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start a fresh sequence
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReconnectConfig {
        ReconnectConfig {
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
            max_attempts: 10,
        }
    }

    #[test]
    fn test_delays_double_until_cap() {
        let mut backoff = ExponentialBackoff::new(&config());
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();

        assert_eq!(delays.len(), 10);
        assert_eq!(&delays[..6], &[1000, 2000, 4000, 8000, 16_000, 30_000]);
        // Capped from the sixth attempt on
        assert!(delays[6..].iter().all(|&d| d == 30_000));
    }

    #[test]
    fn test_delays_nondecreasing() {
        let mut backoff = ExponentialBackoff::new(&config());
        let mut prev = Duration::ZERO;
        while let Some(d) = backoff.next_delay() {
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn test_attempt_budget_exhausts() {
        let mut config = config();
        config.max_attempts = 3;
        let mut backoff = ExponentialBackoff::new(&config);

        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_reset_restores_budget_and_base_delay() {
        let mut backoff = ExponentialBackoff::new(&config());
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert!(backoff.next_delay().is_none());

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_zero_attempts_never_yields() {
        let mut config = config();
        config.max_attempts = 0;
        let mut backoff = ExponentialBackoff::new(&config);
        assert!(backoff.next_delay().is_none());
    }
}
