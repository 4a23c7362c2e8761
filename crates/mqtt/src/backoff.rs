//! Exponential backoff for reconnect attempts.
//!
//! After a connection failure the driver waits an increasing amount of time
//! before retrying, so a recovering broker is not hammered by the very clients
//! it just dropped:
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max_delay)
//! ```
//!
//! The schedule saturates once the cap is reached; after that, further
//! attempts are refused with [`BackoffError`] so the caller can surface a
//! sustained outage instead of retrying forever.

use std::time::Duration;

use thiserror::Error;

/// Raised when the retry budget is spent.
#[derive(Debug, Error)]
pub enum BackoffError {
    /// Maximum retry attempts exceeded; the payload is the effective limit.
    #[error("Maximum number of attempts exceeded: {0}")]
    MaxAttemptsExceeded(u32),
}

/// Exponential backoff schedule.
///
/// Each [`next_sleep`](Backoff::next_sleep) call returns the current delay and
/// advances the schedule. [`reset`](Backoff::reset) rewinds it after a
/// successful connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_delay: Duration,
    current_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    attempt: u32,

    /// Explicit attempt limit; when `None` the saturation point of the
    /// schedule is used instead.
    max_attempts: Option<u32>,

    /// Number of attempts until the delay plateaus at `max_delay`.
    saturation_attempts: u32,
}

impl Backoff {
    /// Creates a schedule with custom timing parameters.
    ///
    /// Degenerate inputs (`initial >= max`, `multiplier <= 1.0`) collapse the
    /// schedule to a single attempt rather than panicking.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        let saturation_attempts = Self::saturation_attempts(initial, max, multiplier);
        Self {
            initial_delay: initial,
            current_delay: initial,
            max_delay: max,
            multiplier,
            attempt: 0,
            max_attempts: None,
            saturation_attempts,
        }
    }

    /// Solves `initial * multiplier^n = max` for `n`, so the schedule stops
    /// once extra attempts would all wait the same capped delay.
    fn saturation_attempts(initial: Duration, max: Duration, multiplier: f64) -> u32 {
        if initial >= max || multiplier <= 1.0 {
            return 1;
        }
        let n = (max.as_secs_f64() / initial.as_secs_f64()).log(multiplier);
        n.floor() as u32 + 1
    }

    /// Overrides the computed attempt limit with a stricter one.
    pub fn set_max_attempts(&mut self, max: u32) {
        self.max_attempts = Some(max);
    }

    /// Rewinds to the initial delay. Call on successful connection.
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
        self.attempt = 0;
    }

    /// Returns the next delay and advances the schedule.
    ///
    /// # Errors
    ///
    /// [`BackoffError::MaxAttemptsExceeded`] once the attempt limit is spent.
    pub fn next_sleep(&mut self) -> Result<Duration, BackoffError> {
        self.attempt += 1;
        let effective_max = self.max_attempts.unwrap_or(self.saturation_attempts);
        if self.attempt > effective_max {
            return Err(BackoffError::MaxAttemptsExceeded(effective_max));
        }

        let sleep = self.current_delay;

        let next = self.current_delay.as_secs_f64() * self.multiplier;
        self.current_delay = Duration::from_secs_f64(next).min(self.max_delay);

        Ok(sleep)
    }

    /// Current attempt count, incremented by `next_sleep`.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Configured delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay the next `next_sleep` call will return.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }
}

impl Default for Backoff {
    /// 1 s initial delay, 10% growth per attempt, capped at 60 s. Gentle on
    /// short network hiccups, saturating within a minute for real outages.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 1.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let backoff = Backoff::default();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.current_delay(), Duration::from_secs(1));
        assert_eq!(backoff.max_delay(), Duration::from_secs(60));
    }

    #[test]
    fn delays_grow() {
        let mut backoff = Backoff::default();
        let first = backoff.next_sleep().unwrap();
        assert_eq!(first, Duration::from_secs(1));

        let second = backoff.next_sleep().unwrap();
        assert!(second > first);
        assert!(second < Duration::from_secs_f64(1.2));
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10), 2.0);

        let mut last = Duration::ZERO;
        while let Ok(delay) = backoff.next_sleep() {
            last = delay;
            if delay >= backoff.max_delay() {
                break;
            }
        }
        assert!(last <= Duration::from_secs(10));
    }

    #[test]
    fn reset_rewinds() {
        let mut backoff = Backoff::default();
        backoff.next_sleep().unwrap();
        backoff.next_sleep().unwrap();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.current_delay(), Duration::from_secs(1));
    }

    #[test]
    fn explicit_limit_exhausts() {
        let mut backoff = Backoff::default();
        backoff.set_max_attempts(2);

        assert!(backoff.next_sleep().is_ok());
        assert!(backoff.next_sleep().is_ok());
        let result = backoff.next_sleep();
        assert!(matches!(result, Err(BackoffError::MaxAttemptsExceeded(2))));
    }

    #[test]
    fn degenerate_multiplier_collapses() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10), 0.9);
        assert_eq!(backoff.saturation_attempts, 1);
    }

    #[test]
    fn degenerate_range_collapses() {
        let backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(10), 1.5);
        assert_eq!(backoff.saturation_attempts, 1);
    }
}
