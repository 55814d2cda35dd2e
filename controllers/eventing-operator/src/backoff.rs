//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciles. The delay grows along the Fibonacci
//! sequence, which backs off more gently than doubling while still spacing out
//! retries of a request that keeps failing.
//!
//! Sequence with the reconcile defaults: 5s, 5s, 10s, 15s, 25s, 40s, ... 300s (max).

use std::time::Duration;

/// Smallest requeue delay in seconds
pub const MIN_BACKOFF_SECONDS: u64 = 5;
/// Largest requeue delay in seconds
pub const MAX_BACKOFF_SECONDS: u64 = 300;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max_seconds`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_seconds: u64,
    prev_seconds: u64,
    current_seconds: u64,
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given bounds in seconds
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;
        let next = self.prev_seconds + self.current_seconds;
        self.prev_seconds = self.current_seconds;
        self.current_seconds = next.min(self.max_seconds);
        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(MIN_BACKOFF_SECONDS, MAX_BACKOFF_SECONDS)
    }
}

/// Backoff state for one request
#[derive(Debug, Clone, Default)]
pub struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    /// Records a failure and returns the delay before the next attempt.
    pub fn record_error(&mut self) -> (Duration, u32) {
        self.error_count += 1;
        (self.backoff.next_backoff(), self.error_count)
    }

    /// Forgets previous failures.
    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::default();

        assert_eq!(secs(&mut backoff), 5);
        assert_eq!(secs(&mut backoff), 5);
        assert_eq!(secs(&mut backoff), 10);
        assert_eq!(secs(&mut backoff), 15);
        assert_eq!(secs(&mut backoff), 25);
        assert_eq!(secs(&mut backoff), 40);
        assert_eq!(secs(&mut backoff), 65);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(5, 20);

        assert_eq!(secs(&mut backoff), 5);
        assert_eq!(secs(&mut backoff), 5);
        assert_eq!(secs(&mut backoff), 10);
        assert_eq!(secs(&mut backoff), 15);
        // 25 is capped
        assert_eq!(secs(&mut backoff), 20);
        assert_eq!(secs(&mut backoff), 20);
    }

    #[test]
    fn test_backoff_state_reset() {
        let mut state = BackoffState::default();
        state.record_error();
        state.record_error();
        let (delay, count) = state.record_error();
        assert_eq!(delay, Duration::from_secs(10));
        assert_eq!(count, 3);

        state.reset();

        let (delay, count) = state.record_error();
        assert_eq!(delay, Duration::from_secs(5));
        assert_eq!(count, 1);
    }
}
