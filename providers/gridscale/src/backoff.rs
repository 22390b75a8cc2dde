//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff for retrying server power operations that
//! the API rejects with 409 while the server is busy.
//!
//! Sequence for 500ms..5s: 500ms, 500ms, 1s, 1.5s, 2.5s, 4s, 5s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value
    prev: Duration,
    /// Current backoff value
    current: Duration,
    /// Maximum backoff value
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum delays
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(Duration::from_millis(500), Duration::from_secs(5));

        assert_eq!(backoff.next_backoff(), Duration::from_millis(500));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(500));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(1000));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(1500));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(2500));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(4000));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(5)); // max
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(Duration::from_millis(10), Duration::from_millis(30));

        assert_eq!(backoff.next_backoff(), Duration::from_millis(10));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(10));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(20));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(30));
        // 20 + 30 would be 50, capped
        assert_eq!(backoff.next_backoff(), Duration::from_millis(30));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(30));
    }
}
