//! # Bounded Exponential Backoff
//!
//! Provides the retry schedule for calls against the kubelet checkpoint
//! endpoint: a fixed number of attempts with exponentially growing delays.
//!
//! The default schedule is 5 attempts with delays of 2s, 4s, 8s, 16s between
//! them (no delay after the final attempt).

use std::time::Duration;

/// Bounded exponential backoff calculator
///
/// Each call to `next_delay()` consumes one attempt and returns the delay to
/// sleep before the following attempt, or `None` once no attempts remain.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay before the next retry
    current: Duration,
    /// Growth factor applied after every retry
    factor: f64,
    /// Attempts remaining
    steps: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff with the given attempt count, initial delay and
    /// growth factor.
    #[must_use]
    pub fn new(steps: u32, initial: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            factor,
            steps,
        }
    }

    /// The schedule used for kubelet checkpoint calls: 5 attempts, 2 seconds
    /// initial delay, factor 2.
    #[must_use]
    pub fn kubelet() -> Self {
        Self::new(5, Duration::from_secs(2), 2.0)
    }

    /// Consume one attempt. Returns the delay to wait before retrying, or
    /// `None` when no attempts remain.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.steps <= 1 {
            self.steps = 0;
            return None;
        }
        self.steps -= 1;

        let delay = self.current;
        self.current = Duration::from_secs_f64(self.current.as_secs_f64() * self.factor);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubelet_backoff_schedule() {
        let mut backoff = ExponentialBackoff::kubelet();

        // 5 attempts means 4 sleeps: 2s, 4s, 8s, 16s
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(8)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(16)));
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_backoff_exhaustion_is_sticky() {
        let mut backoff = ExponentialBackoff::new(2, Duration::from_secs(1), 2.0);

        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(), None);
        // Stays exhausted
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_single_attempt_never_sleeps() {
        let mut backoff = ExponentialBackoff::new(1, Duration::from_secs(2), 2.0);
        assert_eq!(backoff.next_delay(), None);
    }
}
