//! Reconnect backoff policy
//!
//! Each failed attempt or closed session waits before the next attempt. The
//! wait starts at the initial delay, doubles after every consecutive failure
//! and is capped. A successful open resets it.
//!
//! ```text
//! failures:  1     2      3      4      5      6 ...
//! delay:     500   1000   2000   4000   8000   8000 ... (ms)
//! ```

use std::time::Duration;

/// Backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound on any delay
    pub max: Duration,
    /// Growth factor per consecutive failure
    pub factor: u32,
}

impl BackoffPolicy {
    /// Policy with explicit bounds and doubling growth
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            factor: 2,
        }
    }

    /// Set initial delay in milliseconds
    pub fn initial_ms(mut self, ms: u64) -> Self {
        self.initial = Duration::from_millis(ms);
        self
    }

    /// Set the cap in milliseconds
    pub fn max_ms(mut self, ms: u64) -> Self {
        self.max = Duration::from_millis(ms);
        self
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(8_000))
    }
}

/// Running backoff state for one provider
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next: Duration,
}

impl Backoff {
    /// Start at the policy's initial delay
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            next: policy.initial.min(policy.max),
            policy,
        }
    }

    /// Delay to wait now; grows the delay for the following failure
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = delay
            .checked_mul(self.policy.factor)
            .unwrap_or(self.policy.max)
            .min(self.policy.max);
        delay
    }

    /// Delay the next failure would wait, without consuming it
    pub fn peek(&self) -> Duration {
        self.next
    }

    /// Back to the initial delay after a successful open
    pub fn reset(&mut self) {
        self.next = self.policy.initial.min(self.policy.max);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(backoff: &mut Backoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_delay().as_millis() as u64).collect()
    }

    #[test]
    fn doubles_up_to_cap() {
        let mut backoff = Backoff::default();
        assert_eq!(
            millis(&mut backoff, 7),
            vec![500, 1000, 2000, 4000, 8000, 8000, 8000]
        );
    }

    #[test]
    fn reset_after_success() {
        let mut backoff = Backoff::default();
        millis(&mut backoff, 4);
        backoff.reset();
        assert_eq!(backoff.peek(), Duration::from_millis(500));
        assert_eq!(millis(&mut backoff, 2), vec![500, 1000]);
    }

    #[test]
    fn custom_policy() {
        let policy = BackoffPolicy::default().initial_ms(100).max_ms(250);
        let mut backoff = Backoff::new(policy);
        assert_eq!(millis(&mut backoff, 4), vec![100, 200, 250, 250]);
    }

    #[test]
    fn initial_above_cap_is_clamped() {
        let policy = BackoffPolicy::default().initial_ms(10_000);
        let mut backoff = Backoff::new(policy);
        assert_eq!(millis(&mut backoff, 2), vec![8000, 8000]);
    }
}
