//! Bounded exponential backoff for re-dialing a dropped connection.

use std::time::Duration;

/// Retry schedule used after a connection the user did not close drops.
///
/// The delay before retry `n` (zero-based) is `base_backoff * 2^n`, capped at
/// `max_backoff`. After `max_retries` failed dials the session ends.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use coup_client::reconnect::ReconnectPolicy;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.backoff(0), Duration::from_millis(500));
/// assert_eq!(policy.backoff(1), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Dials attempted before giving up.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    /// Set the number of dials attempted before giving up.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base and maximum backoff.
    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    /// Delay before retry `attempt` (zero-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.min(10));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Delay before retry `attempt`, or `None` once retries are exhausted.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_retries).then(|| self.backoff(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = ReconnectPolicy::default()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn retries_are_bounded() {
        let policy = ReconnectPolicy::default().with_max_retries(2);
        assert!(policy.next_delay(0).is_some());
        assert!(policy.next_delay(1).is_some());
        assert_eq!(policy.next_delay(2), None);
    }

    #[test]
    fn zero_retries_never_redials() {
        let policy = ReconnectPolicy::default().with_max_retries(0);
        assert_eq!(policy.next_delay(0), None);
    }
}
