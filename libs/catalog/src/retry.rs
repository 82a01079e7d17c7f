use std::time::Duration;

/// Re-send policy for idempotent procedures
///
/// Only nodes whose outcome was a connect or transport failure are retried;
/// a node that answered, even with garbage, is never asked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Pause before each extra attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub const fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }
}
