//! Configuration for the sync engine.

use crate::term::TermWindow;
use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Retry configuration for transport failures.
    pub retry: RetryConfig,
    /// Delay between consecutive remote calls within one loop.
    pub call_delay: Duration,
    /// Extra delay after a per-item failure.
    pub failure_cooldown: Duration,
    /// Page size used by full runs and as the default batch limit.
    pub batch_limit: u32,
    /// Consecutive row errors, with no success, that abort a batch (0 disables).
    pub circuit_breaker: u32,
    /// Number of anchors after which scratch buffers and the lecturer cache
    /// are released.
    pub release_interval: usize,
    /// Sane range of term ids.
    pub term_window: TermWindow,
    /// Overrides the current year used for the term window.
    pub current_year: Option<i32>,
    /// Request timeout handed to HTTP clients.
    pub timeout: Duration,
}

impl SyncConfig {
    /// Creates a new sync configuration with default values.
    pub fn new() -> Self {
        Self {
            retry: RetryConfig::default(),
            call_delay: Duration::from_millis(200),
            failure_cooldown: Duration::from_secs(1),
            batch_limit: 100,
            circuit_breaker: 10,
            release_interval: 50,
            term_window: TermWindow::default(),
            current_year: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the delay between consecutive calls.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Sets the cooldown after a per-item failure.
    pub fn with_failure_cooldown(mut self, cooldown: Duration) -> Self {
        self.failure_cooldown = cooldown;
        self
    }

    /// Sets the batch limit.
    pub fn with_batch_limit(mut self, limit: u32) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Sets the circuit-breaker threshold.
    pub fn with_circuit_breaker(mut self, threshold: u32) -> Self {
        self.circuit_breaker = threshold;
        self
    }

    /// Sets the buffer release interval.
    pub fn with_release_interval(mut self, interval: usize) -> Self {
        self.release_interval = interval;
        self
    }

    /// Sets the term window.
    pub fn with_term_window(mut self, window: TermWindow) -> Self {
        self.term_window = window;
        self
    }

    /// Pins the current year.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the configured year, or the local clock's year.
    pub fn effective_year(&self) -> i32 {
        use chrono::Datelike;
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
///
/// Only connection-level failures are retried. Attempt `k` (1-based
/// retry index) waits `initial_delay * backoff_multiplier^(k-1)`, capped
/// at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before retry `attempt` (1-based; 0 means the
    /// first attempt, which is not delayed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_batch_limit(50)
            .with_call_delay(Duration::ZERO)
            .with_circuit_breaker(3)
            .with_current_year(2025)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.batch_limit, 50);
        assert_eq!(config.call_delay, Duration::ZERO);
        assert_eq!(config.circuit_breaker, 3);
        assert_eq!(config.effective_year(), 2025);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn clock_year_is_plausible() {
        let year = SyncConfig::new().effective_year();
        assert!(year >= 2024);
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn retry_delay_doubles() {
        let config = RetryConfig::new(5).with_initial_delay(Duration::from_millis(100));

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(5));
    }
}
