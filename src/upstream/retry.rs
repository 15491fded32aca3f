//! Exponential backoff with jitter for retriable upstream failures.

use rand::Rng;
use std::time::Duration;

/// Retry schedule for rate-limit, server-error and transport failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first attempt included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
    /// Relative jitter, e.g. `0.2` spreads delays by ±20%
    pub jitter: f64,
    /// Upper bound on computed delays
    pub max_delay: Duration,
    /// Statuses treated as transient
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            jitter: 0.2,
            max_delay: Duration::from_secs(30),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Deterministic delays, for tests and benchmarks.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay after the `attempt`-th failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(32) as f64;
        let cap = self.max_delay.as_secs_f64();
        let mut delay = (self.base_delay.as_secs_f64() * self.factor.powf(exp)).min(cap);
        if self.jitter > 0.0 {
            let spread = rand::thread_rng().gen_range(-self.jitter..self.jitter);
            delay *= 1.0 + spread;
        }
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Delay before the next attempt, honouring an upstream `Retry-After` hint when it
    /// asks for a longer wait than the schedule.
    pub fn next_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let computed = self.delay_for(attempt);
        match hint {
            Some(hint) if hint > computed => hint,
            _ => computed,
        }
    }
}
