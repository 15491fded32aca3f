//! Concurrency Governor.
//!
//! Bounds in-flight upstream requests with a semaphore pool and paces them with a
//! token bucket sized to the upstream rate budget. The bucket is tightened by the
//! `X-Ratelimit-Remaining` header and paused entirely by `Retry-After`, so the
//! governor tracks the budget upstream actually reports rather than a guess.
//!
//! All clocks are [`tokio::time::Instant`], so paused-time tests drive the governor
//! deterministically.

use crate::error::{AdapterError, AdapterResult};
use crate::upstream::types::{find_header, parse_retry_after};
use chrono::Utc;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, sleep, timeout_at};

/// Instant `delay` after `base`, saturating far in the future instead of overflowing.
pub(crate) fn instant_after(base: Instant, delay: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
    base.checked_add(delay)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}

/// Pool size and rate budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorConfig {
    /// Maximum concurrent upstream requests
    pub max_concurrent: usize,
    /// Requests allowed per `window`
    pub requests_per_window: u32,
    pub window: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            requests_per_window: 140,
            window: Duration::from_secs(60),
        }
    }
}

/// Right to perform one upstream request.
///
/// Dropping the permit returns it to the pool.
#[derive(Debug)]
pub struct GovernorPermit {
    _permit: OwnedSemaphorePermit,
    granted_at: Instant,
}

impl GovernorPermit {
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

/// Point-in-time view of the rate budget.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSnapshot {
    pub available_permits: usize,
    pub tokens: f64,
    pub upstream_remaining: Option<u32>,
    pub upstream_total: Option<u32>,
    /// Time left before requests may resume after a `Retry-After`
    pub blocked_for: Option<Duration>,
}

#[derive(Debug)]
struct RateBudget {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
    upstream_remaining: Option<u32>,
    upstream_total: Option<u32>,
    blocked_until: Option<Instant>,
}

impl RateBudget {
    fn new(config: &GovernorConfig) -> Self {
        let capacity = f64::from(config.requests_per_window.max(1));
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / config.window.as_secs_f64().max(f64::EPSILON),
            last_refill: Instant::now(),
            upstream_remaining: None,
            upstream_total: None,
            blocked_until: None,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take a token, or report how long until one is available.
    fn try_take(&mut self, now: Instant) -> Option<Duration> {
        if let Some(until) = self.blocked_until {
            if now < until {
                return Some(until - now);
            }
            self.blocked_until = None;
        }
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64(
                (1.0 - self.tokens) / self.refill_per_sec,
            ))
        }
    }
}

/// Shared gate for every upstream request.
#[derive(Debug)]
pub struct Governor {
    config: GovernorConfig,
    permits: Arc<Semaphore>,
    budget: Mutex<RateBudget>,
}

impl Governor {
    pub fn new(config: GovernorConfig) -> Self {
        let pool = config.max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(pool)),
            budget: Mutex::new(RateBudget::new(&config)),
            config,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Wait for a pool slot and a rate token.
    ///
    /// Fails with [`AdapterError::GovernorTimeout`] once it is clear the permit
    /// cannot be granted before `deadline`. Cancelling the returned future releases
    /// anything acquired so far.
    pub async fn acquire(&self, deadline: Instant) -> AdapterResult<GovernorPermit> {
        let started = Instant::now();
        let permit = match timeout_at(deadline, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                return Err(AdapterError::GovernorTimeout {
                    waited: started.elapsed(),
                });
            }
        };

        loop {
            let now = Instant::now();
            let wait = self.lock_budget().try_take(now);
            let Some(wait) = wait else {
                return Ok(GovernorPermit {
                    _permit: permit,
                    granted_at: now,
                });
            };
            if wait > deadline.saturating_duration_since(now) {
                warn!(
                    "Rate budget exhausted: next token in {:?} exceeds invocation deadline",
                    wait
                );
                return Err(AdapterError::GovernorTimeout {
                    waited: started.elapsed(),
                });
            }
            debug!("Rate budget exhausted, pacing request for {:?}", wait);
            sleep(wait).await;
        }
    }

    /// Return a permit to the pool.
    pub fn release(&self, permit: GovernorPermit) {
        drop(permit);
    }

    /// Fold upstream rate-limit headers into the budget.
    ///
    /// `headers` are `(lowercase-name, value)` pairs as found on an
    /// [`UpstreamResponse`](crate::upstream::UpstreamResponse).
    pub fn record(&self, headers: &[(String, String)]) {
        let header = |name: &str| {
            find_header(headers, name).and_then(|value| value.trim().parse::<u64>().ok())
        };
        let remaining = header("x-ratelimit-remaining");
        let total = header("x-ratelimit-total");
        let retry_after =
            find_header(headers, "retry-after").and_then(|value| parse_retry_after(value, Utc::now()));

        let now = Instant::now();
        let mut budget = self.lock_budget();
        if let Some(total) = total {
            budget.upstream_total = u32::try_from(total).ok();
        }
        if let Some(remaining) = remaining {
            budget.refill(now);
            budget.tokens = budget.tokens.min(remaining as f64);
            budget.upstream_remaining = u32::try_from(remaining).ok();
        }
        if let Some(delay) = retry_after {
            let until = instant_after(now, delay);
            if budget.blocked_until.is_none_or(|current| current < until) {
                debug!("Upstream requested a pause of {:?}", delay);
                budget.blocked_until = Some(until);
            }
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let now = Instant::now();
        let mut budget = self.lock_budget();
        budget.refill(now);
        BudgetSnapshot {
            available_permits: self.permits.available_permits(),
            tokens: budget.tokens,
            upstream_remaining: budget.upstream_remaining,
            upstream_total: budget.upstream_total,
            blocked_for: budget
                .blocked_until
                .filter(|until| *until > now)
                .map(|until| until - now),
        }
    }

    fn lock_budget(&self) -> MutexGuard<'_, RateBudget> {
        self.budget
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Governor {
    fn default() -> Self {
        Self::new(GovernorConfig::default())
    }
}
