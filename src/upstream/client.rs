//! Authenticated upstream client with retry and rate governance.

use super::retry::RetryPolicy;
use super::transport::{Transport, TransportError};
use super::types::{UpstreamRequest, UpstreamResponse};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterResult};
use crate::governor::Governor;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};

/// Executes upstream requests on behalf of invocations.
///
/// Every attempt, retries included, passes through the shared [`Governor`]. Statuses
/// listed in the [`RetryPolicy`] and transport failures are retried with
/// exponential backoff; any other response, successful or not, is returned to the
/// caller for classification.
#[derive(Debug)]
pub struct UpstreamClient<T: Transport> {
    transport: T,
    api_root: String,
    authorization: String,
    request_timeout: Duration,
    retry: RetryPolicy,
    governor: Arc<Governor>,
    attempts: AtomicU64,
}

impl<T: Transport> UpstreamClient<T> {
    pub fn new(transport: T, config: &AdapterConfig, governor: Arc<Governor>) -> Self {
        Self {
            transport,
            api_root: config.api_root(),
            authorization: config.credential.authorization_header(),
            request_timeout: config.request_timeout,
            retry: config.retry_policy(),
            governor,
            attempts: AtomicU64::new(0),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Total HTTP attempts made through this client.
    pub fn attempts_made(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Execute `request`, retrying transient failures until `deadline`.
    ///
    /// Returns the response for any non-retried status. Exhausting the attempt cap
    /// yields [`AdapterError::UpstreamRateLimited`], a non-retriable
    /// [`AdapterError::UpstreamServerError`] or a non-retriable
    /// [`AdapterError::TransportFailure`]. Running out of time before the cap leaves
    /// the last failure marked retriable.
    pub async fn execute(
        &self,
        mut request: UpstreamRequest,
        deadline: Instant,
    ) -> AdapterResult<UpstreamResponse> {
        request.set_header("Authorization", self.authorization.as_str());
        request.set_header("Accept", "application/json");
        if request.body.is_some() {
            request.set_header("Content-Type", "application/json");
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let permit = self.governor.acquire(deadline).await?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AdapterError::deadline_exceeded("upstream request"));
            }
            let timeout = self.request_timeout.min(remaining);

            self.attempts.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Upstream {} {} (attempt {}/{})",
                request.method, request.path, attempt, self.retry.max_attempts
            );
            let outcome = timeout_at(
                deadline,
                self.transport.send(&self.api_root, &request, timeout),
            )
            .await
            .map_err(|_| AdapterError::deadline_exceeded("upstream request"))?;
            self.governor.release(permit);

            let (failure, hint) = match outcome {
                Ok(response) => {
                    self.governor.record(&response.headers);
                    if response.is_success() || !self.retry.should_retry_status(response.status)
                    {
                        debug!(
                            "Upstream {} {} answered {}",
                            request.method, request.path, response.status
                        );
                        return Ok(response);
                    }
                    let hint = response.retry_after();
                    (Failure::Status(response), hint)
                }
                Err(error) => (Failure::Transport(error), None),
            };

            if attempt >= self.retry.max_attempts {
                warn!(
                    "Upstream {} {} failed after {} attempt(s): {}",
                    request.method,
                    request.path,
                    attempt,
                    failure.describe()
                );
                return Err(failure.into_error(attempt, false));
            }

            let delay = self.retry.next_delay(attempt, hint);
            if delay >= deadline.saturating_duration_since(Instant::now()) {
                warn!(
                    "Upstream {} {} not retried: backoff of {:?} exceeds deadline",
                    request.method, request.path, delay
                );
                return Err(failure.into_error(attempt, true));
            }
            warn!(
                "Upstream {} {} failed ({}), retrying in {:?}",
                request.method,
                request.path,
                failure.describe(),
                delay
            );
            sleep(delay).await;
        }
    }
}

enum Failure {
    Status(UpstreamResponse),
    Transport(TransportError),
}

impl Failure {
    fn describe(&self) -> String {
        match self {
            Failure::Status(response) => format!("HTTP {}", response.status),
            Failure::Transport(error) => error.to_string(),
        }
    }

    fn into_error(self, attempts: u32, retriable: bool) -> AdapterError {
        match self {
            Failure::Status(response) if response.status == 429 => {
                AdapterError::UpstreamRateLimited {
                    attempts,
                    retry_after: response.retry_after(),
                }
            }
            Failure::Status(response) => AdapterError::UpstreamServerError {
                status: response.status,
                attempts,
                retriable,
                body: Some(response.body).filter(|body| !body.is_null()),
            },
            Failure::Transport(error) => AdapterError::TransportFailure {
                message: error.to_string(),
                attempts,
                retriable,
            },
        }
    }
}
