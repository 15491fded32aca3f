//! The HTTP seam between the upstream client and the network.
//!
//! [`Transport`] performs exactly one HTTP exchange per call. Retries, rate
//! governance and error classification live in [`UpstreamClient`](super::UpstreamClient),
//! so tests substitute a scripted transport without touching any of that logic.

use super::types::{UpstreamRequest, UpstreamResponse};
use crate::error::{BuildError, BuildResult};
use std::future::Future;
use std::time::Duration;

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Performs a single HTTP exchange.
pub trait Transport: Send + Sync {
    /// Send `request` below `api_root`, giving up after `timeout`.
    fn send(
        &self,
        api_root: &str,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<UpstreamResponse, TransportError>> + Send;
}

/// Production transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> BuildResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("freshservice-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BuildError::HttpClient)?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing client, e.g. one configured with a proxy.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(
        &self,
        api_root: &str,
        request: &UpstreamRequest,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url(api_root))
            .timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| classify(error, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| classify(error, timeout))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body: UpstreamResponse::decode_body(&bytes),
        })
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}
