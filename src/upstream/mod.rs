//! Upstream Client: authenticated HTTP access to the Freshservice REST API.
//!
//! # Key Types
//!
//! - [`UpstreamClient`] - Retrying, governed executor for upstream requests
//! - [`Transport`] - Single-exchange HTTP seam, implemented by [`ReqwestTransport`]
//! - [`RetryPolicy`] - Exponential backoff schedule with jitter

pub mod client;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::UpstreamClient;
pub use retry::RetryPolicy;
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{HttpMethod, MAX_RETRY_AFTER, UpstreamRequest, UpstreamResponse, parse_retry_after};
