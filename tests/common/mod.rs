//! Common test utilities for dispatcher and transport testing.
//!
//! [`ScriptedTransport`] stands in for the network: it answers from per-path
//! scripts and records every request with start and end timestamps, so tests can
//! assert call counts, ordering and overlap without any I/O.

#![allow(dead_code)]

use freshservice_mcp::config::{AdapterConfig, Credential};
use freshservice_mcp::dispatcher::Dispatcher;
use freshservice_mcp::upstream::{
    HttpMethod, Transport, TransportError, UpstreamRequest, UpstreamResponse,
};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};

pub const BASE_URL: &str = "https://acme.freshservice.com";

/// One request as seen by the transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub started: Instant,
    /// Unset when the call was abandoned mid-flight
    pub finished: Option<Instant>,
}

impl RecordedCall {
    pub fn query_value(&self, param: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Scripted outcome of one exchange.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(UpstreamResponse),
    Fail(TransportError),
}

impl From<UpstreamResponse> for Reply {
    fn from(response: UpstreamResponse) -> Self {
        Reply::Respond(response)
    }
}

/// In-memory transport answering from scripts keyed by request path.
///
/// Replies for a path are consumed in order; the last one repeats.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time each exchange takes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a reply for requests to `path`.
    pub fn on(self, path: &str, reply: impl Into<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply.into());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self, path: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .get_mut(path)
            .unwrap_or_else(|| panic!("no scripted reply for {path}"));
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(
        &self,
        _api_root: &str,
        request: &UpstreamRequest,
        _timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                method: request.method,
                path: request.path.clone(),
                query: request.query.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
                started: Instant::now(),
                finished: None,
            });
            calls.len() - 1
        };

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let reply = self.next_reply(&request.path);
        self.calls.lock().unwrap()[index].finished = Some(Instant::now());

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }
}

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Default configuration against the test tenant.
pub fn test_config() -> AdapterConfig {
    AdapterConfig::new(BASE_URL, Credential::ApiKey("test-api-key".to_string()))
}

pub fn dispatcher(transport: ScriptedTransport) -> Dispatcher<ScriptedTransport> {
    dispatcher_with(test_config(), transport)
}

pub fn dispatcher_with(
    config: AdapterConfig,
    transport: ScriptedTransport,
) -> Dispatcher<ScriptedTransport> {
    init_logging();
    Dispatcher::from_config(&config, transport).expect("Failed to build dispatcher")
}

pub fn ok(body: Value) -> UpstreamResponse {
    UpstreamResponse::new(200, body)
}

pub fn status(code: u16) -> UpstreamResponse {
    UpstreamResponse::new(code, json!({"message": format!("status {code}")}))
}

/// A page of `key` items with ids `ids`, linking to a next page when `more`.
pub fn page(key: &str, ids: &[u64], more: bool) -> UpstreamResponse {
    let items: Vec<Value> = ids.iter().map(|id| json!({"id": id, "name": format!("item {id}")})).collect();
    let response = ok(json!({ key: items }));
    if more {
        response.with_header("Link", "<https://acme.freshservice.com/api/v2/next>; rel=\"next\"")
    } else {
        response
    }
}
