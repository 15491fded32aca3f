//! Result and error envelopes returned for every invocation.

use crate::error::{AdapterError, ErrorKind};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Bookkeeping attached to every envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationMetadata {
    pub operation: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_fetched: Option<usize>,
    /// Set when a walk stopped at its page cap with more data upstream
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    pub elapsed_ms: u64,
}

impl InvocationMetadata {
    pub fn new(operation: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            request_id: request_id.into(),
            item_count: None,
            pages_fetched: None,
            truncated: false,
            elapsed_ms: 0,
        }
    }
}

/// Successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub data: Value,
    /// Page to request next in single-page mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u64>,
    pub metadata: InvocationMetadata,
}

/// Failed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub kind: ErrorKind,
    pub message: String,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub metadata: InvocationMetadata,
}

impl ErrorEnvelope {
    /// Describe `error`, surfacing the offending field or upstream status and body.
    pub fn from_error(error: &AdapterError, metadata: InvocationMetadata) -> Self {
        let mut details = Map::new();
        if let AdapterError::InvalidArgument(validation) = error {
            if let Some(field) = validation.field() {
                details.insert("field".into(), json!(field));
            }
        }
        if let Some(status) = error.upstream_status() {
            details.insert("status".into(), json!(status));
        }
        if let Some(body) = error.upstream_body() {
            details.insert("upstream_body".into(), body.clone());
        }
        if let AdapterError::UpstreamRateLimited {
            retry_after: Some(delay),
            ..
        } = error
        {
            details.insert("retry_after_secs".into(), json!(delay.as_secs()));
        }

        Self {
            success: false,
            kind: error.kind(),
            message: error.to_string(),
            retriable: error.is_retriable(),
            details: (!details.is_empty()).then_some(Value::Object(details)),
            metadata,
        }
    }

    /// Attach items relayed before a walk failed.
    pub fn with_partial_items(mut self, items: Vec<Value>) -> Self {
        let mut details = match self.details.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        details.insert("partial_item_count".into(), json!(items.len()));
        details.insert("partial_items".into(), Value::Array(items));
        self.details = Some(Value::Object(details));
        self
    }
}

/// Outcome of a single invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success(ResultEnvelope),
    Failure(ErrorEnvelope),
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn metadata(&self) -> &InvocationMetadata {
        match self {
            Envelope::Success(result) => &result.metadata,
            Envelope::Failure(error) => &error.metadata,
        }
    }

    pub fn as_result(&self) -> Option<&ResultEnvelope> {
        match self {
            Envelope::Success(result) => Some(result),
            Envelope::Failure(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Envelope::Success(_) => None,
            Envelope::Failure(error) => Some(error),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|error| {
            json!({
                "success": false,
                "kind": ErrorKind::InvalidResponse,
                "message": format!("envelope serialization failed: {error}"),
                "retriable": false,
            })
        })
    }
}
