//! Error types for tool invocation.
//!
//! Every failure an invocation can produce is an [`AdapterError`]. Each variant maps
//! to a stable [`ErrorKind`] code and carries an explicit retriable flag, so callers
//! decide whether to retry without parsing messages. Argument problems are described
//! by [`ValidationError`], and problems detected while assembling the adapter
//! (catalog, configuration, HTTP client) by [`BuildError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Main error type for tool invocations.
///
/// Upstream variants keep the HTTP status and the decoded response body where one
/// was available, so the error envelope can surface the upstream message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested operation name is not in the catalog
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    /// Arguments failed validation against the operation's schema
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// Upstream rejected the credential (401/403)
    #[error("Upstream rejected credentials (HTTP {status}): {message}")]
    UpstreamUnauthorized {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// Upstream reported the target resource does not exist
    #[error("Upstream resource not found: {message}")]
    UpstreamNotFound {
        message: String,
        body: Option<Value>,
    },

    /// Upstream rejected the request for any other client-side reason
    #[error("Upstream rejected request (HTTP {status}): {message}")]
    UpstreamRejected {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// Upstream kept answering 429 until attempts ran out
    #[error("Upstream rate limit exceeded after {attempts} attempt(s)")]
    UpstreamRateLimited {
        attempts: u32,
        retry_after: Option<Duration>,
    },

    /// Upstream kept failing with a 5xx status
    #[error("Upstream server error (HTTP {status}) after {attempts} attempt(s)")]
    UpstreamServerError {
        status: u16,
        attempts: u32,
        retriable: bool,
        body: Option<Value>,
    },

    /// No upstream permit became available before the invocation deadline
    #[error("Timed out after {waited:?} waiting for an upstream permit")]
    GovernorTimeout { waited: Duration },

    /// The invocation deadline elapsed while work was in progress
    #[error("Invocation deadline exceeded during {stage}")]
    DeadlineExceeded { stage: String },

    /// The request never produced an HTTP response
    #[error("Transport failure after {attempts} attempt(s): {message}")]
    TransportFailure {
        message: String,
        attempts: u32,
        retriable: bool,
    },

    /// Upstream answered with a body that does not match the declared response shape
    #[error("Invalid upstream response: {message}")]
    InvalidResponse { message: String },
}

/// Stable, machine-readable classification of an [`AdapterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UnknownOperation,
    InvalidArgument,
    UpstreamUnauthorized,
    UpstreamNotFound,
    UpstreamRejected,
    UpstreamRateLimited,
    UpstreamServerError,
    GovernorTimeout,
    DeadlineExceeded,
    TransportFailure,
    InvalidResponse,
}

impl ErrorKind {
    /// The code emitted in error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownOperation => "UNKNOWN_OPERATION",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::UpstreamUnauthorized => "UPSTREAM_UNAUTHORIZED",
            ErrorKind::UpstreamNotFound => "UPSTREAM_NOT_FOUND",
            ErrorKind::UpstreamRejected => "UPSTREAM_REJECTED",
            ErrorKind::UpstreamRateLimited => "UPSTREAM_RATE_LIMITED",
            ErrorKind::UpstreamServerError => "UPSTREAM_SERVER_ERROR",
            ErrorKind::GovernorTimeout => "GOVERNOR_TIMEOUT",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            ErrorKind::InvalidResponse => "INVALID_RESPONSE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument validation errors.
///
/// Field names of nested arguments use a dotted path, with array positions in
/// brackets (`assets[0].display_id`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Arguments were not a JSON object
    #[error("Arguments must be a JSON object, got {actual}")]
    NotAnObject { actual: String },

    /// Required argument is missing
    #[error("Required argument '{field}' is missing")]
    MissingRequired { field: String },

    /// Argument value doesn't match the declared type
    #[error("Argument '{field}' has invalid type, expected {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: String,
        actual: String,
    },

    /// Argument is not declared by the operation
    #[error("Unknown argument '{field}'")]
    UnknownField { field: String },

    /// Enumerated argument has a value outside its variants
    #[error("Argument '{field}' has invalid value '{value}', allowed values: {allowed:?}")]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Integer argument outside its declared bounds
    #[error("Argument '{field}' value {value} is out of range ({bounds})")]
    OutOfRange {
        field: String,
        value: i64,
        bounds: String,
    },

    /// Required string argument is empty or whitespace
    #[error("Argument '{field}' cannot be blank")]
    Blank { field: String },

    /// Date-time argument is not RFC 3339
    #[error("Argument '{field}' is not a valid RFC 3339 date-time: {value}")]
    InvalidDateTime { field: String, value: String },

    /// None of a group of alternative arguments was supplied
    #[error("At least one of {fields:?} must be provided")]
    AtLeastOneOf { fields: Vec<String> },
}

impl ValidationError {
    /// Create a missing required argument error
    pub fn missing_required(field: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// The offending argument path, when the error concerns a single argument.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingRequired { field }
            | ValidationError::InvalidType { field, .. }
            | ValidationError::UnknownField { field }
            | ValidationError::InvalidEnumValue { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Blank { field }
            | ValidationError::InvalidDateTime { field, .. } => Some(field),
            ValidationError::NotAnObject { .. } | ValidationError::AtLeastOneOf { .. } => None,
        }
    }
}

/// Errors raised while assembling the adapter.
///
/// These are fatal at startup and never reach an invocation.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Two catalog entries share a name
    #[error("Duplicate operation name in catalog: {name}")]
    DuplicateOperation { name: String },

    /// A catalog entry is internally inconsistent
    #[error("Invalid operation descriptor '{name}': {message}")]
    InvalidDescriptor { name: String, message: String },

    /// No credential was configured
    #[error("Missing required credential: set {hint}")]
    MissingCredential { hint: String },

    /// A required configuration value was not set
    #[error("Missing required configuration: {key}")]
    MissingConfiguration { key: String },

    /// A configuration value could not be used
    #[error("Invalid configuration for {key}: {message}")]
    InvalidConfiguration { key: String, message: String },

    /// The HTTP client could not be constructed
    #[error("Failed to construct HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl AdapterError {
    /// Create an unknown operation error
    pub fn unknown_operation(name: impl Into<String>) -> Self {
        Self::UnknownOperation { name: name.into() }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a deadline exceeded error
    pub fn deadline_exceeded(stage: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            stage: stage.into(),
        }
    }

    /// Stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::UnknownOperation { .. } => ErrorKind::UnknownOperation,
            AdapterError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AdapterError::UpstreamUnauthorized { .. } => ErrorKind::UpstreamUnauthorized,
            AdapterError::UpstreamNotFound { .. } => ErrorKind::UpstreamNotFound,
            AdapterError::UpstreamRejected { .. } => ErrorKind::UpstreamRejected,
            AdapterError::UpstreamRateLimited { .. } => ErrorKind::UpstreamRateLimited,
            AdapterError::UpstreamServerError { .. } => ErrorKind::UpstreamServerError,
            AdapterError::GovernorTimeout { .. } => ErrorKind::GovernorTimeout,
            AdapterError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            AdapterError::TransportFailure { .. } => ErrorKind::TransportFailure,
            AdapterError::InvalidResponse { .. } => ErrorKind::InvalidResponse,
        }
    }

    /// Whether the caller may usefully repeat the same invocation.
    ///
    /// Rate limiting and governor or deadline timeouts are always retriable. Server
    /// and transport failures are retriable only when the adapter stopped retrying
    /// before its attempt cap.
    pub fn is_retriable(&self) -> bool {
        match self {
            AdapterError::UpstreamRateLimited { .. }
            | AdapterError::GovernorTimeout { .. }
            | AdapterError::DeadlineExceeded { .. } => true,
            AdapterError::UpstreamServerError { retriable, .. }
            | AdapterError::TransportFailure { retriable, .. } => *retriable,
            AdapterError::UnknownOperation { .. }
            | AdapterError::InvalidArgument(_)
            | AdapterError::UpstreamUnauthorized { .. }
            | AdapterError::UpstreamNotFound { .. }
            | AdapterError::UpstreamRejected { .. }
            | AdapterError::InvalidResponse { .. } => false,
        }
    }

    /// HTTP status reported by upstream, if the error came from a response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AdapterError::UpstreamUnauthorized { status, .. }
            | AdapterError::UpstreamRejected { status, .. }
            | AdapterError::UpstreamServerError { status, .. } => Some(*status),
            AdapterError::UpstreamNotFound { .. } => Some(404),
            AdapterError::UpstreamRateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Decoded upstream response body, if one was captured.
    pub fn upstream_body(&self) -> Option<&Value> {
        match self {
            AdapterError::UpstreamUnauthorized { body, .. }
            | AdapterError::UpstreamNotFound { body, .. }
            | AdapterError::UpstreamRejected { body, .. }
            | AdapterError::UpstreamServerError { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

// Result type aliases for convenience
pub type AdapterResult<T> = Result<T, AdapterError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
