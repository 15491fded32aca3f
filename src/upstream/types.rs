//! Request and response values exchanged with the upstream API.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Longest `Retry-After` honoured; larger hints are clamped to it.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// HTTP methods used by catalog operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// A concrete upstream request, relative to the API root.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    /// Path below the API root, already substituted and percent-encoded
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_query(param, value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a query parameter, replacing any previous value.
    pub fn set_query(&mut self, param: impl Into<String>, value: impl Into<String>) {
        let param = param.into();
        let value = value.into();
        match self.query.iter_mut().find(|(name, _)| *name == param) {
            Some(entry) => entry.1 = value,
            None => self.query.push((param, value)),
        }
    }

    pub fn query_value(&self, param: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any previous value (names compare case-insensitively).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Absolute URL below `api_root`, with the query string percent-encoded.
    pub fn url(&self, api_root: &str) -> String {
        let mut url = format!("{}{}", api_root.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            let query = self
                .query
                .iter()
                .map(|(name, value)| {
                    format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
                })
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

/// A decoded upstream response.
///
/// Header names are stored lowercase. An empty body decodes to `null`; a body that
/// is not JSON is kept as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// Decode a raw body.
    pub fn decode_body(bytes: &[u8]) -> Value {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Value::Null;
        }
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `Retry-After` hint, clamped to [`MAX_RETRY_AFTER`].
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|value| parse_retry_after(value, Utc::now()))
    }

    /// Whether a `Link` header advertises a `rel="next"` page.
    pub fn has_next_link(&self) -> bool {
        self.header("link").is_some_and(|link| {
            link.split(',').any(|part| {
                part.split(';')
                    .skip(1)
                    .any(|param| matches!(param.trim(), "rel=\"next\"" | "rel=next"))
            })
        })
    }

    /// Best human-readable message in an error body.
    ///
    /// Freshservice error bodies carry `description` or `message`, and validation
    /// failures list per-field `errors`.
    pub fn error_message(&self) -> String {
        let body = &self.body;
        let headline = body
            .get("message")
            .or_else(|| body.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| body.as_str().map(|text| text.trim().to_string()))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", self.status));

        let details: Vec<String> = body
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|error| {
                        let message = error.get("message").and_then(Value::as_str)?;
                        Some(match error.get("field").and_then(Value::as_str) {
                            Some(field) => format!("{field}: {message}"),
                            None => message.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if details.is_empty() {
            headline
        } else {
            format!("{headline} ({})", details.join("; "))
        }
    }
}

/// Parse a `Retry-After` value given as delay-seconds or as an HTTP-date.
///
/// Dates in the past yield a zero delay. Unparseable values yield `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    let delay = match value.parse::<u64>() {
        Ok(seconds) => Duration::from_secs(seconds.min(MAX_RETRY_AFTER.as_secs())),
        Err(_) => {
            let date = DateTime::parse_from_rfc2822(value).ok()?;
            (date.with_timezone(&Utc) - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
        }
    };
    Some(delay.min(MAX_RETRY_AFTER))
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
