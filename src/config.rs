//! Adapter configuration.
//!
//! Configuration is read once at startup from environment variables. Missing
//! tenant coordinates or credentials are fatal; every tuning knob has a default.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `FRESHSERVICE_DOMAIN` | required unless `FRESHSERVICE_BASE_URL` is set |
//! | `FRESHSERVICE_BASE_URL` | `https://{domain}` |
//! | `FRESHSERVICE_API_VERSION` | `v2` |
//! | `FRESHSERVICE_API_KEY` | required unless `FRESHSERVICE_BEARER_TOKEN` is set |
//! | `FRESHSERVICE_BEARER_TOKEN` | unset |
//! | `FRESHSERVICE_TIMEOUT_SECS` | `30` |
//! | `FRESHSERVICE_MAX_CONCURRENT` | `8` |
//! | `FRESHSERVICE_MAX_ATTEMPTS` | `5` |
//! | `FRESHSERVICE_RATE_LIMIT_PER_MINUTE` | `140` |
//! | `FRESHSERVICE_INVOCATION_TIMEOUT_SECS` | `120` |
//! | `FRESHSERVICE_MAX_PAGES` | `50` |
//! | `MCP_HOST` | `0.0.0.0` |
//! | `MCP_PORT` | `8000` |

use crate::error::{BuildError, BuildResult};
use crate::governor::GovernorConfig;
use crate::upstream::RetryPolicy;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_DOMAIN: &str = "FRESHSERVICE_DOMAIN";
pub const ENV_BASE_URL: &str = "FRESHSERVICE_BASE_URL";
pub const ENV_API_VERSION: &str = "FRESHSERVICE_API_VERSION";
pub const ENV_API_KEY: &str = "FRESHSERVICE_API_KEY";
pub const ENV_BEARER_TOKEN: &str = "FRESHSERVICE_BEARER_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "FRESHSERVICE_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENT: &str = "FRESHSERVICE_MAX_CONCURRENT";
pub const ENV_MAX_ATTEMPTS: &str = "FRESHSERVICE_MAX_ATTEMPTS";
pub const ENV_RATE_LIMIT: &str = "FRESHSERVICE_RATE_LIMIT_PER_MINUTE";
pub const ENV_INVOCATION_TIMEOUT_SECS: &str = "FRESHSERVICE_INVOCATION_TIMEOUT_SECS";
pub const ENV_MAX_PAGES: &str = "FRESHSERVICE_MAX_PAGES";
pub const ENV_HOST: &str = "MCP_HOST";
pub const ENV_PORT: &str = "MCP_PORT";

/// Upstream credential.
///
/// `Debug` output never contains the secret.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Freshservice API key, sent as HTTP Basic with `X` as the password
    ApiKey(String),
    /// Pre-issued bearer token
    Bearer(String),
}

impl Credential {
    /// Value of the `Authorization` header for this credential.
    pub fn authorization_header(&self) -> String {
        match self {
            Credential::ApiKey(key) => format!("Basic {}", STANDARD.encode(format!("{key}:X"))),
            Credential::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credential::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Complete adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Scheme and host of the tenant, e.g. `https://acme.freshservice.com`
    pub base_url: String,
    pub api_version: String,
    pub credential: Credential,
    /// Per-attempt upstream request timeout
    pub request_timeout: Duration,
    /// Concurrency Governor pool size
    pub max_concurrent_requests: usize,
    /// Attempt cap for retriable upstream failures, first attempt included
    pub max_attempts: u32,
    pub rate_limit_per_minute: u32,
    /// Deadline applied to invocations that do not carry their own
    pub invocation_timeout: Duration,
    /// Page cap for walks whose operation declares none
    pub max_pages: usize,
    pub listen_host: String,
    pub listen_port: u16,
}

impl AdapterConfig {
    /// Configuration with default tuning for the given tenant and credential.
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: "v2".to_string(),
            credential,
            request_timeout: Duration::from_secs(30),
            max_concurrent_requests: 8,
            max_attempts: 5,
            rate_limit_per_minute: 140,
            invocation_timeout: Duration::from_secs(120),
            max_pages: 50,
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8000,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> BuildResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use freshservice_mcp::config::AdapterConfig;
    /// use std::collections::HashMap;
    ///
    /// let env: HashMap<&str, &str> = [
    ///     ("FRESHSERVICE_DOMAIN", "acme.freshservice.com"),
    ///     ("FRESHSERVICE_API_KEY", "secret"),
    ///     ("FRESHSERVICE_MAX_CONCURRENT", "2"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let config = AdapterConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.api_root(), "https://acme.freshservice.com/api/v2");
    /// assert_eq!(config.max_concurrent_requests, 2);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> BuildResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_url = match (get(ENV_BASE_URL), get(ENV_DOMAIN)) {
            (Some(url), _) => url,
            (None, Some(domain)) => format!("https://{}", domain.trim_end_matches('/')),
            (None, None) => {
                return Err(BuildError::MissingConfiguration {
                    key: format!("{ENV_DOMAIN} or {ENV_BASE_URL}"),
                });
            }
        };
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BuildError::InvalidConfiguration {
                key: ENV_BASE_URL.to_string(),
                message: format!("'{base_url}' is not an http(s) URL"),
            });
        }

        let credential = match (get(ENV_API_KEY), get(ENV_BEARER_TOKEN)) {
            (Some(key), _) => Credential::ApiKey(key),
            (None, Some(token)) => Credential::Bearer(token),
            (None, None) => {
                return Err(BuildError::MissingCredential {
                    hint: format!("{ENV_API_KEY} or {ENV_BEARER_TOKEN}"),
                });
            }
        };

        let mut config = Self::new(base_url, credential);
        if let Some(version) = get(ENV_API_VERSION) {
            config.api_version = version;
        }
        if let Some(secs) = parse_positive::<u64>(ENV_TIMEOUT_SECS, get(ENV_TIMEOUT_SECS))? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(pool) = parse_positive::<usize>(ENV_MAX_CONCURRENT, get(ENV_MAX_CONCURRENT))? {
            config.max_concurrent_requests = pool;
        }
        if let Some(attempts) = parse_positive::<u32>(ENV_MAX_ATTEMPTS, get(ENV_MAX_ATTEMPTS))? {
            config.max_attempts = attempts;
        }
        if let Some(rate) = parse_positive::<u32>(ENV_RATE_LIMIT, get(ENV_RATE_LIMIT))? {
            config.rate_limit_per_minute = rate;
        }
        if let Some(secs) = parse_positive::<u64>(
            ENV_INVOCATION_TIMEOUT_SECS,
            get(ENV_INVOCATION_TIMEOUT_SECS),
        )? {
            config.invocation_timeout = Duration::from_secs(secs);
        }
        if let Some(pages) = parse_positive::<usize>(ENV_MAX_PAGES, get(ENV_MAX_PAGES))? {
            config.max_pages = pages;
        }
        if let Some(host) = get(ENV_HOST) {
            config.listen_host = host;
        }
        if let Some(port) = parse_positive::<u16>(ENV_PORT, get(ENV_PORT))? {
            config.listen_port = port;
        }

        Ok(config)
    }

    /// Root of the versioned REST API, e.g. `https://acme.freshservice.com/api/v2`.
    pub fn api_root(&self) -> String {
        format!("{}/api/{}", self.base_url, self.api_version)
    }

    /// Retry policy derived from the attempt cap.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_attempts)
    }

    /// Governor settings derived from pool size and rate budget.
    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig {
            max_concurrent: self.max_concurrent_requests,
            requests_per_window: self.rate_limit_per_minute,
            window: Duration::from_secs(60),
        }
    }
}

fn parse_positive<T>(key: &str, raw: Option<String>) -> BuildResult<Option<T>>
where
    T: FromStr + PartialEq + Default,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.parse::<T>().map_err(|_| BuildError::InvalidConfiguration {
        key: key.to_string(),
        message: format!("'{raw}' is not a valid number"),
    })?;
    if value == T::default() {
        return Err(BuildError::InvalidConfiguration {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(value))
}
