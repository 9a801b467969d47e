//! Client configuration

use crate::realtime::ReconnectPolicy;
use crate::{ClientError, ClientResult};
use std::time::Duration;
use url::Url;

/// Deployment environment
///
/// Picks the log format and the stream endpoint. In development the stream
/// does not go through the dev server's reverse proxy, so it has to target
/// the backend directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse an environment name, defaulting to development
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Client configuration
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | RESCUE_API_BASE | (unset) | REST base; absolute URL, or relative when served behind the page's proxy |
/// | RESCUE_STREAM_BASE | (unset) | explicit stream base override |
/// | RESCUE_PAGE_ORIGIN | http://localhost:3000 | origin of the hosting page |
/// | RESCUE_ENV | development | development / production |
/// | RESCUE_REQUEST_TIMEOUT_SECS | 30 | HTTP request timeout |
/// | RESCUE_RECONNECT_DELAY_MS | 5000 | stream reconnect delay |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base address. Absolute (`https://api.example.org`) or relative
    /// (`/api`); relative means requests go through the page origin.
    pub api_base: Option<String>,

    /// Explicit stream base (`wss://rt.example.org`)
    pub stream_base: Option<String>,

    /// Origin of the page hosting the client
    pub page_origin: String,

    pub environment: Environment,

    /// Backend address the stream targets in development
    pub dev_stream_host: String,

    /// Request timeout; the refresh exchange relies on it too
    pub request_timeout: Duration,

    /// Stream reconnect policy
    pub reconnect: ReconnectPolicy,

    /// Capacity of the socket → merge queue
    pub stream_buffer: usize,
}

impl ClientConfig {
    /// Create a configuration with an explicit REST base
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: Some(api_base.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let reconnect = lookup("RESCUE_RECONNECT_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .map(|ms| ReconnectPolicy::fixed(Duration::from_millis(ms)))
            .unwrap_or(defaults.reconnect);

        Self {
            api_base: lookup("RESCUE_API_BASE").filter(|v| !v.trim().is_empty()),
            stream_base: lookup("RESCUE_STREAM_BASE").filter(|v| !v.trim().is_empty()),
            page_origin: lookup("RESCUE_PAGE_ORIGIN").unwrap_or(defaults.page_origin),
            environment: lookup("RESCUE_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
            dev_stream_host: defaults.dev_stream_host,
            request_timeout: lookup("RESCUE_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            reconnect,
            stream_buffer: defaults.stream_buffer,
        }
    }

    /// Set the explicit stream base
    pub fn with_stream_base(mut self, base: impl Into<String>) -> Self {
        self.stream_base = Some(base.into());
        self
    }

    /// Set the hosting page origin
    pub fn with_page_origin(mut self, origin: impl Into<String>) -> Self {
        self.page_origin = origin.into();
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the stream reconnect policy
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Absolute `api_base`, if one is configured
    pub fn absolute_api_base(&self) -> Option<&str> {
        self.api_base
            .as_deref()
            .map(str::trim)
            .filter(|base| base.starts_with("http://") || base.starts_with("https://"))
    }

    /// Base URL REST paths are appended to
    ///
    /// A relative or missing `api_base` resolves to the page origin: the
    /// page's reverse proxy forwards `/api/**` to the backend.
    pub fn rest_base_url(&self) -> ClientResult<Url> {
        let raw = self.absolute_api_base().unwrap_or(&self.page_origin);
        let url = Url::parse(raw)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::Config(format!(
                "REST base must be http(s), got scheme '{other}'"
            ))),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            stream_base: None,
            page_origin: "http://localhost:3000".to_string(),
            environment: Environment::Development,
            dev_stream_host: "127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
            stream_buffer: 256,
        }
    }
}
