//! Client configuration

use std::time::Duration;

use crate::labelers::AcceptLabelers;

/// Public AppView that serves unauthenticated queries.
pub const DEFAULT_SERVICE_URL: &str = "https://public.api.bsky.app";

/// Configuration for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone)]
pub struct XrpcClientConfig {
    /// Base URL of the service; `/xrpc/<method>` is appended
    pub service_url: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub user_agent: String,
    /// Sent on every request, before per-request headers
    pub default_headers: Vec<(String, String)>,
    /// Used when a request does not carry its own accept-labelers value
    pub accept_labelers: Option<AcceptLabelers>,
}

impl Default for XrpcClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("atproto-xrpc/{}", env!("CARGO_PKG_VERSION")),
            default_headers: Vec::new(),
            accept_labelers: None,
        }
    }
}

impl XrpcClientConfig {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Default::default()
        }
    }

    /// Load from `XRPC_SERVICE_URL`, `XRPC_TIMEOUT_SECS` and
    /// `XRPC_USER_AGENT`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_url: std::env::var("XRPC_SERVICE_URL").unwrap_or(defaults.service_url),
            timeout: std::env::var("XRPC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            user_agent: std::env::var("XRPC_USER_AGENT").unwrap_or(defaults.user_agent),
            ..defaults
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_accept_labelers(mut self, labelers: AcceptLabelers) -> Self {
        self.accept_labelers = Some(labelers);
        self
    }

    /// Endpoint for one method.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url.trim_end_matches('/'), method)
    }
}
