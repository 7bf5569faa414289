//! Client configuration: endpoints, timeout, login entry point.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/predictions";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOGIN_PATH: &str = "/login";

pub const ENV_BASE_URL: &str = "SEVERITY_API_URL";
pub const ENV_WS_URL: &str = "SEVERITY_WS_URL";
pub const ENV_TIMEOUT_SECS: &str = "SEVERITY_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:8000/api/v1` (no trailing slash).
    pub base_url: String,
    /// Streaming endpoint.
    pub ws_url: String,
    /// Per-call cutoff covering connect, send, and body read.
    pub timeout: Duration,
    /// Where an expired session should send the user.
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `SEVERITY_API_URL`, `SEVERITY_WS_URL`, and
    /// `SEVERITY_TIMEOUT_SECS` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_BASE_URL) {
            config = config.with_base_url(url);
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            config.ws_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Timeout(raw.clone()))?;
            if secs == 0 {
                return Err(ConfigError::Timeout(raw));
            }
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
