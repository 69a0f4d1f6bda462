//! Endpoint configuration for the Conduit client.
//!
//! # Design
//! `EndpointConfig` is plain data owned by the embedding application. The
//! client reads it at the start of every call and never mutates it, so a
//! rotated token takes effect on the next call without rebuilding anything.
//! Missing fields are only reported when a call needs them.

use std::time::Duration;

use crate::error::ConduitError;

pub const ENV_BASE_URL: &str = "CONDUIT_BASE_URL";
pub const ENV_API_TOKEN: &str = "CONDUIT_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "CONDUIT_TIMEOUT_SECS";

/// Where to send calls and how to authenticate them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    /// Upper bound on a single round trip. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl EndpointConfig {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self {
            base_url: Some(base_url.to_string()),
            api_token: Some(api_token.to_string()),
            timeout: None,
        }
    }

    /// Read `CONDUIT_BASE_URL`, `CONDUIT_API_TOKEN` and
    /// `CONDUIT_TIMEOUT_SECS`. Unset variables leave the field empty; an
    /// unparsable timeout is ignored.
    pub fn from_env() -> Self {
        let timeout = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        Self {
            base_url: std::env::var(ENV_BASE_URL).ok(),
            api_token: std::env::var(ENV_API_TOKEN).ok(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn with_api_token(mut self, api_token: &str) -> Self {
        self.api_token = Some(api_token.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The base URL, or a `Configuration` error if it is unset or empty.
    pub fn require_base_url(&self) -> Result<&str, ConduitError> {
        non_empty(self.base_url.as_deref()).ok_or(ConduitError::Configuration { field: "base URL" })
    }

    /// The API token, or a `Configuration` error if it is unset or empty.
    pub fn require_api_token(&self) -> Result<&str, ConduitError> {
        non_empty(self.api_token.as_deref()).ok_or(ConduitError::Configuration { field: "API token" })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_nothing_set() {
        let config = EndpointConfig::default();
        assert!(matches!(
            config.require_base_url(),
            Err(ConduitError::Configuration { field: "base URL" })
        ));
        assert!(matches!(
            config.require_api_token(),
            Err(ConduitError::Configuration { field: "API token" })
        ));
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let config = EndpointConfig::new("", "  ");
        assert!(config.require_base_url().is_err());
        assert!(config.require_api_token().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let config = EndpointConfig::default()
            .with_base_url("https://phab.example.com")
            .with_api_token("api-abc")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.require_base_url().unwrap(), "https://phab.example.com");
        assert_eq!(config.require_api_token().unwrap(), "api-abc");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
