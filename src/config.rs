//! Client configuration.
//!
//! The only external setting is the endpoint base URL, read from
//! `CITYFEED_GRPC_HOST`. Everything else has a compiled-in default.

use reqwest::Url;

use crate::error::{FeedError, Result};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Environment variable holding the endpoint base URL.
pub const BASE_URL_ENV: &str = "CITYFEED_GRPC_HOST";

/// Base URL used when the environment does not provide one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Configuration shared by every session a client opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme, host and port, without a trailing slash.
    pub base_url: String,
    /// Largest payload a single frame may declare.
    pub max_payload_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl ClientConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::InvalidConfig` if `CITYFEED_GRPC_HOST` is set to
    /// something other than an http(s) URL.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        match lookup(BASE_URL_ENV) {
            Some(url) if !url.trim().is_empty() => {
                config = config.base_url(url.trim());
                tracing::debug!("Using base URL {} from {}", config.base_url, BASE_URL_ENV);
            }
            _ => tracing::debug!("{} not set, using {}", BASE_URL_ENV, DEFAULT_BASE_URL),
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the base URL. Trailing slashes are trimmed.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = url.as_ref().trim_end_matches('/').to_string();
        self
    }

    /// Set the maximum frame payload size.
    pub fn max_payload_size(mut self, limit: u32) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::InvalidConfig` for a base URL that does not parse
    /// (bad host characters, out-of-range port), a non-http(s) scheme, a base
    /// URL with no host, or a zero payload limit.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            FeedError::InvalidConfig(format!("invalid base URL {:?}: {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FeedError::InvalidConfig(format!(
                "base URL must use http or https, got {:?}",
                self.base_url
            )));
        }
        if url.host().is_none() {
            return Err(FeedError::InvalidConfig("base URL has no host".into()));
        }
        if self.max_payload_size == 0 {
            return Err(FeedError::InvalidConfig(
                "max payload size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_unset_falls_back() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        let config = ClientConfig::from_lookup(|_| Some("   ".into())).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_lookup_trims_trailing_slash() {
        let config = ClientConfig::from_lookup(|key| {
            assert_eq!(key, BASE_URL_ENV);
            Some("https://feeds.example.org:8443//".into())
        })
        .unwrap();
        assert_eq!(config.base_url, "https://feeds.example.org:8443");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = ClientConfig::from_lookup(|_| Some("ftp://10.1.0.2".into())).unwrap_err();
        assert!(err.to_string().contains("http or https"));

        for url in ["http://", "http://exa mple:8080", "http://host:99999", "localhost:8080/x"] {
            let err = ClientConfig::from_lookup(|_| Some(url.into())).unwrap_err();
            assert!(matches!(err, FeedError::InvalidConfig(_)), "{url} accepted");
        }

        assert!(ClientConfig::default().base_url("http://").validate().is_err());
    }

    #[test]
    fn test_accepts_host_port_and_ip() {
        for url in ["http://10.0.0.7:9090", "https://feeds.example.org", "http://[::1]:8080"] {
            assert!(ClientConfig::from_lookup(|_| Some(url.into())).is_ok(), "{url} rejected");
        }
    }

    #[test]
    fn test_rejects_zero_payload_limit() {
        assert!(ClientConfig::default().max_payload_size(0).validate().is_err());
    }
}
