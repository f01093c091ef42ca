//! Configuration management for kuma-pages

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Suite configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the deployment under test
    pub base_url: String,

    /// Locale segment used in page paths
    pub locale: String,

    /// CDP endpoint of an already running Chrome
    pub cdp_endpoint: String,

    /// Bound for every page/element wait in milliseconds
    pub wait_timeout_ms: u64,

    /// Poll interval for waits in milliseconds
    pub poll_interval_ms: u64,

    /// Timeout for status and link-check requests in milliseconds
    pub http_timeout_ms: u64,

    /// Viewport width applied to every new session
    pub viewport_width: u32,

    /// Viewport height applied to every new session
    pub viewport_height: u32,

    /// Path of the status document, relative to `base_url`
    pub status_path: String,

    /// Host that result links carry and that is replaced by `base_url`
    pub link_host: String,

    /// Marker expression selecting scenarios (e.g. "smoke and not flaky")
    pub markers: Option<String>,

    /// Number of scenarios run concurrently, each on its own session
    pub workers: usize,

    /// Directory receiving screenshots and page sources of failures
    pub artifacts_dir: Option<String>,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            locale: "en-US".to_string(),
            cdp_endpoint: "ws://localhost:9222".to_string(),
            wait_timeout_ms: 10000,
            poll_interval_ms: 100,
            http_timeout_ms: 30000,
            viewport_width: 1280,
            viewport_height: 1024,
            status_path: "/_kuma_status.json".to_string(),
            link_host: "http://localhost:8000".to_string(),
            markers: None,
            workers: 1,
            artifacts_dir: None,
            log_level: "info".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: String) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::configuration(format!("Invalid {}", name)))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(base_url) = env::var("KUMA_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(locale) = env::var("KUMA_LOCALE") {
            config.locale = locale;
        }

        if let Ok(endpoint) = env::var("KUMA_CDP_ENDPOINT") {
            config.cdp_endpoint = endpoint;
        }

        if let Ok(timeout) = env::var("KUMA_WAIT_TIMEOUT_MS") {
            config.wait_timeout_ms = parse_var("KUMA_WAIT_TIMEOUT_MS", timeout)?;
        }

        if let Ok(interval) = env::var("KUMA_POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_var("KUMA_POLL_INTERVAL_MS", interval)?;
        }

        if let Ok(timeout) = env::var("KUMA_HTTP_TIMEOUT_MS") {
            config.http_timeout_ms = parse_var("KUMA_HTTP_TIMEOUT_MS", timeout)?;
        }

        if let Ok(width) = env::var("KUMA_VIEWPORT_WIDTH") {
            config.viewport_width = parse_var("KUMA_VIEWPORT_WIDTH", width)?;
        }

        if let Ok(height) = env::var("KUMA_VIEWPORT_HEIGHT") {
            config.viewport_height = parse_var("KUMA_VIEWPORT_HEIGHT", height)?;
        }

        if let Ok(path) = env::var("KUMA_STATUS_PATH") {
            config.status_path = path;
        }

        if let Ok(host) = env::var("KUMA_LINK_HOST") {
            config.link_host = host;
        }

        if let Ok(markers) = env::var("KUMA_MARKERS") {
            if !markers.trim().is_empty() {
                config.markers = Some(markers);
            }
        }

        if let Ok(workers) = env::var("KUMA_WORKERS") {
            config.workers = parse_var("KUMA_WORKERS", workers)?;
        }

        if let Ok(dir) = env::var("KUMA_ARTIFACTS_DIR") {
            config.artifacts_dir = Some(dir);
        }

        if let Ok(log_level) = env::var("KUMA_LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::configuration(format!(
                "base_url must be an http(s) address, got {}",
                self.base_url
            )));
        }
        if self.workers == 0 {
            return Err(Error::configuration("workers must be at least 1"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.wait_timeout_ms {
            return Err(Error::configuration(
                "poll_interval_ms must be non-zero and not exceed wait_timeout_ms",
            ));
        }
        Ok(())
    }

    /// Wait bound as a duration
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// HTTP request timeout as a duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wait_timeout(), Duration::from_secs(10));
        assert_eq!(config.status_path, "/_kuma_status.json");
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            base_url = "https://developer.allizom.org"
            markers = "smoke and not flaky"
            workers = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://developer.allizom.org");
        assert_eq!(config.markers.as_deref(), Some("smoke and not flaky"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.locale, "en-US");
    }

    #[test]
    fn test_from_toml_rejects_bad_base_url() {
        let err = Config::from_toml(r#"base_url = "localhost:8000""#).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_from_toml_rejects_zero_workers() {
        assert!(Config::from_toml("workers = 0").is_err());
    }
}
