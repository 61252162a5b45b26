//! Configuration for the Nextcloud connection.
//!
//! Supports loading configuration from:
//! - Explicit values (`TalkConfig::new`)
//! - Environment variables (`TalkConfig::from_env`)

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ShareError, ShareResult};
use crate::http_client::DEFAULT_TIMEOUT;

const ENV_URL: &str = "NEXTCLOUD_URL";
const ENV_USER: &str = "NEXTCLOUD_USER";
const ENV_APP_PASSWORD: &str = "NEXTCLOUD_APP_PASSWORD";
const ENV_TIMEOUT_SECS: &str = "NEXTCLOUD_TIMEOUT_SECS";

/// Connection settings for a Nextcloud instance.
#[derive(Clone)]
pub struct TalkConfig {
    /// Base URL of the instance (e.g. `https://cloud.example.com`).
    base_url: Url,
    /// Login name, also used as the chat actor and WebDAV home.
    user: String,
    /// App password used for HTTP basic auth.
    app_password: SecretString,
    /// Per-request timeout.
    timeout: Duration,
}

impl std::fmt::Debug for TalkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TalkConfig")
            .field("base_url", &self.base_url.as_str())
            .field("user", &self.user)
            .field("app_password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TalkConfig {
    /// Create a new configuration.
    ///
    /// Fails if `base_url` is not a valid absolute URL.
    pub fn new(
        base_url: &str,
        user: impl Into<String>,
        app_password: impl Into<String>,
    ) -> ShareResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;

        Ok(Self {
            base_url,
            user: user.into(),
            app_password: SecretString::new(app_password.into().into()),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `NEXTCLOUD_URL`
    /// - `NEXTCLOUD_USER`
    /// - `NEXTCLOUD_APP_PASSWORD`
    ///
    /// Optional variables:
    /// - `NEXTCLOUD_TIMEOUT_SECS`
    pub fn from_env() -> ShareResult<Self> {
        let base_url = std::env::var(ENV_URL)
            .map_err(|_| ShareError::Config(format!("{} not set", ENV_URL)))?;

        let user = std::env::var(ENV_USER)
            .map_err(|_| ShareError::Config(format!("{} not set", ENV_USER)))?;

        let app_password = std::env::var(ENV_APP_PASSWORD)
            .map_err(|_| ShareError::Config(format!("{} not set", ENV_APP_PASSWORD)))?;

        let mut config = Self::new(&base_url, user, app_password)?;

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config = config.with_timeout(Duration::from_secs(secs)),
                _ => warn!("Ignoring invalid {}={:?}", ENV_TIMEOUT_SECS, raw),
            }
        }

        if config.base_url.scheme() == "http" {
            warn!("Nextcloud URL uses plain http, credentials are sent unencrypted");
        }

        debug!("Loaded Nextcloud config from environment");
        Ok(config)
    }

    /// Base URL of the instance.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Login name.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// App password.
    pub fn app_password(&self) -> &str {
        self.app_password.expose_secret()
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ShareResult<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ShareError::Config(format!(
                "Unsupported URL scheme '{}', expected http or https",
                self.base_url.scheme()
            )));
        }
        if self.base_url.host_str().is_none() {
            return Err(ShareError::Config("Base URL has no host".to_string()));
        }
        if self.user.is_empty() {
            return Err(ShareError::Config("User is empty".to_string()));
        }
        if self.app_password.expose_secret().is_empty() {
            return Err(ShareError::Config("App password is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ShareError::Config("Timeout must be non-zero".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::remove_var(ENV_URL);
            std::env::remove_var(ENV_USER);
            std::env::remove_var(ENV_APP_PASSWORD);
            std::env::remove_var(ENV_TIMEOUT_SECS);
        }
    }

    #[test]
    fn test_config_new() {
        let config = TalkConfig::new("https://cloud.example.com/", "alice", "app-pass").unwrap();

        assert_eq!(config.base_url().as_str(), "https://cloud.example.com/");
        assert_eq!(config.user(), "alice");
        assert_eq!(config.app_password(), "app-pass");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_invalid_url() {
        let result = TalkConfig::new("not a url", "alice", "app-pass");
        assert!(matches!(result, Err(ShareError::Config(_))));
    }

    #[test]
    fn test_config_validate() {
        let config = TalkConfig::new("ftp://cloud.example.com", "alice", "pw").unwrap();
        assert!(config.validate().is_err());

        let config = TalkConfig::new("https://cloud.example.com", "", "pw").unwrap();
        assert!(config.validate().is_err());

        let config = TalkConfig::new("https://cloud.example.com", "alice", "").unwrap();
        assert!(config.validate().is_err());

        let config = TalkConfig::new("https://cloud.example.com", "alice", "pw")
            .unwrap()
            .with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_debug_redacts_password() {
        let config = TalkConfig::new("https://cloud.example.com", "alice", "super-secret").unwrap();

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("alice"));
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        // SAFETY: serialized with the other environment tests.
        unsafe {
            std::env::set_var(ENV_URL, "https://cloud.example.com");
            std::env::set_var(ENV_USER, "bob");
            std::env::set_var(ENV_APP_PASSWORD, "pw");
            std::env::set_var(ENV_TIMEOUT_SECS, "7");
        }

        let config = TalkConfig::from_env().unwrap();
        assert_eq!(config.user(), "bob");
        assert_eq!(config.timeout(), Duration::from_secs(7));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_from_env_missing() {
        clear_env();

        let err = TalkConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_URL));
    }
}
