//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;
use crate::registration::drafts::DEFAULT_DEBOUNCE;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the registration backend (the progress source).
    pub api_base_url: String,
    /// Timeout for a single progress fetch.
    pub request_timeout: Duration,
    /// Debounce window for draft writes.
    pub draft_debounce: Duration,
    /// libSQL file backing the durable local cache.
    pub db_path: String,
    /// Port for the REST surface.
    pub port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout: Duration::from_secs(10),
            draft_debounce: DEFAULT_DEBOUNCE,
            db_path: "./data/registration.db".to_string(),
            port: 8080,
        }
    }
}

impl EngineConfig {
    /// Read configuration from `REGISTRATION_*` environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base_url = std::env::var("REGISTRATION_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let request_timeout = std::env::var("REGISTRATION_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let draft_debounce = std::env::var("REGISTRATION_DRAFT_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.draft_debounce);

        let db_path = std::env::var("REGISTRATION_DB_PATH").unwrap_or(defaults.db_path);

        let port = std::env::var("REGISTRATION_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        Self {
            api_base_url,
            request_timeout,
            draft_debounce,
            db_path,
            port,
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                key: "REGISTRATION_API_URL".to_string(),
                message: format!("expected an http(s) URL, got {:?}", self.api_base_url),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "REGISTRATION_REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
