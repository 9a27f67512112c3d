//! Client configuration.
//!
//! Loaded from environment variables with defaults matching the development
//! backend.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8082";

/// HTTP adapter and store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash
    pub base_url: String,
    /// Fixed per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Where the session token is persisted between runs
    pub token_file: Option<PathBuf>,
    /// Capacity of the store action broadcast
    pub broadcast_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            token_file: None,
            broadcast_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; unset or unparsable values use defaults
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            base_url: lookup("TOURBOOK_API_BASE_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.base_url),
            request_timeout_secs: lookup("TOURBOOK_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            token_file: lookup("TOURBOOK_TOKEN_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            broadcast_capacity: lookup("TOURBOOK_BROADCAST_CAPACITY")
                .and_then(|s| s.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.broadcast_capacity),
        }
    }

    /// Request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks the values a client cannot work without
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-http base URL or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
