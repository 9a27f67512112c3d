//! Error types for the HTTP adapter

use std::path::PathBuf;
use thiserror::Error;
use tourbook_core::ApiError;

/// Invalid client configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL is not an http(s) URL
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The request timeout must be at least one second
    #[error("Request timeout must be at least 1 second")]
    ZeroTimeout,
}

/// Errors raised while setting up or operating the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// Reading or writing the persisted token failed
    #[error("Token file {}: {source}", path.display())]
    TokenFile {
        /// Token file path
        path: PathBuf,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The backend rejected the request
    #[error(transparent)]
    Api(#[from] ApiError),
}
