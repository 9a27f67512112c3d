//! # Tourbook Client
//!
//! HTTP adapter for the Tourbook REST backend.
//!
//! - [`HttpBackend`]: reqwest implementation of [`tourbook_core::BookingApi`]
//! - [`Session`]: process-wide bearer token with file persistence and a
//!   login-required signal on 401
//! - [`ClientConfig`]: environment-driven settings
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourbook_client::{ClientConfig, HttpBackend, Session};
//!
//! # async fn run() -> Result<(), tourbook_client::ClientError> {
//! let config = ClientConfig::from_env();
//! let session = Arc::new(Session::new(config.token_file.clone()));
//! session.load().await?;
//! let backend = HttpBackend::new(&config, session)?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use auth::{AuthResponse, Credentials, Registration};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError};
pub use http::HttpBackend;
pub use session::{Session, SessionEvent};
