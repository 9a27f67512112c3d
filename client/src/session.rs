//! Process-wide session context.
//!
//! Holds the bearer token attached to backend requests. The token can be
//! persisted to a file so a later process resumes the session. A 401 from the
//! backend tears the session down and publishes [`SessionEvent::LoginRequired`],
//! which is the signal to send the user back to the login screen.

use crate::error::ClientError;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::watch;

/// Session lifecycle signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// No token held
    SignedOut,
    /// A token is held and attached to requests
    Active,
    /// The backend rejected the token; the user has to log in again
    LoginRequired,
}

/// Bearer token holder shared by the HTTP adapter and the application
#[derive(Debug)]
pub struct Session {
    token: RwLock<Option<String>>,
    token_file: Option<PathBuf>,
    events: watch::Sender<SessionEvent>,
}

impl Session {
    /// Creates an empty session, optionally persisted at `token_file`
    #[must_use]
    pub fn new(token_file: Option<PathBuf>) -> Self {
        let (events, _) = watch::channel(SessionEvent::SignedOut);
        Self {
            token: RwLock::new(None),
            token_file,
            events,
        }
    }

    /// Creates a session that already holds `token`; nothing is persisted
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new(None);
        session.store(Some(token.into()));
        session
    }

    /// Path of the persisted token, if any
    #[must_use]
    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    /// Restores the persisted token.
    ///
    /// Returns `true` when a token was found. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TokenFile`] when the file exists but cannot be read.
    pub async fn load(&self) -> Result<bool, ClientError> {
        let Some(path) = &self.token_file else {
            return Ok(false);
        };
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(ClientError::TokenFile {
                    path: path.clone(),
                    source,
                });
            },
        };

        let token = raw.trim();
        if token.is_empty() {
            return Ok(false);
        }
        self.store(Some(token.to_string()));
        tracing::debug!(path = %path.display(), "Session restored");
        Ok(true)
    }

    /// Current token
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    /// Returns `true` while a token is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Stores a freshly issued token and persists it
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TokenFile`] when the token cannot be written.
    pub async fn set_token(&self, token: impl Into<String>) -> Result<(), ClientError> {
        let token = token.into();
        if let Some(path) = &self.token_file {
            tokio::fs::write(path, &token)
                .await
                .map_err(|source| ClientError::TokenFile {
                    path: path.clone(),
                    source,
                })?;
        }
        self.store(Some(token));
        Ok(())
    }

    /// Explicit logout
    pub async fn sign_out(&self) {
        self.teardown(SessionEvent::SignedOut).await;
    }

    /// Tears the session down after the backend rejected the token
    pub async fn invalidate(&self) {
        tracing::warn!("Session rejected by backend, login required");
        self.teardown(SessionEvent::LoginRequired).await;
    }

    /// Subscribes to session lifecycle changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Latest lifecycle signal
    #[must_use]
    pub fn status(&self) -> SessionEvent {
        *self.events.borrow()
    }

    async fn teardown(&self, event: SessionEvent) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        if let Some(path) = &self.token_file {
            if let Err(err) = tokio::fs::remove_file(path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to remove token file");
                }
            }
        }
        self.events.send_replace(event);
    }

    fn store(&self, token: Option<String>) {
        let event = if token.is_some() {
            SessionEvent::Active
        } else {
            SessionEvent::SignedOut
        };
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
        self.events.send_replace(event);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}
