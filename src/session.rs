//! Signed-in session credentials and their persistence.
//!
//! A [`SessionStore`] keeps the current [`Session`] in memory and, when
//! configured with a file, mirrors it to disk so a restarted process picks the
//! session back up.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Errors raised while reading or writing the persisted session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An opaque credential returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the ID token has expired (with a one minute margin).
    pub fn is_expired(&self) -> bool {
        self.expires_at - Duration::seconds(60) <= Utc::now()
    }
}

pub struct SessionStore {
    current: RwLock<Option<Session>>,
    file: Option<PathBuf>,
}

impl SessionStore {
    /// A store that only lives as long as the process.
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            file: None,
        }
    }

    /// A store mirrored to `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            current: RwLock::new(None),
            file: Some(path.into()),
        }
    }

    /// Reads the persisted session, if any, into memory.
    pub async fn load(&self) -> Result<Option<Session>, SessionError> {
        let Some(path) = &self.file else {
            return Ok(self.current().await);
        };

        let session = match tokio::fs::read(path).await {
            Ok(bytes) => Some(serde_json::from_slice::<Session>(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), found = session.is_some(), "loaded persisted session");
        *self.current.write().await = session.clone();
        Ok(session)
    }

    pub async fn persist(&self, session: Session) -> Result<(), SessionError> {
        if let Some(path) = &self.file {
            tokio::fs::write(path, serde_json::to_vec(&session)?).await?;
        }
        *self.current.write().await = Some(session);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        *self.current.write().await = None;
        if let Some(path) = &self.file {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn id_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.id_token.clone())
    }
}
