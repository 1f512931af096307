//! The portal's data access layer.
//!
//! [`Portal`] turns domain operations (create an event, list a society's
//! execom, update a society page) into calls on the three collaborators it is
//! built with: a [`DocumentStore`], an [`IdentityProvider`] and an
//! [`ImageHost`]. It owns no state besides the signed-in [`SessionStore`].
//!
//! Creates, updates and fetches propagate failures as [`PortalError`]. The
//! `delete_*` operations on events, people and users report a plain `bool`
//! instead.

pub mod models;
pub mod ordering;
pub mod subscription;

mod auth;
mod events;
mod gallery;
mod past_execom;
mod people;
mod societies;
mod upcoming;
mod users;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use self::auth::{Destination, OAuthOutcome};
pub use self::societies::SocietyUpdate;
pub use self::subscription::{ListenerHandle, Subscription};

use crate::auth::{AuthError, IdentityProvider};
use crate::config::DEFAULT_ALLOWED_EMAIL_DOMAIN;
use crate::imgbb::{ImageHost, UploadError};
use crate::session::{SessionError, SessionStore};
use crate::store::{document_path, DocumentStore, Fields, StoreError, StoredDocument};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub(crate) const USERS: &str = "users";
pub(crate) const EVENTS: &str = "events";
pub(crate) const MEMBERS: &str = "members";
pub(crate) const SOCIETIES: &str = "societies";
pub(crate) const PAST_EXECOM: &str = "pastExecom";
pub(crate) const GALLERY: &str = "gallery";
pub(crate) const UPCOMING: &str = "upcoming";

#[derive(Error, Debug)]
pub enum PortalError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("{0}")]
    NotFound(String),
    /// Any other failure of the document store or of session persistence.
    #[error("{0}")]
    Persistence(String),
}

impl From<StoreError> for PortalError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(path) => PortalError::NotFound(format!("Document not found: {}", path)),
            other => PortalError::Persistence(other.to_string()),
        }
    }
}

impl From<SessionError> for PortalError {
    fn from(error: SessionError) -> Self {
        PortalError::Persistence(error.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(error: serde_json::Error) -> Self {
        PortalError::Persistence(format!("Malformed document: {}", error))
    }
}

pub struct Portal {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    images: Arc<dyn ImageHost>,
    sessions: Arc<SessionStore>,
    allowed_domain: String,
}

impl Portal {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        images: Arc<dyn ImageHost>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            store,
            identity,
            images,
            sessions,
            allowed_domain: DEFAULT_ALLOWED_EMAIL_DOMAIN.to_string(),
        }
    }

    /// Restricts OAuth sign-up to addresses at `domain`.
    pub fn with_allowed_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_domain = domain.into();
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Deletes `collection/id`, reporting success instead of an error.
    ///
    /// A document that is already gone counts as a failure, so deleting the
    /// same id twice yields `true` then `false`.
    pub async fn delete_entity(&self, collection: &str, id: &str) -> bool {
        let path = document_path(collection, id);
        match self.store.delete(&path).await {
            Ok(()) => {
                debug!(%path, "deleted document");
                true
            }
            Err(e) => {
                warn!(%path, "delete failed: {}", e);
                false
            }
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(document: StoredDocument) -> Result<T, PortalError> {
    Ok(serde_json::from_value(document.into_object())?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(documents: Vec<StoredDocument>) -> Result<Vec<T>, PortalError> {
    documents.into_iter().map(decode).collect()
}

pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Fields, PortalError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(fields) => Ok(fields),
        _ => Err(PortalError::Persistence("Expected an object".to_string())),
    }
}
