//! Cloud Firestore module.
//!
//! A REST client for Cloud Firestore that backs the portal's
//! [`DocumentStore`]. It exposes collection and document references, a query
//! builder, and real-time listening.
//!
//! # Real-time Updates
//!
//! `ExecutableQuery::listen()` opens a `documents:listen` stream of raw
//! `ListenResponse` messages; `ListenStream::snapshots()` folds them into the
//! complete result set every time the server reports a consistent view.

pub mod listen;
pub mod models;
pub mod query;
pub mod reference;
pub mod snapshot;


use self::query::{ExecutableQuery, Query};
use self::reference::{CollectionReference, DocumentReference};
use crate::auth::IdentityProvider;
use crate::core::middleware::SessionMiddleware;
use crate::session::SessionStore;
use crate::store::{DocumentStore, Fields, SnapshotStream, StoreError, StoreQuery, StoredDocument};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::sync::Arc;
use thiserror::Error;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// The addressed document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<FirestoreError> for StoreError {
    fn from(error: FirestoreError) -> Self {
        match error {
            FirestoreError::NotFound(path) => StoreError::NotFound(path),
            FirestoreError::SerializationError(e) => StoreError::Serialization(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Client for interacting with Cloud Firestore.
#[derive(Clone)]
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseFirestore {
    /// Creates a client for `project_id` that authenticates as the signed-in user,
    /// refreshing the session through `identity` once it expires.
    pub fn new(
        project_id: &str,
        sessions: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let base_url = FIRESTORE_V1_API.replace("{project_id}", project_id);
        Self::new_with_url(sessions, identity, base_url)
    }

    /// Creates a new `FirebaseFirestore` instance with a custom base URL (useful for the emulator).
    pub fn new_with_url(
        sessions: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        base_url: String,
    ) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(SessionMiddleware::new(sessions, identity))
            .build();

        Self { client, base_url }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Gets a `CollectionReference` for a (possibly nested) collection path.
    pub fn collection(&self, collection_path: &str) -> CollectionReference {
        CollectionReference {
            client: self.client.clone(),
            path: format!("{}/{}", self.base_url, collection_path.trim_matches('/')),
        }
    }

    /// Gets a `DocumentReference` for a slash-separated document path (e.g. "users/user1").
    pub fn doc(&self, document_path: &str) -> DocumentReference {
        DocumentReference {
            client: self.client.clone(),
            path: format!("{}/{}", self.base_url, document_path.trim_matches('/')),
        }
    }

    /// Attaches a query definition to this client, ready for execution.
    pub fn prepare(&self, query: Query) -> ExecutableQuery {
        ExecutableQuery::new(self.client.clone(), self.base_url.clone(), query)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirebaseFirestore {
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.doc(path).get().await?.into_stored()?)
    }

    async fn set(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        Ok(self.doc(path).set(fields).await?)
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        Ok(self.collection(collection).add(fields).await?)
    }

    async fn update(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        Ok(self.doc(path).update(fields).await?)
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        Ok(self.doc(path).delete().await?)
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError> {
        let query = self.prepare(Query::from_store_query(query)?);
        Ok(query.get().await?.into_stored()?)
    }

    async fn listen(&self, query: &StoreQuery) -> Result<SnapshotStream, StoreError> {
        let query = self.prepare(Query::from_store_query(query)?);
        Ok(query.listen().await?.snapshots())
    }
}
