//! The document database as seen by the data access layer.
//!
//! [`DocumentStore`] is the seam between the portal and whatever actually holds
//! the documents: Cloud Firestore in production ([`crate::firestore`]) or the
//! in-process [`memory::MemoryStore`].

pub mod memory;

use futures::stream::BoxStream;
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

/// A stream of complete result sets, one per change to the matching documents.
pub type SnapshotStream = BoxStream<'static, Result<Vec<StoredDocument>, StoreError>>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Any other failure reported by the backing database.
    #[error("{0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A document read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
}

impl StoredDocument {
    /// The document's fields with its id folded in under `"id"`.
    pub fn into_object(self) -> Value {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Value::Object(fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EqualityFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A query over one collection: equality filters plus an optional ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    /// Slash separated collection path, e.g. `events` or `pastExecom/2024/members`.
    pub collection: String,
    pub filters: Vec<EqualityFilter>,
    pub order_by: Option<OrderBy>,
}

impl StoreQuery {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(EqualityFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Joins path segments into a document or collection path.
pub fn document_path(collection: &str, id: &str) -> String {
    format!("{}/{}", collection.trim_end_matches('/'), id)
}

/// CRUD, query and change-notification primitives of the document database.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document. A missing document is `Ok(None)`.
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Creates or overwrites the document at `path`.
    async fn set(&self, path: &str, fields: Fields) -> Result<(), StoreError>;

    /// Inserts a document with a generated id and returns that id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merges `fields` into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn update(&self, path: &str, fields: Fields) -> Result<(), StoreError>;

    /// Deletes an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError>;

    /// Opens a live query. The stream yields the full matching set first and
    /// again after every change, until it is dropped.
    async fn listen(&self, query: &StoreQuery) -> Result<SnapshotStream, StoreError>;
}
