//! An in-process [`DocumentStore`].
//!
//! Documents live in a path-ordered map; every mutation bumps a version on a
//! `watch` channel and each live query re-evaluates itself against the whole
//! map, so listeners always receive complete result sets.

use super::{
    document_path, Direction, DocumentStore, Fields, SnapshotStream, StoreError, StoreQuery,
    StoredDocument,
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    documents: Mutex<BTreeMap<String, Fields>>,
    version: watch::Sender<u64>,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                documents: Mutex::new(BTreeMap::new()),
                version,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of documents currently held, across all collections.
    pub fn len(&self) -> usize {
        self.inner.documents().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Inner {
    fn documents(&self) -> Result<MutexGuard<'_, BTreeMap<String, Fields>>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn notify(&self) {
        self.version.send_modify(|version| *version += 1);
    }

    fn run_query(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError> {
        let prefix = format!("{}/", query.collection.trim_end_matches('/'));
        let documents = self.documents()?;

        let mut matches: Vec<StoredDocument> = documents
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, fields)| {
                let id = &path[prefix.len()..];
                if id.contains('/') {
                    return None;
                }
                let accepted = query
                    .filters
                    .iter()
                    .all(|filter| fields.get(&filter.field) == Some(&filter.value));
                accepted.then(|| StoredDocument {
                    id: id.to_string(),
                    fields: fields.clone(),
                })
            })
            .collect();

        if let Some(order) = &query.order_by {
            // Ordered queries only see documents that carry the ordering field.
            matches.retain(|doc| doc.fields.contains_key(&order.field));
            matches.sort_by(|a, b| {
                let ordering = compare_values(&a.fields[&order.field], &b.fields[&order.field]);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(matches)
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>, StoreError> {
        let documents = self.inner.documents()?;
        Ok(documents.get(path).map(|fields| StoredDocument {
            id: path.rsplit('/').next().unwrap_or_default().to_string(),
            fields: fields.clone(),
        }))
    }

    async fn set(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        self.inner.documents()?.insert(path.to_string(), fields);
        self.inner.notify();
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = format!(
            "mem{:08}",
            self.inner.next_id.fetch_add(1, AtomicOrdering::SeqCst)
        );
        self.inner
            .documents()?
            .insert(document_path(collection, &id), fields);
        self.inner.notify();
        Ok(id)
    }

    async fn update(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        {
            let mut documents = self.inner.documents()?;
            let existing = documents
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            existing.extend(fields);
        }
        self.inner.notify();
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.inner
            .documents()?
            .remove(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        self.inner.notify();
        Ok(())
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.run_query(query)
    }

    async fn listen(&self, query: &StoreQuery) -> Result<SnapshotStream, StoreError> {
        let receiver = self.inner.version.subscribe();
        let state = (self.inner.clone(), query.clone(), receiver, true);

        let snapshots = stream::unfold(state, |(inner, query, mut receiver, first)| async move {
            if first {
                let _ = receiver.borrow_and_update();
            } else if receiver.changed().await.is_err() {
                return None;
            }
            let snapshot = inner.run_query(&query);
            Some((snapshot, (inner, query, receiver, false)))
        });

        Ok(snapshots.boxed())
    }
}
