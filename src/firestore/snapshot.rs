use super::models::Document;
use super::reference::{convert_fields_to_map, document_id};
use super::FirestoreError;
use crate::store::StoredDocument;

/// A document as read from Firestore, or the absence of one.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub(crate) id: String,
    pub(crate) document: Option<Document>,
}

impl DocumentSnapshot {
    pub(crate) fn from_document(document: Document) -> Self {
        Self {
            id: document_id(&document.name).to_string(),
            document: Some(document),
        }
    }

    pub(crate) fn missing(id: &str) -> Self {
        Self {
            id: id.to_string(),
            document: None,
        }
    }

    pub(crate) fn into_stored(self) -> Result<Option<StoredDocument>, FirestoreError> {
        match self.document {
            Some(doc) => Ok(Some(StoredDocument {
                id: self.id,
                fields: convert_fields_to_map(doc.fields)?,
            })),
            None => Ok(None),
        }
    }
}

/// The documents matched by one query run.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub(crate) documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub(crate) fn into_stored(self) -> Result<Vec<StoredDocument>, FirestoreError> {
        let mut stored = Vec::with_capacity(self.documents.len());
        for snapshot in self.documents {
            if let Some(doc) = snapshot.into_stored()? {
                stored.push(doc);
            }
        }
        Ok(stored)
    }
}
