use super::models::{ArrayValue, Document, MapValue, Value, ValueType};
use super::snapshot::DocumentSnapshot;
use super::FirestoreError;
use crate::core::parse_error_response;
use crate::store::Fields;
use reqwest::{header, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::Error;
use serde::ser::Error as SerError;
use serde_json::map::Map;
use serde_json::Value as SerdeValue;
use std::collections::HashMap;
use url::Url;

// Helper to convert Firestore's value map to plain JSON fields
pub(crate) fn convert_fields_to_map(
    fields: HashMap<String, Value>,
) -> Result<Fields, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, convert_value_to_serde_value(value)?);
    }
    Ok(map)
}

pub(crate) fn convert_value_to_serde_value(value: Value) -> Result<SerdeValue, FirestoreError> {
    use serde_json::json;
    Ok(match value.value_type {
        ValueType::StringValue(s) => SerdeValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as Error>::custom(format!(
                    "Failed to parse integer string '{}': {}",
                    s, e
                ))
            })?;
            SerdeValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => SerdeValue::Number(
            serde_json::Number::from_f64(d).ok_or_else(|| {
                <serde_json::Error as Error>::custom(format!("Invalid f64 value: {}", d))
            })?,
        ),
        ValueType::BooleanValue(b) => SerdeValue::Bool(b),
        ValueType::MapValue(map_value) => SerdeValue::Object(convert_fields_to_map(map_value.fields)?),
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(convert_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?;
            SerdeValue::Array(values)
        }
        ValueType::NullValue(_) => SerdeValue::Null,
        ValueType::TimestampValue(s) => SerdeValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => SerdeValue::String(s),
        ValueType::ReferenceValue(s) => SerdeValue::String(s),
    })
}

pub(crate) fn convert_map_to_fields(fields: Fields) -> Result<HashMap<String, Value>, FirestoreError> {
    fields
        .into_iter()
        .map(|(k, v)| Ok((k, convert_serde_value_to_firestore_value(v)?)))
        .collect()
}

pub(crate) fn convert_serde_value_to_firestore_value(
    value: SerdeValue,
) -> Result<Value, FirestoreError> {
    let value_type = match value {
        SerdeValue::Null => ValueType::NullValue(()),
        SerdeValue::Bool(b) => ValueType::BooleanValue(b),
        SerdeValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirestoreError::SerializationError(SerError::custom(format!(
                    "Unsupported number type: {}",
                    n
                ))));
            }
        }
        SerdeValue::String(s) => ValueType::StringValue(s),
        SerdeValue::Array(a) => {
            let values = a
                .into_iter()
                .map(convert_serde_value_to_firestore_value)
                .collect::<Result<Vec<_>, _>>()?;
            ValueType::ArrayValue(ArrayValue { values })
        }
        SerdeValue::Object(o) => ValueType::MapValue(MapValue {
            fields: convert_map_to_fields(o)?,
        }),
    };
    Ok(Value { value_type })
}

/// The last path segment of a document resource name.
pub(crate) fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or_default()
}

/// Strips the API host and version from a documents URL, leaving the resource
/// name Firestore expects inside request bodies
/// (`projects/{p}/databases/{d}/documents/...`).
pub(crate) fn resource_name(url: &str) -> &str {
    url.find("projects/").map(|idx| &url[idx..]).unwrap_or(url)
}

async fn api_error(response: reqwest::Response, path: &str, action: &str) -> FirestoreError {
    if response.status() == StatusCode::NOT_FOUND {
        return FirestoreError::NotFound(path.to_string());
    }
    FirestoreError::ApiError(parse_error_response(response, action).await)
}

#[derive(Clone)]
pub struct DocumentReference {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) path: String,
}

impl DocumentReference {
    pub fn id(&self) -> &str {
        document_id(&self.path)
    }

    pub async fn get(&self) -> Result<DocumentSnapshot, FirestoreError> {
        let response = self.client.get(&self.path).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DocumentSnapshot::missing(self.id()));
        }

        if !response.status().is_success() {
            return Err(api_error(response, &self.path, "Get document failed").await);
        }

        let doc: Document = response.json().await?;
        Ok(DocumentSnapshot::from_document(doc))
    }

    /// Creates or overwrites the document.
    pub async fn set(&self, fields: Fields) -> Result<(), FirestoreError> {
        let body = serde_json::to_vec(&serde_json::json!({ "fields": convert_map_to_fields(fields)? }))?;

        let response = self
            .client
            .patch(&self.path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, &self.path, "Set document failed").await);
        }

        Ok(())
    }

    /// Writes only the supplied top-level fields of an existing document.
    pub async fn update(&self, fields: Fields) -> Result<(), FirestoreError> {
        let mut url = Url::parse(&self.path).map_err(|e| FirestoreError::ApiError(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for field in fields.keys() {
                query.append_pair("updateMask.fieldPaths", &quote_field_path(field));
            }
            query.append_pair("currentDocument.exists", "true");
        }

        let body = serde_json::to_vec(&serde_json::json!({ "fields": convert_map_to_fields(fields)? }))?;

        let response = self
            .client
            .patch(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, &self.path, "Update document failed").await);
        }

        Ok(())
    }

    /// Deletes the document, failing with `NotFound` when it is already gone.
    pub async fn delete(&self) -> Result<(), FirestoreError> {
        let response = self
            .client
            .delete(&self.path)
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, &self.path, "Delete document failed").await);
        }

        Ok(())
    }
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be backquoted in masks.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[derive(Clone)]
pub struct CollectionReference {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) path: String,
}

impl CollectionReference {
    pub fn doc(&self, document_id: &str) -> DocumentReference {
        DocumentReference {
            client: self.client.clone(),
            path: format!("{}/{}", self.path, document_id),
        }
    }

    /// Inserts a document with a server generated id and returns that id.
    pub async fn add(&self, fields: Fields) -> Result<String, FirestoreError> {
        let body = serde_json::to_vec(&serde_json::json!({ "fields": convert_map_to_fields(fields)? }))?;

        let response = self
            .client
            .post(&self.path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, &self.path, "Add document failed").await);
        }

        let doc: Document = response.json().await?;
        Ok(document_id(&doc.name).to_string())
    }
}
