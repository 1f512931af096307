use super::listen::{listen_request, ListenStream};
use super::models::{
    CollectionSelector, CompositeFilter, CompositeOperator, Direction, FieldFilter, FieldOperator,
    FieldReference, FilterType, ListenRequest, Order, QueryFilter, QueryTarget, RunQueryRequest,
    RunQueryResponse, StructuredQuery, Target,
};
use super::reference::{convert_serde_value_to_firestore_value, resource_name};
use super::snapshot::{DocumentSnapshot, QuerySnapshot};
use super::FirestoreError;
use crate::core::parse_error_response;
use crate::store::{self, StoreQuery};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;

/// Target id used for the single target each listen stream registers.
pub(crate) const LISTEN_TARGET_ID: i32 = 1;

/// A definition of a Firestore query, including the target collection and filters.
///
/// The collection may be nested (`pastExecom/2024/members`); the part before the
/// last segment becomes the query's parent document.
#[derive(Clone, Debug)]
pub struct Query {
    pub(crate) parent: Option<String>,
    pub(crate) query: StructuredQuery,
}

impl Query {
    /// Creates a new `Query` targeting the specified collection path.
    pub fn new(collection_path: &str) -> Self {
        let collection_path = collection_path.trim_matches('/');
        let (parent, collection_id) = match collection_path.rsplit_once('/') {
            Some((parent, id)) => (Some(parent.to_string()), id.to_string()),
            None => (None, collection_path.to_string()),
        };

        Self {
            parent,
            query: StructuredQuery {
                from: Some(vec![CollectionSelector {
                    collection_id,
                    all_descendants: None,
                }]),
                where_clause: None,
                order_by: None,
            },
        }
    }

    /// Translates a store-level query.
    pub fn from_store_query(query: &StoreQuery) -> Result<Self, FirestoreError> {
        let mut built = Self::new(&query.collection);
        for filter in &query.filters {
            built = built.where_eq(&filter.field, &filter.value)?;
        }
        if let Some(order) = &query.order_by {
            let direction = match order.direction {
                store::Direction::Ascending => Direction::Ascending,
                store::Direction::Descending => Direction::Descending,
            };
            built = built.order_by(&order.field, direction);
        }
        Ok(built)
    }

    /// Adds an equality filter. Several filters are combined with AND.
    pub fn where_eq<T: Serialize>(mut self, field: &str, value: T) -> Result<Self, FirestoreError> {
        let serde_value = serde_json::to_value(value)?;
        let firestore_value = convert_serde_value_to_firestore_value(serde_value)?;

        let filter = QueryFilter {
            filter_type: FilterType::FieldFilter(FieldFilter {
                field: FieldReference {
                    field_path: field.to_string(),
                },
                op: FieldOperator::Equal,
                value: firestore_value,
            }),
        };

        self.query.where_clause = Some(match self.query.where_clause.take() {
            None => filter,
            Some(QueryFilter {
                filter_type: FilterType::CompositeFilter(mut composite),
            }) if composite.op == CompositeOperator::And => {
                composite.filters.push(filter);
                QueryFilter {
                    filter_type: FilterType::CompositeFilter(composite),
                }
            }
            Some(existing) => QueryFilter {
                filter_type: FilterType::CompositeFilter(CompositeFilter {
                    op: CompositeOperator::And,
                    filters: vec![existing, filter],
                }),
            },
        });

        Ok(self)
    }

    /// Sorts the query results by the specified field.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        let order = Order {
            field: FieldReference {
                field_path: field.to_string(),
            },
            direction,
        };

        self.query.order_by.get_or_insert_with(Vec::new).push(order);
        self
    }
}

/// A `Query` attached to a Firestore client, ready for execution.
#[derive(Clone)]
pub struct ExecutableQuery {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) base_url: String,
    pub(crate) query: Query,
}

impl ExecutableQuery {
    pub(crate) fn new(client: ClientWithMiddleware, base_url: String, query: Query) -> Self {
        Self {
            client,
            base_url,
            query,
        }
    }

    /// URL of the document (or database root) the query runs under.
    fn parent_url(&self) -> String {
        match &self.query.parent {
            Some(parent) => format!("{}/{}", self.base_url, parent),
            None => self.base_url.clone(),
        }
    }

    /// Executes the query and returns the results as a `QuerySnapshot`.
    pub async fn get(&self) -> Result<QuerySnapshot, FirestoreError> {
        let url = format!("{}:runQuery", self.parent_url());

        let request = RunQueryRequest {
            structured_query: self.query.query.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Run query failed").await,
            ));
        }

        let responses: Vec<RunQueryResponse> = response.json().await?;

        let documents = responses
            .into_iter()
            .filter_map(|res| res.document)
            .map(DocumentSnapshot::from_document)
            .collect();

        Ok(QuerySnapshot { documents })
    }

    /// Opens a listen stream for the query results.
    pub async fn listen(&self) -> Result<ListenStream, FirestoreError> {
        let request = ListenRequest {
            add_target: Target {
                query: QueryTarget {
                    parent: resource_name(&self.parent_url()).to_string(),
                    structured_query: self.query.query.clone(),
                },
                target_id: LISTEN_TARGET_ID,
            },
        };

        listen_request(&self.client, &self.base_url, &request).await
    }
}
