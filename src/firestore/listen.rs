use super::models::{Document, ListenRequest, ListenResponse, TargetChangeType};
use super::query::LISTEN_TARGET_ID;
use super::reference::{convert_fields_to_map, document_id};
use super::FirestoreError;
use crate::core::parse_error_response;
use crate::store::{SnapshotStream, StoredDocument};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// A stream of `ListenResponse` messages.
///
/// The HTTP binding delivers them as one long JSON array, so array brackets and
/// separating commas between messages are skipped.
pub struct ListenStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: BytesMut,
}

impl ListenStream {
    pub fn new(inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
        }
    }

    /// Folds the raw messages into complete result sets.
    pub fn snapshots(self) -> SnapshotStream {
        stream::unfold(
            (self, WatchState::default(), false),
            |(mut messages, mut state, failed)| async move {
                if failed {
                    return None;
                }
                loop {
                    let outcome = match messages.next().await? {
                        Ok(message) => state.apply(message),
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(Some(snapshot)) => return Some((Ok(snapshot), (messages, state, false))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e.into()), (messages, state, true))),
                    }
                }
            },
        )
        .boxed()
    }
}

impl Stream for ListenStream {
    type Item = Result<ListenResponse, FirestoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // 1. Drop separators, then try to parse a complete JSON object.
            let skip = skip_separators(&self.buffer);
            if skip > 0 {
                let _ = self.buffer.split_to(skip);
            }

            if let Some(len) = find_json_boundary(&self.buffer) {
                let bytes = self.buffer.split_to(len);
                return match serde_json::from_slice::<ListenResponse>(&bytes) {
                    Ok(msg) => Poll::Ready(Some(Ok(msg))),
                    Err(e) => Poll::Ready(Some(Err(FirestoreError::SerializationError(e)))),
                };
            }

            // 2. If no complete object, poll the underlying stream for more bytes.
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    self.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(FirestoreError::RequestError(e))));
                }
                Poll::Ready(None) => {
                    if !self.buffer.is_empty() {
                        return Poll::Ready(Some(Err(FirestoreError::ApiError(
                            "Stream ended with incomplete JSON".into(),
                        ))));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn skip_separators(buf: &[u8]) -> usize {
    buf.iter()
        .take_while(|b| b.is_ascii_whitespace() || matches!(b, b'[' | b']' | b','))
        .count()
}

/// Finds the length of the JSON object at the start of the buffer.
fn find_json_boundary(buf: &[u8]) -> Option<usize> {
    if buf.first() != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// The client-side view of one listen target.
#[derive(Default)]
struct WatchState {
    documents: BTreeMap<String, Document>,
    current: bool,
    dirty: bool,
    emitted: bool,
}

impl WatchState {
    /// Applies one message, returning a snapshot once the view is consistent.
    fn apply(&mut self, message: ListenResponse) -> Result<Option<Vec<StoredDocument>>, FirestoreError> {
        if let Some(change) = message.document_change {
            if change.target_ids.contains(&LISTEN_TARGET_ID) {
                self.documents.insert(change.document.name.clone(), change.document);
            } else if change.removed_target_ids.contains(&LISTEN_TARGET_ID) {
                self.documents.remove(&change.document.name);
            }
            self.dirty = true;
        }

        if let Some(delete) = message.document_delete {
            self.documents.remove(&delete.document);
            self.dirty = true;
        }

        if let Some(remove) = message.document_remove {
            self.documents.remove(&remove.document);
            self.dirty = true;
        }

        if let Some(filter) = message.filter {
            if filter.count as usize != self.documents.len() {
                debug!(
                    expected = filter.count,
                    held = self.documents.len(),
                    "listen existence filter mismatch"
                );
            }
        }

        let Some(change) = message.target_change else {
            return Ok(None);
        };

        match change.target_change_type {
            TargetChangeType::Add => Ok(None),
            TargetChangeType::Remove => {
                let reason = change
                    .cause
                    .map(|status| format!("{} (code: {})", status.message, status.code))
                    .unwrap_or_else(|| "target removed by server".to_string());
                Err(FirestoreError::ApiError(format!("Listen target removed: {}", reason)))
            }
            TargetChangeType::Current => {
                if change.target_ids.is_empty() || change.target_ids.contains(&LISTEN_TARGET_ID) {
                    self.current = true;
                }
                Ok(None)
            }
            TargetChangeType::Reset => {
                self.documents.clear();
                self.dirty = true;
                Ok(None)
            }
            TargetChangeType::NoChange => {
                let global = change.target_ids.is_empty();
                if global && self.current && (self.dirty || !self.emitted) {
                    self.dirty = false;
                    self.emitted = true;
                    Ok(Some(self.snapshot()?))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn snapshot(&self) -> Result<Vec<StoredDocument>, FirestoreError> {
        self.documents
            .values()
            .map(|doc| {
                Ok(StoredDocument {
                    id: document_id(&doc.name).to_string(),
                    fields: convert_fields_to_map(doc.fields.clone())?,
                })
            })
            .collect()
    }
}

pub async fn listen_request(
    client: &ClientWithMiddleware,
    base_url: &str,
    request: &ListenRequest,
) -> Result<ListenStream, FirestoreError> {
    // base_url points at ".../databases/{d}/documents"; the listen method hangs off it.
    let url = format!("{}:listen", base_url);

    let response = client.post(&url).json(request).send().await?;

    if !response.status().is_success() {
        return Err(FirestoreError::ApiError(
            parse_error_response(response, "Listen failed").await,
        ));
    }

    // Use unfold to create a stream from response.chunk()
    let stream = stream::unfold(response, |mut resp| async move {
        match resp.chunk().await {
            Ok(Some(bytes)) => Some((Ok(bytes), resp)),
            Ok(None) => None,
            Err(e) => Some((Err(e), resp)),
        }
    });

    Ok(ListenStream::new(Box::pin(stream)))
}
