//! Live, cancellable views over a store query.

use super::PortalError;
use crate::store::{SnapshotStream, StoredDocument};
use futures::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The full, ordered result set after every change to a live query.
///
/// The underlying listener lives exactly as long as this value: dropping it,
/// or calling [`Subscription::cancel`], closes the listen stream.
pub struct Subscription<T> {
    inner: BoxStream<'static, Result<Vec<T>, PortalError>>,
}

impl<T: Send + 'static> Subscription<T> {
    pub(crate) fn new<F>(snapshots: SnapshotStream, mut prepare: F) -> Self
    where
        F: FnMut(Vec<StoredDocument>) -> Result<Vec<T>, PortalError> + Send + 'static,
    {
        let inner = snapshots
            .map(move |snapshot| match snapshot {
                Ok(documents) => prepare(documents),
                Err(e) => {
                    warn!("subscription error: {}", e);
                    Err(PortalError::from(e))
                }
            })
            .boxed();
        Self { inner }
    }

    /// Stops listening.
    pub fn cancel(self) {
        debug!("subscription cancelled");
    }

    /// Drives the subscription on a background task, handing every result set
    /// to `callback`.
    pub fn spawn<F>(self, mut callback: F) -> ListenerHandle
    where
        F: FnMut(Result<Vec<T>, PortalError>) + Send + 'static,
    {
        let mut stream = self;
        let task = tokio::spawn(async move {
            while let Some(update) = stream.next().await {
                callback(update);
            }
        });
        ListenerHandle { task }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Result<Vec<T>, PortalError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Owns a spawned subscription. Dropping the handle stops it.
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Whether the listener has stopped on its own, e.g. because the store
    /// closed the stream.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
