use super::models::Event;
use super::ordering::sort_events;
use super::subscription::Subscription;
use super::{decode_all, Portal, PortalError, EVENTS};
use crate::imgbb::ImageFile;
use crate::store::{Fields, StoreQuery};
use serde_json::Value;
use tracing::{error, info};

impl Portal {
    /// Uploads the poster, then stores the event with `mediaPath` set to its URL.
    ///
    /// Nothing is written when the upload fails.
    pub async fn create_event(&self, fields: &Fields, poster: &ImageFile) -> Result<String, PortalError> {
        let url = match self.images.upload(poster).await {
            Ok(url) => url,
            Err(e) => {
                error!("event poster upload failed: {}", e);
                return Err(e.into());
            }
        };

        let mut event = fields.clone();
        event.insert("mediaPath".to_string(), Value::String(url));

        let id = self.store.add(EVENTS, event).await?;
        info!(%id, "created event");
        Ok(id)
    }

    pub async fn delete_event(&self, id: &str) -> bool {
        self.delete_entity(EVENTS, id).await
    }

    /// Events of one society, most recent first, re-sent after every change.
    pub async fn subscribe_events_by_society(&self, society: &str) -> Result<Subscription<Event>, PortalError> {
        self.subscribe_events(StoreQuery::collection(EVENTS).where_eq("society", society))
            .await
    }

    pub async fn subscribe_all_events(&self) -> Result<Subscription<Event>, PortalError> {
        self.subscribe_events(StoreQuery::collection(EVENTS)).await
    }

    async fn subscribe_events(&self, query: StoreQuery) -> Result<Subscription<Event>, PortalError> {
        let snapshots = self.store.listen(&query).await?;
        Ok(Subscription::new(snapshots, |documents| {
            let mut events: Vec<Event> = decode_all(documents)?;
            sort_events(&mut events);
            Ok(events)
        }))
    }
}
