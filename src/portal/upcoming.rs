use super::models::UpcomingEvent;
use super::{decode_all, Portal, PortalError, UPCOMING};
use crate::store::{document_path, Fields, StoreQuery};
use tracing::error;

impl Portal {
    pub async fn add_upcoming_event(&self, fields: &Fields) -> Result<String, PortalError> {
        Ok(self.store.add(UPCOMING, fields.clone()).await.map_err(|e| {
            error!("adding upcoming event failed: {}", e);
            e
        })?)
    }

    pub async fn update_upcoming_event(&self, id: &str, fields: &Fields) -> Result<(), PortalError> {
        self.store
            .update(&document_path(UPCOMING, id), fields.clone())
            .await
            .map_err(|e| {
                error!(%id, "updating upcoming event failed: {}", e);
                e
            })?;
        Ok(())
    }

    pub async fn delete_upcoming_event(&self, id: &str) -> Result<(), PortalError> {
        self.store
            .delete(&document_path(UPCOMING, id))
            .await
            .map_err(|e| {
                error!(%id, "deleting upcoming event failed: {}", e);
                e
            })?;
        Ok(())
    }

    /// In store order.
    pub async fn get_upcoming_events(&self) -> Result<Vec<UpcomingEvent>, PortalError> {
        let documents = self.store.query(&StoreQuery::collection(UPCOMING)).await?;
        decode_all(documents)
    }
}
