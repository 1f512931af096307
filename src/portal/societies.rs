use super::models::{AppliedSocietyUpdate, SocietyProfile};
use super::{decode, to_fields, Portal, PortalError, SOCIETIES};
use crate::imgbb::MediaField;
use crate::store::{document_path, StoreQuery};
use tracing::{debug, error, info};

/// New content for a society page. Either image may be a new file or the URL
/// it already has.
#[derive(Debug, Clone)]
pub struct SocietyUpdate {
    pub about_text: String,
    pub background_image: MediaField,
    pub hero_image: MediaField,
}

impl Portal {
    /// Looks a society up by its code.
    ///
    /// No match is not an error: the empty profile (no id, every field `""`)
    /// comes back instead.
    pub async fn fetch_society_data(&self, code: &str) -> Result<SocietyProfile, PortalError> {
        let query = StoreQuery::collection(SOCIETIES).where_eq("society", code);
        let documents = self.store.query(&query).await.map_err(|e| {
            error!("fetching society data failed: {}", e);
            e
        })?;

        match documents.into_iter().next() {
            Some(document) => decode(document),
            None => {
                debug!(%code, "no matching society");
                Ok(SocietyProfile::default())
            }
        }
    }

    /// Looks a society up by document id. Unlike [`Portal::fetch_society_data`]
    /// a miss yields `None`.
    pub async fn fetch_society_data_by_id(&self, id: &str) -> Result<Option<SocietyProfile>, PortalError> {
        match self.store.get(&document_path(SOCIETIES, id)).await? {
            Some(document) => Ok(Some(decode(document)?)),
            None => {
                debug!(%id, "no society with this id");
                Ok(None)
            }
        }
    }

    /// Rewrites a society page, uploading whichever images are new files.
    pub async fn update_society_data(
        &self,
        code: &str,
        update: &SocietyUpdate,
    ) -> Result<AppliedSocietyUpdate, PortalError> {
        let query = StoreQuery::collection(SOCIETIES).where_eq("society", code);
        let Some(document) = self.store.query(&query).await?.into_iter().next() else {
            error!(%code, "update for unknown society");
            return Err(PortalError::NotFound(format!(
                "Society document does not exist for the given society code: {}",
                code
            )));
        };

        let applied = AppliedSocietyUpdate {
            about_text: update.about_text.clone(),
            background_image: update.background_image.resolve(self.images.as_ref()).await?,
            hero_image: update.hero_image.resolve(self.images.as_ref()).await?,
        };

        self.store
            .update(&document_path(SOCIETIES, &document.id), to_fields(&applied)?)
            .await?;
        info!(%code, id = %document.id, "updated society page");
        Ok(applied)
    }
}
