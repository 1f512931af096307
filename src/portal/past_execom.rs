use super::models::ExecomMember;
use super::{decode_all, Portal, PortalError, MEMBERS, PAST_EXECOM};
use crate::imgbb::MediaField;
use crate::store::{document_path, Fields, StoreQuery};
use serde_json::Value;
use tracing::{error, info};

fn members_collection(year: &str) -> String {
    format!("{}/{}/{}", PAST_EXECOM, year, MEMBERS)
}

impl Portal {
    /// The archived years, as document ids of `pastExecom`.
    pub async fn get_past_execom_years(&self) -> Result<Vec<String>, PortalError> {
        let documents = self
            .store
            .query(&StoreQuery::collection(PAST_EXECOM))
            .await
            .map_err(|e| {
                error!("fetching past execom years failed: {}", e);
                e
            })?;
        Ok(documents.into_iter().map(|document| document.id).collect())
    }

    /// Creates the empty marker document for `year`.
    pub async fn create_past_execom_year(&self, year: &str) -> Result<(), PortalError> {
        self.store
            .set(&document_path(PAST_EXECOM, year), Fields::new())
            .await
            .map_err(|e| {
                error!(%year, "creating past execom year failed: {}", e);
                e
            })?;
        info!(%year, "created past execom year");
        Ok(())
    }

    /// Adds a member under `year`. A new picture is uploaded and stored as
    /// `mediaPath`.
    pub async fn add_past_execom_member(
        &self,
        year: &str,
        fields: &Fields,
        picture: Option<&MediaField>,
    ) -> Result<String, PortalError> {
        let member = self.with_media_path(fields, picture).await?;
        let id = self.store.add(&members_collection(year), member).await?;
        info!(%year, %id, "added past execom member");
        Ok(id)
    }

    pub async fn update_past_execom_member(
        &self,
        year: &str,
        id: &str,
        fields: &Fields,
        picture: Option<&MediaField>,
    ) -> Result<(), PortalError> {
        let member = self.with_media_path(fields, picture).await?;
        self.store
            .update(&document_path(&members_collection(year), id), member)
            .await?;
        Ok(())
    }

    pub async fn delete_past_execom_member(&self, year: &str, id: &str) -> Result<(), PortalError> {
        self.store
            .delete(&document_path(&members_collection(year), id))
            .await?;
        Ok(())
    }

    pub async fn get_past_execom_members_by_year(&self, year: &str) -> Result<Vec<ExecomMember>, PortalError> {
        let documents = self
            .store
            .query(&StoreQuery::collection(members_collection(year)))
            .await
            .map_err(|e| {
                error!(%year, "fetching past execom members failed: {}", e);
                e
            })?;
        decode_all(documents)
    }

    async fn with_media_path(&self, fields: &Fields, picture: Option<&MediaField>) -> Result<Fields, PortalError> {
        let mut member = fields.clone();
        if let Some(picture) = picture {
            let url = picture.resolve(self.images.as_ref()).await?;
            member.insert("mediaPath".to_string(), Value::String(url));
        }
        Ok(member)
    }
}
