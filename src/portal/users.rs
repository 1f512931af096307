use super::models::{NewUser, User};
use super::{decode_all, to_fields, Portal, PortalError, USERS};
use crate::store::{document_path, Fields, StoreQuery};
use serde_json::Value;
use tracing::info;

impl Portal {
    pub async fn list_users(&self) -> Result<Vec<User>, PortalError> {
        let documents = self.store.query(&StoreQuery::collection(USERS)).await?;
        decode_all(documents)
    }

    pub async fn add_user(&self, user: &NewUser) -> Result<String, PortalError> {
        let id = self.store.add(USERS, to_fields(user)?).await?;
        info!(%id, email = %user.email, "added user");
        Ok(id)
    }

    pub async fn update_user_club(&self, id: &str, club: &str) -> Result<(), PortalError> {
        let mut fields = Fields::new();
        fields.insert("club".to_string(), Value::String(club.to_string()));
        self.store.update(&document_path(USERS, id), fields).await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> bool {
        self.delete_entity(USERS, id).await
    }
}
