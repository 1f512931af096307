use super::models::Person;
use super::ordering::sort_people;
use super::subscription::Subscription;
use super::{decode_all, Portal, PortalError, MEMBERS};
use crate::imgbb::ImageFile;
use crate::store::{Fields, StoreQuery};
use serde_json::Value;
use tracing::{error, info};

impl Portal {
    /// Uploads the picture, then stores the person with `mediaPath` set to its URL.
    pub async fn create_person(&self, fields: &Fields, picture: &ImageFile) -> Result<String, PortalError> {
        let url = match self.images.upload(picture).await {
            Ok(url) => url,
            Err(e) => {
                error!("member picture upload failed: {}", e);
                return Err(e.into());
            }
        };

        let mut person = fields.clone();
        person.insert("mediaPath".to_string(), Value::String(url));

        let id = self.store.add(MEMBERS, person).await?;
        info!(%id, "created member");
        Ok(id)
    }

    pub async fn delete_person(&self, id: &str) -> bool {
        self.delete_entity(MEMBERS, id).await
    }

    /// A society's execom in role order, re-sent after every change.
    pub async fn subscribe_people_by_society(&self, society: &str) -> Result<Subscription<Person>, PortalError> {
        let query = StoreQuery::collection(MEMBERS).where_eq("society", society);
        let snapshots = self.store.listen(&query).await?;
        Ok(Subscription::new(snapshots, |documents| {
            let mut people: Vec<Person> = decode_all(documents)?;
            sort_people(&mut people);
            Ok(people)
        }))
    }

    /// Every member of every society, in store order.
    pub async fn fetch_all_people(&self) -> Result<Vec<Person>, PortalError> {
        let documents = self.store.query(&StoreQuery::collection(MEMBERS)).await.map_err(|e| {
            error!("fetching all people failed: {}", e);
            e
        })?;
        decode_all(documents)
    }
}
