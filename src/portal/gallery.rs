use super::models::{iso_timestamp, GalleryImage};
use super::{decode_all, Portal, PortalError, GALLERY};
use crate::imgbb::ImageFile;
use crate::store::{document_path, Direction, Fields, StoreQuery};
use serde_json::Value;
use tracing::{error, info};

impl Portal {
    /// Uploads the image and stores `metadata` with `imageUrl` and the upload
    /// `timestamp`.
    pub async fn add_gallery_image(&self, metadata: &Fields, image: &ImageFile) -> Result<String, PortalError> {
        let url = self.images.upload(image).await.map_err(|e| {
            error!("gallery upload failed: {}", e);
            e
        })?;

        let mut entry = metadata.clone();
        entry.insert("imageUrl".to_string(), Value::String(url));
        entry.insert("timestamp".to_string(), Value::String(iso_timestamp()));

        let id = self.store.add(GALLERY, entry).await?;
        info!(%id, "added gallery image");
        Ok(id)
    }

    /// Updates the metadata, replacing the image only when a new file is given.
    pub async fn update_gallery_image(
        &self,
        id: &str,
        metadata: &Fields,
        image: Option<&ImageFile>,
    ) -> Result<(), PortalError> {
        let mut entry = metadata.clone();
        if let Some(image) = image {
            let url = self.images.upload(image).await?;
            entry.insert("imageUrl".to_string(), Value::String(url));
        }

        self.store.update(&document_path(GALLERY, id), entry).await?;
        Ok(())
    }

    pub async fn delete_gallery_image(&self, id: &str) -> Result<(), PortalError> {
        self.store.delete(&document_path(GALLERY, id)).await?;
        Ok(())
    }

    /// Newest first.
    pub async fn fetch_gallery_images(&self) -> Result<Vec<GalleryImage>, PortalError> {
        let query = StoreQuery::collection(GALLERY).order_by("timestamp", Direction::Descending);
        let documents = self.store.query(&query).await.map_err(|e| {
            error!("fetching gallery images failed: {}", e);
            e
        })?;
        decode_all(documents)
    }
}
