//! ImgBB image hosting.
//!
//! Every image the portal persists goes through an [`ImageHost`] first and only
//! the public URL it returns is stored. [`MediaField`] captures the "file or
//! already-hosted URL" choice that update forms hand over.

pub mod models;

use self::models::UploadResponse;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error};

#[cfg(test)]
mod tests;

const IMGBB_UPLOAD_API: &str = "https://api.imgbb.com/1/upload";
const DEFAULT_FAILURE: &str = "Failed to upload image to ImgBB";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("ImgBB API key is not configured")]
    MissingApiKey,
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// The host answered but did not accept the image.
    #[error("{0}")]
    Rejected(String),
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// A binary image waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    /// Wraps in-memory bytes, inferring the content type from the file extension.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// An image field as submitted by a form: either a new file or a URL that is
/// already hosted.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaField {
    Url(String),
    File(ImageFile),
}

impl MediaField {
    /// Returns the URL to persist, uploading only when this is a new file.
    pub async fn resolve(&self, host: &dyn ImageHost) -> Result<String, UploadError> {
        match self {
            MediaField::Url(url) => Ok(url.clone()),
            MediaField::File(file) => host.upload(file).await,
        }
    }
}

impl From<ImageFile> for MediaField {
    fn from(file: ImageFile) -> Self {
        MediaField::File(file)
    }
}

impl From<String> for MediaField {
    fn from(url: String) -> Self {
        MediaField::Url(url)
    }
}

impl From<&str> for MediaField {
    fn from(url: &str) -> Self {
        MediaField::Url(url.to_string())
    }
}

/// Accepts one image and returns its public URL.
#[async_trait::async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &ImageFile) -> Result<String, UploadError>;
}

#[derive(Clone)]
pub struct ImgBbClient {
    client: ClientWithMiddleware,
    endpoint: String,
    api_key: Option<String>,
}

impl ImgBbClient {
    /// Creates a client. Without a key every upload fails with
    /// [`UploadError::MissingApiKey`].
    pub fn new(api_key: Option<String>) -> Self {
        Self::new_with_endpoint(api_key, IMGBB_UPLOAD_API.to_string())
    }

    /// Multipart bodies are not replayable, so no retry middleware is attached.
    pub fn new_with_endpoint(api_key: Option<String>, endpoint: String) -> Self {
        let client = ClientBuilder::new(Client::new()).build();
        Self {
            client,
            endpoint,
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl ImageHost for ImgBbClient {
    async fn upload(&self, image: &ImageFile) -> Result<String, UploadError> {
        let api_key = self.api_key.as_deref().ok_or(UploadError::MissingApiKey)?;

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new().part("image", part).text("key", api_key.to_string());

        debug!(file = %image.file_name, size = image.bytes.len(), "uploading image");
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        // ImgBB reports failures in the same envelope, with or without an error status.
        let envelope = match response.json::<UploadResponse>().await {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("unreadable ImgBB response: {}", e);
                return Err(UploadError::Rejected(DEFAULT_FAILURE.to_string()));
            }
        };

        match envelope.into_url() {
            Ok(url) => Ok(url),
            Err(message) => {
                error!("ImgBB rejected upload: {}", message);
                Err(UploadError::Rejected(message))
            }
        }
    }
}
