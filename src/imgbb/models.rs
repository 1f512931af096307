use serde::Deserialize;

/// The JSON envelope ImgBB wraps every answer in.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<UploadData>,
    pub error: Option<UploadErrorBody>,
    pub status: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct UploadData {
    pub id: Option<String>,
    pub url: Option<String>,
    pub display_url: Option<String>,
    pub delete_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadErrorBody {
    pub message: Option<String>,
    pub code: Option<u16>,
}

impl UploadResponse {
    /// The hosted URL, or the message to report.
    pub(crate) fn into_url(self) -> Result<String, String> {
        if self.success {
            if let Some(url) = self.data.and_then(|data| data.url) {
                return Ok(url);
            }
        }
        Err(self
            .error
            .and_then(|error| error.message)
            .unwrap_or_else(|| super::DEFAULT_FAILURE.to_string()))
    }
}
