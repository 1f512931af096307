use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_ALLOWED_EMAIL_DOMAIN: &str = "sahrdaya.ac.in";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),
}

/// Static configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Web API key of the Firebase project.
    pub firebase_api_key: String,
    pub project_id: String,
    /// Uploads fail with `UploadError::MissingApiKey` while this is unset.
    pub imgbb_api_key: Option<String>,
    /// Only identities with an address in this domain may sign up through OAuth.
    pub allowed_email_domain: String,
    /// Where the signed-in session is persisted. `None` keeps it in memory.
    pub session_file: Option<PathBuf>,
}

impl PortalConfig {
    /// Loads the configuration from the environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let imgbb_api_key = optional("PORTAL_IMGBB_API_KEY");
        if imgbb_api_key.is_none() {
            warn!("PORTAL_IMGBB_API_KEY not set, image uploads will fail");
        }

        let allowed_email_domain = optional("PORTAL_ALLOWED_EMAIL_DOMAIN").unwrap_or_else(|| {
            info!("PORTAL_ALLOWED_EMAIL_DOMAIN not set, using default: {DEFAULT_ALLOWED_EMAIL_DOMAIN}");
            DEFAULT_ALLOWED_EMAIL_DOMAIN.to_string()
        });

        Ok(Self {
            firebase_api_key: required("PORTAL_FIREBASE_API_KEY")?,
            project_id: required("PORTAL_FIREBASE_PROJECT_ID")?,
            imgbb_api_key,
            allowed_email_domain,
            session_file: optional("PORTAL_SESSION_FILE").map(PathBuf::from),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}
