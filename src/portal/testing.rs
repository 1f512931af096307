//! In-process stand-ins for the identity provider and image host.

use super::Portal;
use crate::auth::models::IdpCredential;
use crate::auth::{AuthError, IdentityProvider};
use crate::imgbb::{ImageFile, ImageHost, UploadError};
use crate::session::{Session, SessionStore};
use crate::store::DocumentStore;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn session(user_id: &str, email: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        email: Some(email.to_string()),
        id_token: format!("id-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

#[derive(Default)]
pub(crate) struct FakeIdentity {
    /// Returned by OAuth sign-in.
    pub idp_session: Mutex<Option<Session>>,
    pub reset_emails: Mutex<Vec<String>>,
    pub refreshed: AtomicUsize,
}

#[async_trait::async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if password == "correct horse" {
            Ok(session("uid-password", email))
        } else {
            Err(AuthError::ApiError("INVALID_LOGIN_CREDENTIALS".to_string()))
        }
    }

    async fn sign_in_with_idp(&self, _credential: &IdpCredential) -> Result<Session, AuthError> {
        self.idp_session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::ApiError("INVALID_IDP_RESPONSE".to_string()))
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError> {
        self.reset_emails.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn link_email_password(
        &self,
        current: &Session,
        email: &str,
        _password: &str,
    ) -> Result<Session, AuthError> {
        let mut linked = current.clone();
        linked.email = Some(email.to_string());
        linked.id_token = format!("{}-linked", current.id_token);
        Ok(linked)
    }

    async fn refresh_session(&self, current: &Session) -> Result<Session, AuthError> {
        self.refreshed.fetch_add(1, Ordering::SeqCst);
        let mut refreshed = session(&current.user_id, current.email.as_deref().unwrap_or_default());
        refreshed.id_token = "fresh".to_string();
        Ok(refreshed)
    }
}

#[derive(Default)]
pub(crate) struct FakeImageHost {
    pub fail: bool,
    pub uploads: AtomicUsize,
}

impl FakeImageHost {
    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, image: &ImageFile) -> Result<String, UploadError> {
        if self.fail {
            return Err(UploadError::Rejected("Failed to upload image to ImgBB".to_string()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://i.ibb.co/{}/{}", n, image.file_name))
    }
}

pub(crate) fn portal(
    store: Arc<dyn DocumentStore>,
    identity: Arc<FakeIdentity>,
    images: Arc<FakeImageHost>,
) -> Portal {
    Portal::new(store, identity, images, Arc::new(SessionStore::in_memory()))
}
