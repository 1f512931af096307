use super::models::User;
use super::{decode, Portal, PortalError, USERS};
use crate::auth::models::IdpCredential;
use crate::auth::AuthError;
use crate::session::Session;
use crate::store::{document_path, Fields};
use serde_json::Value;
use tracing::{info, warn};

/// The role marker given to self-provisioned accounts.
pub const STUDENT_ROLE: &str = "student";

/// Where the UI should go after an OAuth sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    StudentDashboard,
    Dashboard,
}

impl Destination {
    pub fn route(&self) -> &'static str {
        match self {
            Destination::StudentDashboard => "/studentdashboard",
            Destination::Dashboard => "/dashboard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthOutcome {
    pub session: Session,
    pub destination: Destination,
    /// A `users` record was created for a first-time identity.
    pub provisioned: bool,
}

fn email_in_domain(email: &str, domain: &str) -> bool {
    let suffix = format!("@{}", domain.to_ascii_lowercase());
    email.to_ascii_lowercase().ends_with(&suffix)
}

impl Portal {
    /// Signs in with email and password and persists the session.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session, PortalError> {
        let session = match self.identity.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(e) => {
                warn!("sign in failed: {}", e);
                return Err(e.into());
            }
        };

        self.sessions.persist(session.clone()).await?;
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    /// Completes an OAuth popup sign-in.
    ///
    /// Identities outside the allowed email domain are turned away before
    /// anything is stored. A first-time identity gets a `users` record with the
    /// student role and a password-reset email so it can also sign in with a
    /// password later.
    pub async fn authenticate_with_oauth(&self, credential: &IdpCredential) -> Result<OAuthOutcome, PortalError> {
        let session = self.identity.sign_in_with_idp(credential).await?;

        let email = session.email.clone().unwrap_or_default();
        if !email_in_domain(&email, &self.allowed_domain) {
            warn!(%email, "rejected sign-up outside allowed domain");
            return Err(AuthError::DomainNotAllowed {
                email,
                domain: self.allowed_domain.clone(),
            }
            .into());
        }

        // Store writes below run as the new user.
        self.sessions.persist(session.clone()).await?;

        let path = document_path(USERS, &session.user_id);
        let existing = self.store.get(&path).await?;

        let Some(document) = existing else {
            let mut fields = Fields::new();
            fields.insert("email".to_string(), Value::String(email.clone()));
            fields.insert("society".to_string(), Value::String(STUDENT_ROLE.to_string()));
            self.store.set(&path, fields).await?;
            self.identity.send_password_reset_email(&email).await?;
            info!(user_id = %session.user_id, "provisioned student account");

            return Ok(OAuthOutcome {
                session,
                destination: Destination::StudentDashboard,
                provisioned: true,
            });
        };

        let user: User = decode(document)?;
        let destination = if user.club.as_deref() == Some(STUDENT_ROLE) {
            Destination::StudentDashboard
        } else {
            Destination::Dashboard
        };

        info!(user_id = %session.user_id, ?destination, "signed in with OAuth");
        Ok(OAuthOutcome {
            session,
            destination,
            provisioned: false,
        })
    }

    /// Adds an email/password credential to the signed-in account.
    pub async fn link_email_password(&self, email: &str, password: &str) -> Result<Session, PortalError> {
        let current = self.sessions.current().await.ok_or(AuthError::NoSession)?;
        let linked = self.identity.link_email_password(&current, email, password).await?;
        self.sessions.persist(linked.clone()).await?;
        Ok(linked)
    }

    /// The club (or role marker) recorded for `user_id`, if any.
    pub async fn get_role(&self, user_id: &str) -> Result<Option<String>, PortalError> {
        let Some(document) = self.store.get(&document_path(USERS, user_id)).await? else {
            return Ok(None);
        };
        let user: User = decode(document)?;
        Ok(user.club)
    }

    /// Picks up a persisted session, refreshing it when its token has expired.
    pub async fn restore_session(&self) -> Result<Option<Session>, PortalError> {
        let Some(session) = self.sessions.load().await? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }

        let refreshed = self.identity.refresh_session(&session).await?;
        self.sessions.persist(refreshed.clone()).await?;
        info!(user_id = %refreshed.user_id, "refreshed persisted session");
        Ok(Some(refreshed))
    }

    pub async fn sign_out(&self) -> Result<(), PortalError> {
        self.sessions.clear().await?;
        Ok(())
    }
}
