pub mod admin;
pub mod auth;
pub mod config;
pub mod core;
pub mod firestore;
pub mod imgbb;
pub mod portal;
pub mod session;
pub mod store;

use auth::{FirebaseAuth, IdentityProvider};
use config::PortalConfig;
use firestore::FirebaseFirestore;
use imgbb::ImgBbClient;
use portal::{Portal, PortalError};
use session::SessionStore;
use std::sync::Arc;

/// Builds the production clients from one [`PortalConfig`].
pub struct PortalApp {
    config: PortalConfig,
}

impl PortalApp {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn auth(&self) -> FirebaseAuth {
        FirebaseAuth::new(&self.config.firebase_api_key)
    }

    /// A Firestore client that authenticates with whatever session `sessions`
    /// holds, refreshing it through `identity` when it expires.
    pub fn firestore(
        &self,
        sessions: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> FirebaseFirestore {
        FirebaseFirestore::new(&self.config.project_id, sessions, identity)
    }

    pub fn image_host(&self) -> ImgBbClient {
        ImgBbClient::new(self.config.imgbb_api_key.clone())
    }

    pub fn session_store(&self) -> SessionStore {
        match &self.config.session_file {
            Some(path) => SessionStore::persistent(path),
            None => SessionStore::in_memory(),
        }
    }

    /// Wires a [`Portal`] over Firestore, Firebase Auth and ImgBB, restoring
    /// any persisted session first.
    pub async fn portal(&self) -> Result<Portal, PortalError> {
        let sessions = Arc::new(self.session_store());
        let identity: Arc<dyn IdentityProvider> = Arc::new(self.auth());
        let portal = Portal::new(
            Arc::new(self.firestore(sessions.clone(), identity.clone())),
            identity,
            Arc::new(self.image_host()),
            sessions,
        )
        .with_allowed_domain(self.config.allowed_email_domain.clone());

        portal.restore_session().await?;
        Ok(portal)
    }
}
