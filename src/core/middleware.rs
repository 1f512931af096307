use crate::auth::IdentityProvider;
use crate::session::SessionStore;
use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::sync::Arc;
use tracing::debug;

/// Appends the web API key as the `key` query parameter.
///
/// Identity Toolkit and Secure Token endpoints identify the project by this key
/// rather than by an OAuth token.
#[derive(Clone)]
pub struct ApiKeyMiddleware {
    api_key: String,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for ApiKeyMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        req.url_mut()
            .query_pairs_mut()
            .append_pair("key", &self.api_key);

        next.run(req, extensions).await
    }
}

/// Attaches the signed-in user's ID token to outgoing requests.
///
/// An expired session is refreshed through the identity provider and persisted
/// before the request goes out. Requests go out unauthenticated while no
/// session exists; Firestore security rules then decide what an anonymous
/// visitor may read.
#[derive(Clone)]
pub struct SessionMiddleware {
    sessions: Arc<SessionStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl SessionMiddleware {
    pub fn new(sessions: Arc<SessionStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { sessions, identity }
    }

    async fn id_token(&self) -> reqwest_middleware::Result<Option<String>> {
        let Some(session) = self.sessions.current().await else {
            return Ok(None);
        };

        if !session.is_expired() {
            return Ok(Some(session.id_token));
        }

        debug!(user_id = %session.user_id, "refreshing expired session");
        let refreshed = self
            .identity
            .refresh_session(&session)
            .await
            .map_err(|e| middleware_error("Session refresh failed", e))?;
        let token = refreshed.id_token.clone();
        self.sessions
            .persist(refreshed)
            .await
            .map_err(|e| middleware_error("Session persist failed", e))?;

        Ok(Some(token))
    }
}

fn middleware_error(context: &str, error: impl std::fmt::Display) -> reqwest_middleware::Error {
    reqwest_middleware::Error::Middleware(anyhow::anyhow!("{}: {}", context, error))
}

#[async_trait::async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if let Some(token) = self.id_token().await? {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| middleware_error("Invalid session token", e))?;
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}
