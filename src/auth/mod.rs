//! Firebase Authentication, as seen by a signed-in end user.
//!
//! [`IdentityProvider`] is the interface the portal consumes; [`FirebaseAuth`]
//! implements it over the Identity Toolkit and Secure Token REST APIs, keyed by
//! the project's web API key.

pub mod models;

use crate::auth::models::{
    IdpCredential, LinkEmailPasswordRequest, RefreshTokenRequest, RefreshTokenResponse,
    SendOobCodeRequest, SignInResponse, SignInWithIdpRequest, SignInWithPasswordRequest,
    UpdateAccountResponse,
};
use crate::core::middleware::ApiKeyMiddleware;
use crate::core::parse_raw_error_message;
use crate::session::Session;
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[cfg(test)]
mod tests;

const IDENTITY_TOOLKIT_V1_API: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_V1_API: &str = "https://securetoken.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// The provider's own message, e.g. `INVALID_LOGIN_CREDENTIALS`.
    #[error("{0}")]
    ApiError(String),
    #[error("Only @{domain} emails are allowed to sign up.")]
    DomainNotAllowed { email: String, domain: String },
    #[error("No signed-in session")]
    NoSession,
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Sign-in and account primitives of the authentication provider.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Exchanges the credential produced by an OAuth popup for a session.
    async fn sign_in_with_idp(&self, credential: &IdpCredential) -> Result<Session, AuthError>;

    async fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError>;

    /// Adds an email/password credential to the signed-in account.
    async fn link_email_password(
        &self,
        session: &Session,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError>;
}

#[derive(Clone)]
pub struct FirebaseAuth {
    client: ClientWithMiddleware,
    identity_url: String,
    token_url: String,
}

impl FirebaseAuth {
    pub fn new(api_key: &str) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(ApiKeyMiddleware::new(api_key))
            .build();

        Self {
            client,
            identity_url: IDENTITY_TOOLKIT_V1_API.to_string(),
            token_url: SECURE_TOKEN_V1_API.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, identity_url: String, token_url: String) -> Self {
        Self {
            client,
            identity_url,
            token_url,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        action: &str,
    ) -> Result<R, AuthError> {
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::ApiError(parse_raw_error_message(response, action).await));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/accounts:signInWithPassword", self.identity_url);
        let request = SignInWithPasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response: SignInResponse = self.post(&url, &request, "Sign in failed").await?;
        Ok(response.into_session())
    }

    async fn sign_in_with_idp(&self, credential: &IdpCredential) -> Result<Session, AuthError> {
        let url = format!("{}/accounts:signInWithIdp", self.identity_url);
        let request = SignInWithIdpRequest {
            post_body: credential.post_body(),
            request_uri: credential.request_uri.clone(),
            return_secure_token: true,
            return_idp_credential: true,
        };

        let response: SignInResponse = self.post(&url, &request, "OAuth sign in failed").await?;
        Ok(response.into_session())
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError> {
        let url = format!("{}/accounts:sendOobCode", self.identity_url);
        let request = SendOobCodeRequest {
            request_type: "PASSWORD_RESET",
            email,
        };

        let _: serde_json::Value = self.post(&url, &request, "Password reset failed").await?;
        Ok(())
    }

    async fn link_email_password(
        &self,
        session: &Session,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/accounts:update", self.identity_url);
        let request = LinkEmailPasswordRequest {
            id_token: &session.id_token,
            email,
            password,
            return_secure_token: true,
        };

        let response: UpdateAccountResponse = self.post(&url, &request, "Link credential failed").await?;

        // Linking rotates the tokens; keep the old ones if the server sent none.
        Ok(Session {
            user_id: response.local_id,
            email: response.email.or_else(|| session.email.clone()),
            id_token: response.id_token.unwrap_or_else(|| session.id_token.clone()),
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| session.refresh_token.clone()),
            expires_at: match response.expires_in {
                Some(expires_in) => models::expires_at(Some(&expires_in)),
                None => session.expires_at,
            },
        })
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError> {
        let url = format!("{}/token", self.token_url);
        let request = RefreshTokenRequest {
            grant_type: "refresh_token",
            refresh_token: &session.refresh_token,
        };

        let response: RefreshTokenResponse = self.post(&url, &request, "Token refresh failed").await?;
        Ok(Session {
            user_id: response.user_id,
            email: session.email.clone(),
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at: models::expires_at(response.expires_in.as_deref()),
        })
    }
}
