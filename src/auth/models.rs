use crate::session::Session;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// The result of an OAuth provider popup, handed over by the UI.
#[derive(Debug, Clone, Default)]
pub struct IdpCredential {
    /// e.g. `google.com`
    pub provider_id: String,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    /// The URI the provider redirected back to.
    pub request_uri: String,
}

impl IdpCredential {
    pub fn google(id_token: impl Into<String>, request_uri: impl Into<String>) -> Self {
        Self {
            provider_id: "google.com".to_string(),
            id_token: Some(id_token.into()),
            access_token: None,
            request_uri: request_uri.into(),
        }
    }

    /// The url-encoded `postBody` expected by `accounts:signInWithIdp`.
    pub(crate) fn post_body(&self) -> String {
        let mut body = url::form_urlencoded::Serializer::new(String::new());
        if let Some(token) = &self.id_token {
            body.append_pair("id_token", token);
        }
        if let Some(token) = &self.access_token {
            body.append_pair("access_token", token);
        }
        body.append_pair("providerId", &self.provider_id);
        body.finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithPasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithIdpRequest {
    pub post_body: String,
    pub request_uri: String,
    pub return_secure_token: bool,
    pub return_idp_credential: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds, sent as a string.
    pub expires_in: Option<String>,
    pub is_new_user: Option<bool>,
}

impl SignInResponse {
    pub(crate) fn into_session(self) -> Session {
        Session {
            user_id: self.local_id,
            email: self.email,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at: expires_at(self.expires_in.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOobCodeRequest<'a> {
    pub request_type: &'static str,
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEmailPasswordRequest<'a> {
    pub id_token: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountResponse {
    pub local_id: String,
    pub email: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
}

/// The Secure Token API answers in snake_case.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: Option<String>,
    pub user_id: String,
}

pub(crate) fn expires_at(expires_in: Option<&str>) -> chrono::DateTime<Utc> {
    let seconds = expires_in.and_then(|s| s.parse::<i64>().ok()).unwrap_or(3600);
    Utc::now() + Duration::seconds(seconds)
}
