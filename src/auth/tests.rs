use super::*;
use chrono::Utc;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

fn auth(server: &MockServer) -> FirebaseAuth {
    let client = ClientBuilder::new(Client::new()).build();
    FirebaseAuth::new_with_client(client, server.url("/v1"), server.url("/token/v1"))
}

fn session() -> Session {
    Session {
        user_id: "uid-1".to_string(),
        email: None,
        id_token: "old-id-token".to_string(),
        refresh_token: "old-refresh".to_string(),
        expires_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_sign_in_with_password() {
    let server = MockServer::start();
    let auth = auth(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/accounts:signInWithPassword")
            .header("content-type", "application/json")
            .json_body(json!({
                "email": "lead@sahrdaya.ac.in",
                "password": "hunter22",
                "returnSecureToken": true
            }));
        then.status(200).json_body(json!({
            "localId": "uid-1",
            "email": "lead@sahrdaya.ac.in",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600",
            "registered": true
        }));
    });

    let session = auth
        .sign_in_with_password("lead@sahrdaya.ac.in", "hunter22")
        .await
        .unwrap();

    assert_eq!(session.user_id, "uid-1");
    assert_eq!(session.email.as_deref(), Some("lead@sahrdaya.ac.in"));
    assert_eq!(session.id_token, "id-token");
    assert!(!session.is_expired());
    mock.assert();
}

#[tokio::test]
async fn test_sign_in_failure_surfaces_provider_message() {
    let server = MockServer::start();
    let auth = auth(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(400).json_body(json!({
            "error": {
                "code": 400,
                "message": "INVALID_LOGIN_CREDENTIALS",
                "errors": [{ "message": "INVALID_LOGIN_CREDENTIALS", "domain": "global", "reason": "invalid" }]
            }
        }));
    });

    let err = auth
        .sign_in_with_password("lead@sahrdaya.ac.in", "wrong")
        .await
        .unwrap_err();

    match err {
        AuthError::ApiError(message) => assert_eq!(message, "INVALID_LOGIN_CREDENTIALS"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_sign_in_with_idp() {
    let server = MockServer::start();
    let auth = auth(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/accounts:signInWithIdp")
            .json_body(json!({
                "postBody": "id_token=google-jwt&providerId=google.com",
                "requestUri": "http://localhost",
                "returnSecureToken": true,
                "returnIdpCredential": true
            }));
        then.status(200).json_body(json!({
            "localId": "uid-2",
            "email": "new@sahrdaya.ac.in",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600",
            "isNewUser": true
        }));
    });

    let credential = models::IdpCredential::google("google-jwt", "http://localhost");
    let session = auth.sign_in_with_idp(&credential).await.unwrap();

    assert_eq!(session.user_id, "uid-2");
    mock.assert();
}

#[tokio::test]
async fn test_send_password_reset_email() {
    let server = MockServer::start();
    let auth = auth(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/accounts:sendOobCode")
            .json_body(json!({
                "requestType": "PASSWORD_RESET",
                "email": "new@sahrdaya.ac.in"
            }));
        then.status(200).json_body(json!({ "email": "new@sahrdaya.ac.in" }));
    });

    auth.send_password_reset_email("new@sahrdaya.ac.in").await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_link_email_password_keeps_tokens_when_none_returned() {
    let server = MockServer::start();
    let auth = auth(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/accounts:update")
            .json_body(json!({
                "idToken": "old-id-token",
                "email": "lead@sahrdaya.ac.in",
                "password": "hunter22",
                "returnSecureToken": true
            }));
        then.status(200).json_body(json!({
            "localId": "uid-1",
            "email": "lead@sahrdaya.ac.in"
        }));
    });

    let linked = auth
        .link_email_password(&session(), "lead@sahrdaya.ac.in", "hunter22")
        .await
        .unwrap();

    assert_eq!(linked.id_token, "old-id-token");
    assert_eq!(linked.refresh_token, "old-refresh");
    assert_eq!(linked.email.as_deref(), Some("lead@sahrdaya.ac.in"));
    mock.assert();
}

#[tokio::test]
async fn test_refresh_session() {
    let server = MockServer::start();
    let auth = auth(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/token/v1/token")
            .json_body(json!({
                "grant_type": "refresh_token",
                "refresh_token": "old-refresh"
            }));
        then.status(200).json_body(json!({
            "id_token": "new-id-token",
            "refresh_token": "new-refresh",
            "expires_in": "3600",
            "user_id": "uid-1",
            "token_type": "Bearer"
        }));
    });

    let refreshed = auth.refresh_session(&session()).await.unwrap();

    assert_eq!(refreshed.id_token, "new-id-token");
    assert_eq!(refreshed.refresh_token, "new-refresh");
    assert!(!refreshed.is_expired());
    mock.assert();
}
