use super::*;
use httpmock::prelude::*;
use serde_json::json;

fn poster() -> ImageFile {
    ImageFile::new("poster.PNG", Bytes::from_static(b"\x89PNG fake"))
}

#[test]
fn test_content_type_from_extension() {
    assert_eq!(poster().content_type, "image/png");
    assert_eq!(ImageFile::new("a.jpeg", Vec::<u8>::new()).content_type, "image/jpeg");
    assert_eq!(ImageFile::new("noext", Vec::<u8>::new()).content_type, "application/octet-stream");
}

#[tokio::test]
async fn test_upload_returns_hosted_url() {
    let server = MockServer::start();
    let client = ImgBbClient::new_with_endpoint(Some("k3y".to_string()), server.url("/1/upload"));

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/1/upload")
            .body_includes("name=\"key\"")
            .body_includes("k3y")
            .body_includes("name=\"image\"; filename=\"poster.PNG\"");
        then.status(200).json_body(json!({
            "data": {
                "id": "abc",
                "url": "https://i.ibb.co/abc/poster.png",
                "display_url": "https://i.ibb.co/abc/poster.png"
            },
            "success": true,
            "status": 200
        }));
    });

    let url = client.upload(&poster()).await.unwrap();
    assert_eq!(url, "https://i.ibb.co/abc/poster.png");
    mock.assert();
}

#[tokio::test]
async fn test_upload_rejection_carries_host_message() {
    let server = MockServer::start();
    let client = ImgBbClient::new_with_endpoint(Some("bad".to_string()), server.url("/1/upload"));

    server.mock(|when, then| {
        when.method(POST).path("/1/upload");
        then.status(400).json_body(json!({
            "status_code": 400,
            "error": { "message": "Invalid API v1 key.", "code": 100 },
            "status_txt": "Bad Request"
        }));
    });

    let err = client.upload(&poster()).await.unwrap_err();
    assert!(matches!(err, UploadError::Rejected(ref m) if m == "Invalid API v1 key."));
}

#[tokio::test]
async fn test_upload_unreadable_response_uses_default_message() {
    let server = MockServer::start();
    let client = ImgBbClient::new_with_endpoint(Some("k".to_string()), server.url("/1/upload"));

    server.mock(|when, then| {
        when.method(POST).path("/1/upload");
        then.status(502).body("Bad Gateway");
    });

    let err = client.upload(&poster()).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to upload image to ImgBB");
}

#[tokio::test]
async fn test_missing_api_key_fails_before_any_request() {
    let server = MockServer::start();
    let client = ImgBbClient::new_with_endpoint(None, server.url("/1/upload"));

    let mock = server.mock(|when, then| {
        when.method(POST).path("/1/upload");
        then.status(200);
    });

    let err = client.upload(&poster()).await.unwrap_err();
    assert!(matches!(err, UploadError::MissingApiKey));
    mock.assert_calls(0);
}

#[tokio::test]
async fn test_media_field_url_is_not_uploaded() {
    let client = ImgBbClient::new(None);
    let field = MediaField::from("https://i.ibb.co/old.png");

    // No key configured: any upload attempt would fail.
    let url = field.resolve(&client).await.unwrap();
    assert_eq!(url, "https://i.ibb.co/old.png");
}
