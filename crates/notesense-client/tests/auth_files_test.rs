//! Integration tests for the auth routes and attachment uploads.

use std::sync::Arc;

use notesense_client::{
    AuthClient, ClientConfig, Error, FileClient, FileCredentialStore, FileKind, FileUploader,
    Session,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth_response(token: &str) -> serde_json::Value {
    json!({
        "token": token,
        "user": {
            "id": "u1",
            "email": "ada@example.com",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        }
    })
}

#[tokio::test]
async fn test_login_binds_and_persists_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("tok-1")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path().join("creds.json")));
    let session = Session::new(store.clone());
    let auth = AuthClient::new(&ClientConfig::for_server(&server.uri()), session.clone()).unwrap();

    let creds = auth.login("ada@example.com", "pw").await.unwrap();
    assert_eq!(creds.token, "tok-1");
    assert_eq!(session.bearer().as_deref(), Some("tok-1"));

    // a fresh session over the same file picks the credential up
    let restored = Session::new(store);
    assert!(restored.restore().unwrap());
    assert_eq!(restored.user().unwrap().id, "u1");
}

#[tokio::test]
async fn test_login_bad_password_keeps_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let auth = AuthClient::new(&ClientConfig::for_server(&server.uri()), session.clone()).unwrap();

    let err = auth.login("ada@example.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_signup_sends_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .and(body_json(
            json!({ "email": "ada@example.com", "password": "pw", "name": "Ada" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("tok-2")))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let auth = AuthClient::new(&ClientConfig::for_server(&server.uri()), session.clone()).unwrap();
    auth.signup("Ada", "ada@example.com", "pw").await.unwrap();
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("tok-1")))
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let auth = AuthClient::new(&ClientConfig::for_server(&server.uri()), session.clone()).unwrap();
    auth.login("ada@example.com", "pw").await.unwrap();

    let err = auth.logout().await.unwrap_err();
    assert!(matches!(err, Error::Transport { status: 500, .. }));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_upload_posts_multipart_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "f1",
            "userID": "u1",
            "name": "scan.png",
            "type": "image",
            "path": "uploads/scan.png",
            "size": 4,
            "mimeType": "image/png",
            "ocrText": "hello"
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("tok-1")))
        .mount(&server)
        .await;

    let config = ClientConfig::for_server(&server.uri());
    let session = Session::in_memory();
    AuthClient::new(&config, session.clone())
        .unwrap()
        .login("ada@example.com", "pw")
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("scan.png");
    let b = dir.path().join("other.png");
    std::fs::write(&a, b"\x89PNG").unwrap();
    std::fs::write(&b, b"\x89PNG").unwrap();

    let files = FileClient::new(&config, session).unwrap();
    let uploaded = files.upload_many(&[a.as_path(), b.as_path()]).await.unwrap();
    assert_eq!(uploaded.len(), 2);
    assert_eq!(uploaded[0].kind, FileKind::Image);
    assert_eq!(uploaded[0].ocr_text.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_upload_requires_session() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("memo.txt");
    std::fs::write(&file, "hi").unwrap();

    let files =
        FileClient::new(&ClientConfig::for_server(&server.uri()), Session::in_memory()).unwrap();
    let err = files.upload(&file).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(server.received_requests().await.unwrap().is_empty());
}
