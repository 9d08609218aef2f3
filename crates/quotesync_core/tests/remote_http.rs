use mockito::Matcher;
use quotesync_core::{HttpRemoteClient, Quote, RemoteClient, RemoteError, SyncConfig};
use std::time::Duration;

fn client_for(server: &mockito::ServerGuard) -> HttpRemoteClient {
    let config = SyncConfig {
        endpoint: server.url(),
        request_timeout: Duration::from_secs(2),
        ..SyncConfig::default()
    };
    HttpRemoteClient::new(&config).unwrap()
}

#[tokio::test]
async fn fetch_maps_posts_to_quotes() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/posts")
        .match_query(Matcher::UrlEncoded("_limit".into(), "10".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"userId": 1, "id": 1, "title": "sunt aut facere", "body": "quia et suscipit"},
                {"userId": 1, "id": 2, "title": "qui est esse", "body": "est rerum tempore"}
            ]"#,
        )
        .create_async()
        .await;

    let quotes = client_for(&server).fetch_quotes(10).await.unwrap();
    mock.assert_async().await;
    assert_eq!(
        quotes,
        vec![
            Quote::with_id(1, "sunt aut facere", "quia et suscipit"),
            Quote::with_id(2, "qui est esse", "est rerum tempore"),
        ]
    );
}

#[tokio::test]
async fn fetch_non_success_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/posts")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let err = client_for(&server).fetch_quotes(10).await.unwrap_err();
    assert_eq!(err, RemoteError::Status(500));
}

#[tokio::test]
async fn fetch_malformed_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/posts")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"unexpected": true}"#)
        .create_async()
        .await;

    let err = client_for(&server).fetch_quotes(10).await.unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

#[tokio::test]
async fn register_posts_title_and_body_and_returns_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/posts")
        .match_body(Matcher::Json(serde_json::json!({
            "title": "Ship it",
            "body": "Work"
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"title": "Ship it", "body": "Work", "id": 101}"#)
        .create_async()
        .await;

    let id = client_for(&server)
        .register_quote("Ship it", "Work")
        .await
        .unwrap();
    mock.assert_async().await;
    assert_eq!(id, 101);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let config = SyncConfig {
        endpoint: "http://127.0.0.1:9".to_string(),
        request_timeout: Duration::from_millis(500),
        ..SyncConfig::default()
    };
    let client = HttpRemoteClient::new(&config).unwrap();
    assert_eq!(client.posts_url(), "http://127.0.0.1:9/posts");

    let err = client.register_quote("a", "b").await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}
