use super::*;
use repodrive_core::{Backoff, RepoClient, RepoId, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RepoClient {
    RepoClient::with_base_url(&server.uri(), RepoId::new("octo", "files"), "test-token")
        .unwrap()
        .with_retry(RetryPolicy::new(2, Backoff::fixed(Duration::from_millis(1))))
}

#[tokio::test]
async fn lists_and_creates_folder_through_contents_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/files/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "README.md", "path": "README.md", "sha": "s1", "type": "file",
             "html_url": "https://example.test/blob/main/README.md"},
            {"name": "docs", "path": "docs", "sha": "s2", "type": "dir"},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/files/contents/notes/.gitkeep"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/files/contents/notes/.gitkeep"))
        .and(body_json(json!({"message": "Create folder notes", "content": ""})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": {"name": ".gitkeep", "path": "notes/.gitkeep", "sha": "s3", "type": "file"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = SyncEngine::new(client_for(&server), TreeCache::default())
        .with_options(options(MoveOrder::CopyFirst));

    let listed = engine.list_directory(&Location::root()).await.unwrap();
    assert_eq!(listed[0].name, "docs");
    assert_eq!(
        listed[1].link.as_deref(),
        Some("https://example.test/blob/main/README.md")
    );

    engine.create_folder(&Location::root(), "notes").await.unwrap();
    assert_eq!(
        names(&engine, &Location::root()),
        vec!["docs", "notes", "README.md"]
    );
}

#[tokio::test]
async fn rate_limited_store_surfaces_as_rate_limited_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/files/contents"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let mut engine = SyncEngine::new(client_for(&server), TreeCache::default())
        .with_options(options(MoveOrder::CopyFirst));

    let err = engine.list_directory(&Location::root()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert!(engine.view(&Location::root()).unwrap().is_empty());
}
