use progress_core::PartialUpdate;
use serde_json::json;
use storage::{ProgressStore, RemoteConfig, RemoteMergeMode, RemoteProgressStore, StorageError};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn update(value: serde_json::Value) -> PartialUpdate {
    PartialUpdate::from_value(value).unwrap()
}

fn store(server: &MockServer, mode: RemoteMergeMode) -> RemoteProgressStore {
    let config = RemoteConfig::new(&server.uri())
        .unwrap()
        .with_merge_mode(mode);
    RemoteProgressStore::new(config).unwrap()
}

#[tokio::test]
async fn missing_node_loads_as_empty_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Null))
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::NativePatch);
    store.initialize().await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn native_patch_sends_only_the_partial_update() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/progress.json"))
        .and(body_json(json!({"a": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": true})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::NativePatch);
    store.merge(&update(json!({"a": true}))).await.unwrap();
}

#[tokio::test]
async fn empty_update_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::NativePatch);
    store.merge(&PartialUpdate::new()).await.unwrap();
}

#[tokio::test]
async fn read_modify_write_puts_the_union() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"a": true, "b": true})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/progress.json"))
        .and(body_json(json!({"a": true, "b": false, "c": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::ReadModifyWrite);
    store
        .merge(&update(json!({"b": false, "c": true})))
        .await
        .unwrap();
}

#[tokio::test]
async fn malformed_node_is_reset_on_initialize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/progress.json"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::NativePatch);
    store.initialize().await.unwrap();
}

#[tokio::test]
async fn auth_token_is_sent_as_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/checklists/progress.json"))
        .and(query_param("auth", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"x": false})))
        .expect(1)
        .mount(&server)
        .await;

    let config = RemoteConfig::new(&server.uri())
        .unwrap()
        .with_key("checklists/progress")
        .unwrap()
        .with_auth(Some("s3cret".into()));
    let store = RemoteProgressStore::new(config).unwrap();
    assert_eq!(store.load().await.unwrap().get("x"), Some(false));
}

#[tokio::test]
async fn server_error_surfaces_as_remote_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::NativePatch);
    assert!(matches!(
        store.load().await.unwrap_err(),
        StorageError::RemoteStatus { status: 503 }
    ));
    assert!(matches!(
        store.merge(&update(json!({"a": true}))).await.unwrap_err(),
        StorageError::RemoteStatus { status: 401 }
    ));
}

#[tokio::test]
async fn ids_with_path_characters_never_reach_the_remote() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/progress.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keep": true})))
        .mount(&server)
        .await;

    for mode in [RemoteMergeMode::NativePatch, RemoteMergeMode::ReadModifyWrite] {
        let store = store(&server, mode);
        let err = store
            .merge(&update(json!({"ok": true, "a/b": true})))
            .await
            .unwrap_err();
        assert!(
            matches!(err, StorageError::UnsupportedItemId { ref item } if item == "a/b"),
            "{mode}"
        );
        assert_eq!(store.load().await.unwrap().get("keep"), Some(true));
    }
}

#[tokio::test]
async fn initialize_drops_only_invalid_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"keep": true, "a": {"b": true}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/progress.json"))
        .and(body_json(json!({"keep": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server, RemoteMergeMode::NativePatch);
    store.initialize().await.unwrap();
}
