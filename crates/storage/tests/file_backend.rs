use std::time::Duration;

use progress_core::{PartialUpdate, ProgressDocument};
use serde_json::json;
use storage::{Backend, ProgressStore, Storage};
use tempfile::tempdir;

fn update(value: serde_json::Value) -> PartialUpdate {
    PartialUpdate::from_value(value).unwrap()
}

async fn open(backend: Backend) -> Storage {
    let storage = Storage::open(&backend).await.expect("open");
    storage.progress.initialize().await.expect("initialize");
    storage
}

fn backends(dir: &std::path::Path) -> Vec<Backend> {
    vec![
        Backend::File {
            path: dir.join("plain.json"),
        },
        Backend::DebouncedFile {
            path: dir.join("debounced.json"),
            window: Duration::from_millis(20),
        },
    ]
}

#[tokio::test]
async fn fresh_store_round_trips_to_empty_object() {
    let dir = tempdir().unwrap();
    for backend in backends(dir.path()) {
        let storage = open(backend).await;
        assert_eq!(storage.progress.load().await.unwrap(), ProgressDocument::new());
    }
    assert_eq!(
        std::fs::read_to_string(dir.path().join("plain.json")).unwrap(),
        "{}"
    );
}

#[tokio::test]
async fn corrupt_file_is_reset_on_initialize() {
    let dir = tempdir().unwrap();
    for backend in backends(dir.path()) {
        let path = match &backend {
            Backend::File { path } | Backend::DebouncedFile { path, .. } => path.clone(),
            _ => unreachable!(),
        };
        std::fs::write(&path, "{\"a\": tru").unwrap();

        let storage = open(backend).await;
        assert!(storage.progress.load().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}

#[tokio::test]
async fn load_of_corrupt_file_at_runtime_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("progress.json");
    let storage = open(Backend::File { path: path.clone() }).await;

    std::fs::write(&path, "[1, 2, 3]").unwrap();
    let err = storage.progress.load().await.unwrap_err();
    assert!(matches!(err, storage::StorageError::Corrupt(_)));
}

#[tokio::test]
async fn union_keeps_untouched_keys() {
    let dir = tempdir().unwrap();
    for backend in backends(dir.path()) {
        let storage = open(backend).await;
        storage
            .progress
            .merge(&update(json!({"a": true, "b": true, "c": false})))
            .await
            .unwrap();
        storage
            .progress
            .merge(&update(json!({"b": false, "d": true})))
            .await
            .unwrap();
        storage.progress.merge(&PartialUpdate::new()).await.unwrap();
        storage.progress.flush().await.unwrap();

        let doc = storage.progress.load().await.unwrap();
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"a": true, "b": false, "c": false, "d": true})
        );
    }
}

#[tokio::test]
async fn file_is_pretty_printed_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("progress.json");
    let storage = open(Backend::File { path: path.clone() }).await;
    storage
        .progress
        .merge(&update(json!({"a": true})))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "{\n  \"a\": true\n}"
    );
}
