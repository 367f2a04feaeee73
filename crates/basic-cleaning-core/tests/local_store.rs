use std::fs;

use basic_cleaning_core::artifact::{ArtifactRef, VersionSelector};
use basic_cleaning_core::store::{ArtifactStore, LocalArtifactStore, PublishRequest, StoreError};
use basic_cleaning_core::RunContext;

fn write_payload(dir: &std::path::Path, file_name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn publish_assigns_increasing_versions_and_moves_latest() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(root.path()).await.unwrap();

    let first = write_payload(scratch.path(), "sample.csv", "price,last_review\n10,2019-01-01\n");
    let v0 = store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "first drop", &first))
        .await
        .unwrap();

    let second = write_payload(scratch.path(), "sample.csv", "price,last_review\n20,2019-01-02\n");
    let v1 = store
        .publish(
            &PublishRequest::new("sample.csv", "raw_data", "second drop", &second)
                .with_alias("reference"),
        )
        .await
        .unwrap();

    assert_eq!(v0.version, 0);
    assert_eq!(v1.version, 1);
    assert_eq!(v1.to_string(), "sample.csv:v1");
    assert_ne!(v0.digest, v1.digest);

    let latest = store
        .fetch(&"sample.csv:latest".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(latest.version, v1);
    assert_eq!(latest.artifact_type, "raw_data");
    assert_eq!(
        fs::read_to_string(&latest.path).unwrap(),
        "price,last_review\n20,2019-01-02\n"
    );

    let bare = store.fetch(&"sample.csv".parse().unwrap()).await.unwrap();
    assert_eq!(bare.version, v1);

    let aliased = store
        .fetch(&"sample.csv:reference".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(aliased.version, v1);

    let pinned = store
        .fetch(&ArtifactRef::new("sample.csv", VersionSelector::Version(0)).unwrap())
        .await
        .unwrap();
    assert_eq!(pinned.version, v0);
    assert_eq!(
        fs::read_to_string(&pinned.path).unwrap(),
        "price,last_review\n10,2019-01-01\n"
    );

    let manifests = store.list_versions("sample.csv").await.unwrap();
    assert_eq!(manifests.len(), 2);
    assert_eq!(manifests[0].description, "first drop");
    assert_eq!(manifests[1].description, "second drop");
    assert_eq!(manifests[1].file_name, "sample.csv");
}

#[tokio::test]
async fn fetch_reports_unknown_artifacts_versions_and_aliases() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(root.path()).await.unwrap();

    let missing = store.fetch(&"nothing.csv:latest".parse().unwrap()).await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));

    let payload = write_payload(scratch.path(), "sample.csv", "price\n1\n");
    store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "", &payload))
        .await
        .unwrap();

    let bad_version = store.fetch(&"sample.csv:v7".parse().unwrap()).await;
    assert!(matches!(bad_version, Err(StoreError::NotFound(_))));

    let bad_alias = store.fetch(&"sample.csv:prod".parse().unwrap()).await;
    assert!(matches!(bad_alias, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn fetch_rejects_tampered_payloads() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(root.path()).await.unwrap();

    let payload = write_payload(scratch.path(), "sample.csv", "price\n1\n");
    store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "", &payload))
        .await
        .unwrap();

    let fetched = store.fetch(&"sample.csv:v0".parse().unwrap()).await.unwrap();
    fs::write(&fetched.path, "price\n999\n").unwrap();

    let result = store.fetch(&"sample.csv:v0".parse().unwrap()).await;
    assert!(matches!(result, Err(StoreError::Backend(_))));
}

#[tokio::test]
async fn publish_validates_names_and_aliases() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(root.path()).await.unwrap();
    let payload = write_payload(scratch.path(), "sample.csv", "price\n1\n");

    let bad_name = store
        .publish(&PublishRequest::new("../escape", "raw_data", "", &payload))
        .await;
    assert!(matches!(bad_name, Err(StoreError::InvalidName(_))));

    let version_alias = store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "", &payload).with_alias("v3"))
        .await;
    assert!(matches!(version_alias, Err(StoreError::Backend(_))));

    let missing_file = store
        .publish(&PublishRequest::new(
            "sample.csv",
            "raw_data",
            "",
            scratch.path().join("absent.csv"),
        ))
        .await;
    assert!(matches!(missing_file, Err(StoreError::Io(_))));
    assert!(store.list_versions("sample.csv").await.unwrap().is_empty());
}

#[tokio::test]
async fn runs_are_written_as_json() {
    let root = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(root.path()).await.unwrap();

    let mut run = RunContext::start("basic_cleaning", &serde_json::json!({ "min_price": 10.0 })).unwrap();
    run.finish(&store, &serde_json::json!({ "rows_out": 0 }))
        .await
        .unwrap();

    let written = fs::read(store.run_path(run.id())).unwrap();
    let restored: RunContext = serde_json::from_slice(&written).unwrap();
    assert_eq!(restored, run);
    assert_eq!(restored.config()["min_price"], 10.0);
    assert!(restored.finished_at().is_some_and(|finished| finished >= restored.started_at()));
}

#[tokio::test]
async fn versions_without_manifest_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(root.path()).await.unwrap();
    let payload = write_payload(scratch.path(), "sample.csv", "price\n1\n");

    store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "complete", &payload))
        .await
        .unwrap();
    // Left behind by a publish that died before writing its manifest.
    fs::create_dir(root.path().join("artifacts").join("sample.csv").join("v1")).unwrap();

    let manifests = store.list_versions("sample.csv").await.unwrap();
    assert_eq!(manifests.len(), 1);
    assert_eq!(manifests[0].version, 0);

    let next = store
        .publish(&PublishRequest::new("sample.csv", "raw_data", "after crash", &payload))
        .await
        .unwrap();
    assert_eq!(next.version, 2);

    let versions: Vec<u32> = store
        .list_versions("sample.csv")
        .await
        .unwrap()
        .iter()
        .map(|manifest| manifest.version)
        .collect();
    assert_eq!(versions, vec![0, 2]);

    let latest = store.fetch(&"sample.csv:latest".parse().unwrap()).await.unwrap();
    assert_eq!(latest.version, next);
    let orphan = store.fetch(&"sample.csv:v1".parse().unwrap()).await;
    assert!(matches!(orphan, Err(StoreError::NotFound(_))));
}
