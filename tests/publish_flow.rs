//! Publish workflow integration tests over the in-memory object store

use bytes::Bytes;
use imprint::document::Document;
use imprint::manifest::{ManifestStore, ReleaseManifest};
use imprint::publish::Publisher;
use imprint::store::{keys, MemoryStore, ObjectMeta, ObjectStore, CACHE_DRAFT, CACHE_MANIFEST};
use imprint::ImprintError;
use serde_json::json;
use std::sync::Arc;

fn setup() -> (Arc<MemoryStore>, Publisher) {
    let store = Arc::new(MemoryStore::new("http://127.0.0.1:3001"));
    let publisher = Publisher::new(Arc::clone(&store) as Arc<dyn ObjectStore>);
    (store, publisher)
}

async fn put_draft(store: &MemoryStore, doc_id: &str, title: &str) {
    let doc = Document::new(doc_id, title, json!({ "overview": { "title": title } }));
    store
        .put(
            &keys::draft(doc_id),
            Bytes::from(serde_json::to_vec(&doc).unwrap()),
            &ObjectMeta::json(CACHE_DRAFT),
        )
        .await
        .unwrap();
}

async fn read_manifest(store: &MemoryStore, doc_id: &str) -> Option<ReleaseManifest> {
    let body = store.get(&keys::manifest(doc_id)).await.unwrap()?;
    Some(serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn first_publish_creates_release_0001() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "Plan").await;

    let version = publisher.publish("d1").await.unwrap();
    assert_eq!(version, "0001");

    let manifest = read_manifest(&store, "d1").await.unwrap();
    assert_eq!(manifest.latest, "0001");
    assert_eq!(manifest.path, "releases/0001.json");

    let release = store.get(&keys::release("d1", "0001")).await.unwrap().unwrap();
    let doc: Document = serde_json::from_slice(&release).unwrap();
    assert!(doc.is_published);
}

#[tokio::test]
async fn sequential_publishes_are_gapless() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "Plan").await;

    for expected in ["0001", "0002", "0003"] {
        let version = publisher.publish("d1").await.unwrap();
        assert_eq!(version, expected);
    }

    let manifest = read_manifest(&store, "d1").await.unwrap();
    assert_eq!(manifest.latest, "0003");
    assert_eq!(manifest.path, "releases/0003.json");
}

#[tokio::test]
async fn publish_with_existing_manifest_advances_to_0004() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "Plan").await;

    let manifests = ManifestStore::new(Arc::clone(&store) as Arc<dyn ObjectStore>);
    manifests.write("d1", "0003").await.unwrap();

    let version = publisher.publish("d1").await.unwrap();
    assert_eq!(version, "0004");

    let manifest = read_manifest(&store, "d1").await.unwrap();
    assert_eq!(manifest.latest, "0004");
    assert_eq!(manifest.path, "releases/0004.json");

    let release = store.get(&keys::release("d1", "0004")).await.unwrap().unwrap();
    let doc: Document = serde_json::from_slice(&release).unwrap();
    assert!(doc.is_published);
}

#[tokio::test]
async fn publish_without_draft_fails_and_leaves_no_manifest() {
    let (store, publisher) = setup();

    let err = publisher.publish("d1").await.unwrap_err();
    assert!(matches!(err, ImprintError::PublishFailed(_)));
    assert!(read_manifest(&store, "d1").await.is_none());
}

#[tokio::test]
async fn publish_failure_leaves_prior_manifest_untouched() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "Plan").await;
    publisher.publish("d1").await.unwrap();

    let manifests = ManifestStore::new(Arc::clone(&store) as Arc<dyn ObjectStore>);
    let before = manifests.read("d1").await.unwrap();

    // d2 has no draft: its publish fails, its manifest stays absent and
    // d1's manifest is untouched
    let err = publisher.publish("d2").await.unwrap_err();
    assert!(matches!(err, ImprintError::PublishFailed(_)));
    assert!(read_manifest(&store, "d2").await.is_none());
    assert_eq!(manifests.read("d1").await.unwrap(), before);
}

#[tokio::test]
async fn releases_are_never_rewritten_by_later_publishes() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "First").await;
    publisher.publish("d1").await.unwrap();

    let first_release = store.get(&keys::release("d1", "0001")).await.unwrap().unwrap();

    put_draft(&store, "d1", "Second").await;
    publisher.publish("d1").await.unwrap();

    // Byte-for-byte stable at its own key
    let first_again = store.get(&keys::release("d1", "0001")).await.unwrap().unwrap();
    assert_eq!(first_release, first_again);

    let second: Document = serde_json::from_slice(
        &store.get(&keys::release("d1", "0002")).await.unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(second.title, "Second");
}

#[tokio::test]
async fn corrupted_manifest_counter_fails_publish_without_reset() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "Plan").await;

    let bad = serde_json::json!({
        "latest": "not-a-number",
        "path": "releases/not-a-number.json",
        "updatedAt": "2026-01-01T00:00:00Z"
    });
    store
        .put(
            &keys::manifest("d1"),
            Bytes::from(serde_json::to_vec(&bad).unwrap()),
            &ObjectMeta::json(CACHE_MANIFEST),
        )
        .await
        .unwrap();

    let err = publisher.publish("d1").await.unwrap_err();
    assert!(matches!(err, ImprintError::VersionFormat(_)));

    // The corrupted counter is preserved for inspection, never reset
    let manifest = read_manifest(&store, "d1").await.unwrap();
    assert_eq!(manifest.latest, "not-a-number");
}

#[tokio::test]
async fn draft_key_stays_mutable_across_publishes() {
    let (store, publisher) = setup();
    put_draft(&store, "d1", "First").await;
    publisher.publish("d1").await.unwrap();
    put_draft(&store, "d1", "Second").await;

    let draft: Document = serde_json::from_slice(
        &store.get(&keys::draft("d1")).await.unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(draft.title, "Second");
    assert!(!draft.is_published);
}
