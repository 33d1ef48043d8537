//! Publish orchestration: draft → immutable release
//!
//! A publish promotes the current draft object to `releases/<next>.json` and
//! advances the manifest pointer. The release is written before the manifest,
//! so the manifest never names a release that does not exist. If the manifest
//! write fails after the release landed, the release is left orphaned and the
//! failure is surfaced; a retry re-reads the manifest and produces a fresh
//! version, leaving the orphan unreferenced but harmless.
//!
//! Two concurrent publishes can observe the same manifest, compute the same
//! next version and race on both keys; the last write wins. The store offers
//! no conditional writes, so this weak-consistency behavior is a documented
//! limitation of the workflow, not something this module papers over.

use crate::document::Document;
use crate::manifest::ManifestStore;
use crate::store::{keys, ObjectMeta, ObjectStore, CACHE_RELEASE};
use crate::types::{ImprintError, Result};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};

/// Promotes drafts to releases and advances the manifest
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    manifests: ManifestStore,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        let manifests = ManifestStore::new(Arc::clone(&store));
        Self { store, manifests }
    }

    pub fn manifests(&self) -> &ManifestStore {
        &self.manifests
    }

    /// Publish the current draft of `doc_id` as the next release.
    ///
    /// Returns the new version string. When the draft is missing the whole
    /// operation fails with `PublishFailed` and the manifest stays at its
    /// prior value. A malformed manifest counter fails with `VersionFormat`
    /// rather than resetting the sequence.
    pub async fn publish(&self, doc_id: &str) -> Result<String> {
        let manifest = self.manifests.read(doc_id).await;
        let next = ManifestStore::next_version(manifest.as_ref())?;

        // Promote the draft. The release carries the publish flag and an
        // effectively unbounded cache age; its key is never written again
        // because every publish targets manifest+1.
        let draft_key = keys::draft(doc_id);
        let release_key = keys::release(doc_id, &next);

        let draft_body = self
            .store
            .get(&draft_key)
            .await
            .map_err(|e| ImprintError::PublishFailed(format!("draft read failed: {e}")))?
            .ok_or_else(|| {
                ImprintError::PublishFailed(format!("no draft exists for {doc_id}"))
            })?;

        let mut document: Document = serde_json::from_slice(&draft_body).map_err(|e| {
            ImprintError::PublishFailed(format!("draft for {doc_id} is not a document: {e}"))
        })?;
        document.is_published = true;

        let release_body = serde_json::to_vec(&document)
            .map_err(|e| ImprintError::Internal(format!("release serialization: {e}")))?;
        self.store
            .put(
                &release_key,
                Bytes::from(release_body),
                &ObjectMeta::json(CACHE_RELEASE),
            )
            .await
            .map_err(|e| ImprintError::PublishFailed(format!("release write failed: {e}")))?;

        if let Err(e) = self.manifests.write(doc_id, &next).await {
            // The release object exists but nothing points at it yet.
            warn!(doc_id = %doc_id, version = %next, error = %e, "manifest write failed after release");
            return Err(ImprintError::PublishFailed(format!(
                "release {next} written but manifest update failed: {e}"
            )));
        }

        info!(doc_id = %doc_id, version = %next, "published");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, CACHE_DRAFT};
    use serde_json::json;

    async fn store_with_draft(doc_id: &str) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new("http://127.0.0.1:3001"));
        let doc = Document::new(doc_id, "Plan", json!({ "overview": { "title": "Plan" } }));
        store
            .put(
                &keys::draft(doc_id),
                Bytes::from(serde_json::to_vec(&doc).unwrap()),
                &ObjectMeta::json(CACHE_DRAFT),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn release_is_stamped_published_with_immutable_cache() {
        let store = store_with_draft("d1").await;
        let publisher = Publisher::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

        let version = publisher.publish("d1").await.unwrap();
        assert_eq!(version, "0001");

        let stored = store.get_object(&keys::release("d1", "0001")).unwrap();
        assert_eq!(stored.meta.cache_control, CACHE_RELEASE);
        let doc: Document = serde_json::from_slice(&stored.body).unwrap();
        assert!(doc.is_published);
    }

    #[tokio::test]
    async fn unparsable_draft_fails_without_touching_the_manifest() {
        let store = Arc::new(MemoryStore::new("http://127.0.0.1:3001"));
        store
            .put(
                &keys::draft("d1"),
                Bytes::from_static(b"not a document"),
                &ObjectMeta::json(CACHE_DRAFT),
            )
            .await
            .unwrap();
        let publisher = Publisher::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

        let err = publisher.publish("d1").await.unwrap_err();
        assert!(matches!(err, ImprintError::PublishFailed(_)));
        assert!(store.get_object(&keys::manifest("d1")).is_none());
    }
}
