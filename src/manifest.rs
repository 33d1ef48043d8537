//! Release manifest management
//!
//! Each document has at most one manifest at a well-known key. The manifest
//! names the latest release by a zero-padded decimal counter and the
//! bucket-relative path derived from it; the two must never disagree, so the
//! path is always re-rendered from the version at write time.

use crate::store::{keys, ObjectMeta, ObjectStore, CACHE_MANIFEST};
use crate::types::{ImprintError, Result};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pointer record naming the current latest release for a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseManifest {
    /// Zero-padded decimal release counter, `"0001"` for the first release
    pub latest: String,
    /// Document-relative path of the current release, `releases/<latest>.json`
    pub path: String,
    /// ISO-8601 timestamp of the last manifest write
    pub updated_at: String,
}

/// Reads and writes manifest objects for the publish workflow
pub struct ManifestStore {
    store: Arc<dyn ObjectStore>,
}

impl ManifestStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch the manifest for a document.
    ///
    /// Returns `None` on any read or parse failure so that "no manifest yet"
    /// and "manifest object absent" look the same to callers.
    pub async fn read(&self, doc_id: &str) -> Option<ReleaseManifest> {
        let key = keys::manifest(doc_id);
        let body = match self.store.get(&key).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!(doc_id = %doc_id, "no manifest yet");
                return None;
            }
            Err(e) => {
                warn!(doc_id = %doc_id, error = %e, "manifest read failed, treating as absent");
                return None;
            }
        };

        match serde_json::from_slice::<ReleaseManifest>(&body) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(doc_id = %doc_id, error = %e, "manifest unparsable, treating as absent");
                None
            }
        }
    }

    /// Compute the version following the given manifest.
    ///
    /// An absent manifest counts as `"0000"`, so the first release becomes
    /// `"0001"`. A counter that does not parse as a non-negative integer
    /// fails the operation; the counter is never silently reset. Past
    /// `"9999"` the rendered width simply grows (`"10000"`).
    pub fn next_version(manifest: Option<&ReleaseManifest>) -> Result<String> {
        let latest = manifest.map(|m| m.latest.as_str()).unwrap_or("0000");
        let current: u64 = latest.parse().map_err(|_| {
            ImprintError::VersionFormat(format!("manifest counter {latest:?} is not a number"))
        })?;
        Ok(format!("{:04}", current + 1))
    }

    /// Write the manifest pointing at `version`, stamped with the current
    /// time and a short cache policy so readers observe new releases promptly.
    pub async fn write(&self, doc_id: &str, version: &str) -> Result<()> {
        let manifest = ReleaseManifest {
            latest: version.to_string(),
            path: keys::release_rel(version),
            updated_at: Utc::now().to_rfc3339(),
        };
        let body = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| ImprintError::Internal(format!("manifest serialization: {e}")))?;
        self.store
            .put(
                &keys::manifest(doc_id),
                Bytes::from(body),
                &ObjectMeta::json(CACHE_MANIFEST),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manifest(latest: &str) -> ReleaseManifest {
        ReleaseManifest {
            latest: latest.to_string(),
            path: keys::release_rel(latest),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn next_version_increments_with_padding() {
        assert_eq!(ManifestStore::next_version(None).unwrap(), "0001");
        assert_eq!(
            ManifestStore::next_version(Some(&manifest("0003"))).unwrap(),
            "0004"
        );
        assert_eq!(
            ManifestStore::next_version(Some(&manifest("0009"))).unwrap(),
            "0010"
        );
    }

    #[test]
    fn next_version_grows_past_four_digits() {
        assert_eq!(
            ManifestStore::next_version(Some(&manifest("9999"))).unwrap(),
            "10000"
        );
        assert_eq!(
            ManifestStore::next_version(Some(&manifest("10000"))).unwrap(),
            "10001"
        );
    }

    #[test]
    fn next_version_rejects_garbage_counters() {
        for bad in ["abcd", "-3", "12.5", ""] {
            let err = ManifestStore::next_version(Some(&manifest(bad))).unwrap_err();
            assert!(matches!(err, ImprintError::VersionFormat(_)), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn read_treats_unparsable_manifest_as_absent() {
        let store = Arc::new(MemoryStore::new("http://127.0.0.1:3001"));
        store
            .put(
                &keys::manifest("d1"),
                Bytes::from_static(b"not json"),
                &ObjectMeta::json(CACHE_MANIFEST),
            )
            .await
            .unwrap();

        let manifests = ManifestStore::new(store);
        assert!(manifests.read("d1").await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips_and_derives_path() {
        let store = Arc::new(MemoryStore::new("http://127.0.0.1:3001"));
        let manifests = ManifestStore::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

        manifests.write("d1", "0042").await.unwrap();
        let read = manifests.read("d1").await.unwrap();
        assert_eq!(read.latest, "0042");
        assert_eq!(read.path, "releases/0042.json");

        let stored = store.get_object(&keys::manifest("d1")).unwrap();
        assert_eq!(stored.meta.cache_control, CACHE_MANIFEST);
    }
}
