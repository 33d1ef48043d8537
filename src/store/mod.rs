//! Object storage access
//!
//! One bucket holds every document under a fixed key scheme:
//!
//! ```text
//! docs/<docId>/drafts/current.json      mutable, no-store
//! docs/<docId>/manifest.json            mutable, short cache
//! docs/<docId>/releases/<NNNN>.json     immutable, long cache
//! ```
//!
//! The store is plain eventually-consistent key-value storage: no locking,
//! no transactions, no conditional writes. Concurrent publishers race on the
//! manifest key and the last write wins.

pub mod memory;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

use crate::types::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Cache policy for drafts: always re-fetched fresh
pub const CACHE_DRAFT: &str = "no-store";
/// Cache policy for manifests: readers observe new releases within a minute
pub const CACHE_MANIFEST: &str = "max-age=60, must-revalidate";
/// Cache policy for releases: content at a release key never changes
pub const CACHE_RELEASE: &str = "max-age=31536000, immutable";

/// Metadata stored alongside an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub cache_control: String,
}

impl ObjectMeta {
    /// JSON object with the given cache policy
    pub fn json(cache_control: &str) -> Self {
        Self {
            content_type: "application/json".to_string(),
            cache_control: cache_control.to_string(),
        }
    }
}

/// Object store contract: PUT/GET/COPY plus presigned-upload issuance.
///
/// Implementations convert transport failures into `ImprintError::Store`;
/// an absent key on `get` is `Ok(None)`, never an error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, or `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write an object, overwriting any previous content
    async fn put(&self, key: &str, body: Bytes, meta: &ObjectMeta) -> Result<()>;

    /// Server-side copy with metadata replacement.
    /// Fails with `ImprintError::NotFound` when the source key is absent.
    async fn copy(&self, src: &str, dst: &str, meta: &ObjectMeta) -> Result<()>;

    /// Issue a time-boxed URL allowing one PUT to exactly this key
    async fn presign_put(&self, key: &str, meta: &ObjectMeta, expires_in: Duration)
        -> Result<String>;

    /// Public read URL for an object (used by clients that read the bucket
    /// directly, bypassing this gateway)
    fn public_url(&self, key: &str) -> String;

    /// Short backend label for health reporting
    fn backend_name(&self) -> &'static str;
}

/// Storage key helpers for the per-document layout
pub mod keys {
    /// Mutable working copy: `docs/<docId>/drafts/current.json`
    pub fn draft(doc_id: &str) -> String {
        format!("docs/{doc_id}/drafts/current.json")
    }

    /// Release pointer record: `docs/<docId>/manifest.json`
    pub fn manifest(doc_id: &str) -> String {
        format!("docs/{doc_id}/manifest.json")
    }

    /// Immutable release snapshot: `docs/<docId>/releases/<NNNN>.json`
    pub fn release(doc_id: &str, version: &str) -> String {
        format!("docs/{doc_id}/releases/{version}.json")
    }

    /// Manifest-relative release path: `releases/<NNNN>.json`
    pub fn release_rel(version: &str) -> String {
        format!("releases/{version}.json")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn key_scheme_matches_layout() {
            assert_eq!(draft("d1"), "docs/d1/drafts/current.json");
            assert_eq!(manifest("d1"), "docs/d1/manifest.json");
            assert_eq!(release("d1", "0007"), "docs/d1/releases/0007.json");
            assert_eq!(release_rel("0007"), "releases/0007.json");
        }
    }
}
