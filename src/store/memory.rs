//! In-memory object store for development mode and tests
//!
//! Upload grants point back at the gateway's own `/dev/put/<key>` route with
//! an `expires` deadline in the query string, standing in for SigV4 query
//! presigning. Reads go through `/dev/get/<key>`.

use crate::store::{ObjectMeta, ObjectStore};
use crate::types::{ImprintError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub meta: ObjectMeta,
}

/// DashMap-backed object store
pub struct MemoryStore {
    objects: DashMap<String, StoredObject>,
    base_url: String,
}

impl MemoryStore {
    /// `base_url` is the gateway's own address, e.g. `http://127.0.0.1:3001`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            objects: DashMap::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Raw object access for the dev read route
    pub fn get_object(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|o| o.value().clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.objects.get(key).map(|o| o.body.clone()))
    }

    async fn put(&self, key: &str, body: Bytes, meta: &ObjectMeta) -> Result<()> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body,
                meta: meta.clone(),
            },
        );
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str, meta: &ObjectMeta) -> Result<()> {
        let source = self
            .objects
            .get(src)
            .map(|o| o.body.clone())
            .ok_or_else(|| ImprintError::NotFound(format!("copy source {src}")))?;
        self.objects.insert(
            dst.to_string(),
            StoredObject {
                body: source,
                meta: meta.clone(),
            },
        );
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        _meta: &ObjectMeta,
        expires_in: Duration,
    ) -> Result<String> {
        let deadline = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!("{}/dev/put/{key}?expires={deadline}", self.base_url))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/dev/get/{key}", self.base_url)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{keys, CACHE_DRAFT, CACHE_RELEASE};

    #[tokio::test]
    async fn get_of_missing_key_is_none() {
        let store = MemoryStore::new("http://127.0.0.1:3001");
        assert!(store.get("docs/x/manifest.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn copy_replaces_metadata() {
        let store = MemoryStore::new("http://127.0.0.1:3001");
        let draft = keys::draft("d1");
        store
            .put(&draft, Bytes::from_static(b"{}"), &ObjectMeta::json(CACHE_DRAFT))
            .await
            .unwrap();

        let release = keys::release("d1", "0001");
        store
            .copy(&draft, &release, &ObjectMeta::json(CACHE_RELEASE))
            .await
            .unwrap();

        let stored = store.get_object(&release).unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"{}"));
        assert_eq!(stored.meta.cache_control, CACHE_RELEASE);
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let store = MemoryStore::new("http://127.0.0.1:3001");
        let err = store
            .copy("docs/d1/drafts/current.json", "docs/d1/releases/0001.json", &ObjectMeta::json(CACHE_RELEASE))
            .await
            .unwrap_err();
        assert!(matches!(err, ImprintError::NotFound(_)));
    }

    #[tokio::test]
    async fn grant_url_targets_the_exact_key_with_a_deadline() {
        let store = MemoryStore::new("http://127.0.0.1:3001");
        let url = store
            .presign_put(
                &keys::draft("d1"),
                &ObjectMeta::json(CACHE_DRAFT),
                Duration::from_secs(300),
            )
            .await
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:3001/dev/put/docs/d1/drafts/current.json?expires="));
    }
}
