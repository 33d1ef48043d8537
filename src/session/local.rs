//! Local snapshot persistence
//!
//! One JSON file per document id in a configured directory. This is the
//! durable local fallback: saves always land here even when the backend is
//! unreachable, and loads fall back here when no published release resolves.
//! Writes are best-effort; a failed write downgrades gracefully rather than
//! failing the save.

use crate::document::Document;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Directory-backed snapshot store
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snapshot_path(&self, doc_id: &str) -> PathBuf {
        // Document ids are opaque strings; keep the file name filesystem-safe
        let safe: String = doc_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Load the most recent snapshot for a document, or `None` when absent
    /// or unreadable.
    pub async fn load(&self, doc_id: &str) -> Option<Document> {
        let path = self.snapshot_path(doc_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(_) => return None,
        };
        match serde_json::from_slice(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot unreadable, ignoring");
                None
            }
        }
    }

    /// Persist a snapshot. Returns whether the write landed.
    pub async fn save(&self, document: &Document) -> bool {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "snapshot dir unavailable");
            return false;
        }
        let path = self.snapshot_path(&document.id);
        let body = match serde_json::to_vec_pretty(document) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "snapshot serialization failed");
                return false;
            }
        };
        match tokio::fs::write(&path, body).await {
            Ok(()) => {
                debug!(path = %path.display(), "snapshot written");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let doc = Document::new("doc-1", "Title", json!({ "k": 1 }));
        assert!(store.save(&doc).await);
        assert_eq!(store.load("doc-1").await.unwrap(), doc);
    }

    #[tokio::test]
    async fn load_of_unknown_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load("nope").await.is_none());
    }

    #[tokio::test]
    async fn hostile_ids_stay_inside_the_snapshot_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let doc = Document::new("../../etc/passwd", "Title", json!({}));
        assert!(store.save(&doc).await);
        assert!(store.load("../../etc/passwd").await.is_some());
        // Everything written stays directly under the store dir
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.next().is_some());
    }
}
