//! Document session: the stateful façade the editor drives
//!
//! A session ties together local snapshot persistence, the remote
//! draft/publish workflow and the capped version history. Backend
//! reachability is probed once at startup; the result fixes remote behavior
//! for the session's lifetime.

pub mod client;
pub mod history;
pub mod local;

pub use client::{Backend, HttpBackend};
pub use history::{diff_payloads, VersionEntry, VersionHistory, HISTORY_CAP};
pub use local::SnapshotStore;

use crate::document::{migrate_payload, Document};
use crate::types::{ImprintError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loading,
    Ready,
}

/// Where a save landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Snapshot written locally; no remote upload was attempted or it failed
    LocalOnly,
    /// Snapshot written locally and the draft uploaded to the backend
    Synced,
}

/// Session configuration, fixed at construction
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Author label stamped on version-history entries
    pub author: String,
    /// Base for share locators, e.g. `https://plan.example.com/`
    pub share_base: String,
    /// Directory for local document snapshots
    pub snapshot_dir: PathBuf,
    /// Document id used when none is supplied to `load`
    pub default_doc_id: String,
}

/// The unit the editor drives
pub struct DocumentSession {
    backend: Arc<dyn Backend>,
    snapshots: SnapshotStore,
    config: SessionConfig,
    state: SessionState,
    /// Fixed at startup by the reachability probe
    remote_available: bool,
    publish_in_flight: bool,
    document: Document,
    /// Snapshot the next save diffs against
    last_saved: Document,
    history: VersionHistory,
    share_url: Option<String>,
}

impl DocumentSession {
    /// Construct a session and run the one-shot reachability probe.
    pub async fn start(config: SessionConfig, backend: Arc<dyn Backend>) -> Self {
        let remote_available = backend.health().await;
        if remote_available {
            info!("backend reachable, session in remote mode");
        } else {
            warn!("backend unreachable, session in local-only mode");
        }

        let snapshots = SnapshotStore::new(config.snapshot_dir.clone());
        let document = Document::starter(&config.default_doc_id);
        let last_saved = document.clone();
        Self {
            backend,
            snapshots,
            config,
            state: SessionState::Unloaded,
            remote_available,
            publish_in_flight: false,
            document,
            last_saved,
            history: VersionHistory::default(),
            share_url: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remote_available(&self) -> bool {
        self.remote_available
    }

    pub fn publish_in_flight(&self) -> bool {
        self.publish_in_flight
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for the editor between saves
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn share_url(&self) -> Option<&str> {
        self.share_url.as_deref()
    }

    /// Hydrate the session.
    ///
    /// With a document id and a reachable backend, resolution goes
    /// manifest → release; a miss is a normal "nothing published yet" state,
    /// not an error, and falls back to the local snapshot, then the built-in
    /// starter document. Loaded payloads pass through schema migration once.
    pub async fn load(&mut self, doc_id: Option<&str>) {
        self.state = SessionState::Loading;
        let doc_id = doc_id.unwrap_or(&self.config.default_doc_id).to_string();

        if self.remote_available {
            match self.backend.fetch_published(&doc_id).await {
                Ok(Some(mut document)) => {
                    document.data = migrate_payload(document.data);
                    self.share_url = Some(self.share_locator(&document.id));
                    self.hydrate(document);
                    return;
                }
                Ok(None) => {
                    info!(doc_id = %doc_id, "no published release, falling back to local state");
                }
                Err(e) => {
                    warn!(doc_id = %doc_id, error = %e, "published load failed, falling back");
                }
            }
        }

        if let Some(mut document) = self.snapshots.load(&doc_id).await {
            document.data = migrate_payload(document.data);
            self.hydrate(document);
            return;
        }

        self.hydrate(Document::starter(&doc_id));
    }

    fn hydrate(&mut self, document: Document) {
        self.last_saved = document.clone();
        self.document = document;
        self.state = SessionState::Ready;
    }

    /// Save the current document.
    ///
    /// Diffs against the last-saved snapshot and records a history entry when
    /// anything changed. The local snapshot always gets written; the draft
    /// upload is attempted only in remote mode, and its failure downgrades
    /// the outcome instead of failing the save.
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let changes = diff_payloads(&self.last_saved.data, &self.document.data);
        if self.history.record(changes, &self.config.author) {
            self.document.updated_at = chrono::Utc::now().timestamp_millis();
        }
        self.last_saved = self.document.clone();

        self.snapshots.save(&self.document).await;

        if !self.remote_available {
            return Ok(SaveOutcome::LocalOnly);
        }

        match self.upload_draft().await {
            Ok(()) => Ok(SaveOutcome::Synced),
            Err(e) => {
                warn!(error = %e, "draft upload failed, saved locally only");
                Ok(SaveOutcome::LocalOnly)
            }
        }
    }

    async fn upload_draft(&self) -> Result<()> {
        let grant = self
            .backend
            .request_upload_grant(&self.document.id)
            .await?;
        self.backend.upload_draft(&grant, &self.document).await
    }

    /// Publish the current state as a new release.
    ///
    /// The draft must reflect the current document, so this saves first and
    /// requires the upload to have landed. On success the session flips to
    /// published and records the shareable locator.
    pub async fn publish(&mut self) -> Result<String> {
        if !self.remote_available {
            return Err(ImprintError::RemoteUnavailable(
                "cannot publish in local-only mode".to_string(),
            ));
        }

        self.publish_in_flight = true;
        let result = self.publish_inner().await;
        self.publish_in_flight = false;
        result
    }

    async fn publish_inner(&mut self) -> Result<String> {
        match self.save().await? {
            SaveOutcome::Synced => {}
            SaveOutcome::LocalOnly => {
                return Err(ImprintError::PublishFailed(
                    "draft upload did not land, publish would promote stale state".to_string(),
                ));
            }
        }

        let version = self.backend.publish(&self.document.id).await?;
        self.document.is_published = true;
        self.last_saved.is_published = true;
        self.share_url = Some(self.share_locator(&self.document.id));
        info!(doc_id = %self.document.id, version = %version, "published");
        Ok(version)
    }

    fn share_locator(&self, doc_id: &str) -> String {
        format!("{}?doc={doc_id}", self.config.share_base)
    }
}

/// Extract a document id from a share locator, `<base>?doc=<docId>`
pub fn doc_id_from_share_url(share_url: &str) -> Option<String> {
    let parsed = Url::parse(share_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "doc")
        .map(|(_, v)| v.into_owned())
}
