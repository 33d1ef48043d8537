//! Backend seam for document sessions
//!
//! The session drives everything remote through the `Backend` trait: grant
//! requests and publishes go to the gateway API, draft uploads go straight to
//! the granted URL, and published reads follow manifest → release against the
//! public bucket base with caches explicitly bypassed.

use crate::document::Document;
use crate::manifest::ReleaseManifest;
use crate::routes::api::{PublishResponse, UploadGrant};
use crate::types::{ImprintError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

/// Remote operations a session needs; implemented over HTTP in production
/// and by an in-process double in tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// One-shot reachability probe, run at session start
    async fn health(&self) -> bool;

    /// Ask the gateway for a short-lived draft upload grant
    async fn request_upload_grant(&self, doc_id: &str) -> Result<UploadGrant>;

    /// Upload the full document JSON against a grant
    async fn upload_draft(&self, grant: &UploadGrant, document: &Document) -> Result<()>;

    /// Promote the uploaded draft to a new release; returns the version
    async fn publish(&self, doc_id: &str) -> Result<String>;

    /// Resolve manifest → release for a published document.
    /// `None` when nothing is published yet; that is a normal state.
    async fn fetch_published(&self, doc_id: &str) -> Result<Option<Document>>;
}

/// HTTP backend: gateway API plus direct bucket reads
pub struct HttpBackend {
    http: reqwest::Client,
    /// Gateway base, e.g. `http://localhost:3001`
    api_base: String,
    /// Public bucket base the manifest and release URLs hang off
    store_base: String,
}

impl HttpBackend {
    pub fn new(api_base: impl Into<String>, store_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        let store_base: String = store_base.into();
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            store_base: store_base.trim_end_matches('/').to_string(),
        }
    }

    /// GET a bucket object with caches bypassed: releases move behind the
    /// manifest, so readers must see the newest pointer.
    async fn fetch_fresh(&self, path: &str) -> Result<Option<reqwest::Response>> {
        let url = format!(
            "{}/{}?t={}",
            self.store_base,
            path,
            Utc::now().timestamp_millis()
        );
        let resp = self
            .http
            .get(&url)
            .header("cache-control", "no-cache, no-store, must-revalidate")
            .header("pragma", "no-cache")
            .send()
            .await?;
        if !resp.status().is_success() {
            debug!(url = %url, status = %resp.status(), "fresh fetch missed");
            return Ok(None);
        }
        Ok(Some(resp))
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .http
            .post(format!("{}{route}", self.api_base))
            .json(body)
            .send()
            .await?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> bool {
        match self.http.get(format!("{}/health", self.api_base)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "gateway health probe failed");
                false
            }
        }
    }

    async fn request_upload_grant(&self, doc_id: &str) -> Result<UploadGrant> {
        let resp = self
            .post_json("/api/get-presigned-url", &serde_json::json!({ "docId": doc_id }))
            .await?;
        if !resp.status().is_success() {
            return Err(ImprintError::Store(format!(
                "grant request returned {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    async fn upload_draft(&self, grant: &UploadGrant, document: &Document) -> Result<()> {
        let resp = self
            .http
            .put(&grant.url)
            .header("content-type", "application/json")
            .header("cache-control", "no-store")
            .json(document)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ImprintError::Store(format!(
                "draft upload returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn publish(&self, doc_id: &str) -> Result<String> {
        let resp = self
            .post_json("/api/publish", &serde_json::json!({ "docId": doc_id }))
            .await?;
        if !resp.status().is_success() {
            return Err(ImprintError::PublishFailed(format!(
                "publish returned {}",
                resp.status()
            )));
        }
        let result: PublishResponse = resp.json().await?;
        if !result.success {
            return Err(ImprintError::PublishFailed("gateway reported failure".into()));
        }
        Ok(result.version)
    }

    async fn fetch_published(&self, doc_id: &str) -> Result<Option<Document>> {
        let Some(manifest_resp) = self
            .fetch_fresh(&format!("docs/{doc_id}/manifest.json"))
            .await?
        else {
            return Ok(None);
        };
        let manifest: ReleaseManifest = manifest_resp.json().await?;

        let Some(release_resp) = self
            .fetch_fresh(&format!("docs/{doc_id}/{}", manifest.path))
            .await?
        else {
            return Ok(None);
        };
        let document: Document = release_resp.json().await?;
        if !document.is_published {
            return Ok(None);
        }
        Ok(Some(document))
    }
}
