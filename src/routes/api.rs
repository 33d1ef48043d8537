//! Publishing API routes
//!
//! - `POST /api/get-presigned-url` - issue a short-lived draft upload grant
//! - `POST /api/publish` - promote the current draft to a new release
//! - `GET /api/documents` - demo document listing

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::document::DocumentListing;
use crate::server::AppState;
use crate::store::{keys, ObjectMeta, ObjectStore as _, CACHE_DRAFT};
use crate::types::{ImprintError, Result};

/// Request body shared by the grant and publish endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocRequest {
    #[serde(default)]
    doc_id: Option<String>,
}

/// Upload grant handed to draft writers
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub url: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    pub version: String,
}

/// Extract the required `docId` from a request body.
/// Missing or blank ids are a `BadRequest`, surfaced as 400 with no retry.
pub(crate) fn parse_doc_id(body: &[u8]) -> Result<String> {
    let request: DocRequest = serde_json::from_slice(body)
        .map_err(|e| ImprintError::BadRequest(format!("invalid request body: {e}")))?;
    match request.doc_id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ImprintError::BadRequest("docId required".to_string())),
    }
}

/// `POST /api/get-presigned-url` - grant one draft upload for a document.
///
/// The URL is scoped to exactly `docs/<docId>/drafts/current.json` and
/// expires after the configured window. Drafts are stored with `no-store`
/// so readers always fetch them fresh.
pub async fn handle_presigned_url(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let body = match read_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    let doc_id = match parse_doc_id(&body) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    let expires_in = Duration::from_secs(state.args.presign_expiry_seconds);
    match state
        .store
        .presign_put(&keys::draft(&doc_id), &ObjectMeta::json(CACHE_DRAFT), expires_in)
        .await
    {
        Ok(url) => {
            info!(doc_id = %doc_id, expires_in = expires_in.as_secs(), "upload grant issued");
            json_response(
                StatusCode::OK,
                &UploadGrant {
                    url,
                    expires_in_seconds: expires_in.as_secs(),
                },
            )
        }
        Err(e) => {
            error!(doc_id = %doc_id, error = %e, "grant issuance failed");
            error_response(ImprintError::Internal(
                "failed to generate presigned URL".to_string(),
            ))
        }
    }
}

/// `POST /api/publish` - draft → release promotion plus manifest update
pub async fn handle_publish(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let body = match read_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };
    let doc_id = match parse_doc_id(&body) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    match state.publisher.publish(&doc_id).await {
        Ok(version) => json_response(
            StatusCode::OK,
            &PublishResponse {
                success: true,
                version,
            },
        ),
        Err(e) => {
            error!(doc_id = %doc_id, error = %e, "publish failed");
            error_response(e)
        }
    }
}

/// `GET /api/documents` - static demo listing, not tied to storage state
pub fn handle_documents() -> Response<Full<Bytes>> {
    let listing = vec![DocumentListing {
        id: "planning-main".to_string(),
        title: "1:1 Video Chat - Product Plan".to_string(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    }];
    json_response(StatusCode::OK, &listing)
}

/// Collect a request body, capped to keep a bad client from ballooning memory
pub(crate) async fn read_body(req: Request<Incoming>) -> Result<Bytes> {
    const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| ImprintError::BadRequest(format!("body read failed: {e}")))?
        .to_bytes();
    if body.len() > MAX_BODY_BYTES {
        return Err(ImprintError::BadRequest("request body too large".to_string()));
    }
    Ok(body)
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("access-control-allow-origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

pub(crate) fn error_response(err: ImprintError) -> Response<Full<Bytes>> {
    let (status, message) = err.into_status_code_and_body();
    json_response(status, &serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_doc_id_accepts_well_formed_bodies() {
        assert_eq!(parse_doc_id(br#"{"docId":"planning-main"}"#).unwrap(), "planning-main");
    }

    #[test]
    fn parse_doc_id_rejects_missing_or_blank_ids() {
        for body in [&b"{}"[..], br#"{"docId":""}"#, br#"{"docId":"  "}"#, b"not json"] {
            let err = parse_doc_id(body).unwrap_err();
            assert!(matches!(err, ImprintError::BadRequest(_)));
        }
    }
}
