//! Development-mode object routes
//!
//! With the in-memory store there is no real bucket for presigned uploads to
//! land in, so the gateway serves both halves itself:
//!
//! - `PUT /dev/put/<key>?expires=<unix>` - target of MemoryStore upload grants
//! - `GET /dev/get/<key>` - public read URL for stored objects
//!
//! Only mounted when `--dev-mode` is set.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

use crate::routes::api::{error_response, json_response, read_body};
use crate::store::{MemoryStore, ObjectMeta, ObjectStore as _};
use crate::types::ImprintError;

/// Accept an upload against a previously issued grant
pub async fn handle_dev_put(
    req: Request<Incoming>,
    memory: Arc<MemoryStore>,
) -> Response<Full<Bytes>> {
    let uri = req.uri().clone();
    let Some(key) = uri.path().strip_prefix("/dev/put/").map(str::to_string) else {
        return error_response(ImprintError::BadRequest("missing object key".to_string()));
    };

    // Grants carry their deadline in the query string
    let expires = uri
        .query()
        .and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("expires="))
                .and_then(|v| v.parse::<i64>().ok())
        })
        .unwrap_or(0);
    if expires < chrono::Utc::now().timestamp() {
        return error_response(ImprintError::BadRequest("upload grant expired".to_string()));
    }

    let meta = ObjectMeta {
        content_type: header_string(&req, "content-type", "application/json"),
        cache_control: header_string(&req, "cache-control", "no-store"),
    };

    let body = match read_body(req).await {
        Ok(body) => body,
        Err(e) => return error_response(e),
    };

    if let Err(e) = memory.put(&key, body, &meta).await {
        return error_response(e);
    }
    debug!(key = %key, count = memory.object_count(), "dev object stored");
    json_response(StatusCode::OK, &serde_json::json!({ "stored": key }))
}

/// Serve a stored object with its recorded metadata
pub fn handle_dev_get(path: &str, memory: &MemoryStore) -> Response<Full<Bytes>> {
    let Some(key) = path.strip_prefix("/dev/get/") else {
        return error_response(ImprintError::NotFound(path.to_string()));
    };

    match memory.get_object(key) {
        Some(object) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", object.meta.content_type)
            .header("cache-control", object.meta.cache_control)
            .header("access-control-allow-origin", "*")
            .body(Full::new(object.body))
            .unwrap(),
        None => error_response(ImprintError::NotFound(key.to_string())),
    }
}

fn header_string(req: &Request<Incoming>, name: &str, default: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(default)
        .to_string()
}
