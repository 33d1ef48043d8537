//! Health check endpoint
//!
//! `/health` and `/healthz` report liveness. Document sessions probe this
//! once at startup to decide whether to run in remote or local-only mode.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;
use crate::store::ObjectStore as _;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    pub mode: String,
    pub store: StoreHealth,
}

#[derive(Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub bucket: String,
}

/// Liveness probe: 200 whenever the gateway is running
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        store: StoreHealth {
            backend: state.store.backend_name(),
            bucket: state.args.bucket.clone(),
        },
    };

    let body = serde_json::to_string(&response).unwrap_or_else(|_| "{\"healthy\":true}".into());
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Version info for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    });
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
