//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection and a
//! match-based router. The gateway is CORS-open like the editor expects;
//! every API response carries permissive CORS headers and OPTIONS preflights
//! are answered directly.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::publish::Publisher;
use crate::routes;
use crate::store::{MemoryStore, ObjectStore};
use crate::types::{ImprintError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Object store backing drafts, manifests and releases
    pub store: Arc<dyn ObjectStore>,
    /// Publish orchestrator over the same store
    pub publisher: Publisher,
    /// Dev-mode handle for the /dev/* object routes
    pub memory: Option<Arc<MemoryStore>>,
    pub started_at: Instant,
}

impl AppState {
    /// State over a production object store
    pub fn new(args: Args, store: Arc<dyn ObjectStore>) -> Self {
        let publisher = Publisher::new(Arc::clone(&store));
        Self {
            args,
            store,
            publisher,
            memory: None,
            started_at: Instant::now(),
        }
    }

    /// Dev-mode state: in-memory store plus the /dev/* routes serving it
    pub fn dev(args: Args, memory: Arc<MemoryStore>) -> Self {
        let store: Arc<dyn ObjectStore> = Arc::clone(&memory) as Arc<dyn ObjectStore>;
        let publisher = Publisher::new(Arc::clone(&store));
        Self {
            args,
            store,
            publisher,
            memory: Some(memory),
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Imprint listening on {}", state.args.listen);
    if state.args.dev_mode {
        info!("Development mode - in-memory object store, /dev/* routes enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move {
                            Ok::<_, hyper::Error>(handle_request(state, req).await)
                        }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!(method = %method, path = %path, "request");

    match (method, path.as_str()) {
        // Liveness probe - also the session's reachability check
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        // Publishing API
        (Method::POST, "/api/get-presigned-url") => {
            routes::handle_presigned_url(req, Arc::clone(&state)).await
        }
        (Method::POST, "/api/publish") => routes::handle_publish(req, Arc::clone(&state)).await,
        (Method::GET, "/api/documents") => routes::handle_documents(),

        // Dev-mode object routes backing MemoryStore grants and reads
        (Method::PUT, p) if p.starts_with("/dev/put/") => match dev_store(&state) {
            Some(memory) => routes::handle_dev_put(req, memory).await,
            None => not_found_response(&path),
        },
        (Method::GET, p) if p.starts_with("/dev/get/") => match dev_store(&state) {
            Some(memory) => routes::handle_dev_get(p, memory.as_ref()),
            None => not_found_response(&path),
        },

        _ => not_found_response(&path),
    }
}

fn dev_store(state: &AppState) -> Option<Arc<MemoryStore>> {
    if !state.args.dev_mode {
        return None;
    }
    state.memory.as_ref().map(Arc::clone)
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("access-control-allow-origin", "*")
        .header("access-control-allow-methods", "GET, POST, PUT, OPTIONS")
        .header("access-control-allow-headers", "content-type, cache-control")
        .header("access-control-max-age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let err = ImprintError::NotFound(format!("no route for {path}"));
    crate::routes::api::error_response(err)
}
