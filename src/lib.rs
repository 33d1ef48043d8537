//! Imprint - draft-to-release publishing gateway for living planning documents
//!
//! Imprint stores one mutable draft per document in an object-storage bucket
//! and promotes drafts to immutable, versioned releases behind a manifest
//! pointer. Readers follow the manifest to the current release; writers upload
//! drafts through short-lived presigned URLs issued by this gateway.
//!
//! ## Services
//!
//! - **Gateway**: HTTP API for presigned draft uploads and publish requests
//! - **Publisher**: draft → release promotion with monotonic version counters
//! - **Session**: client-side document façade with local snapshots and a
//!   capped version history

pub mod config;
pub mod document;
pub mod manifest;
pub mod publish;
pub mod routes;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ImprintError, Result};
