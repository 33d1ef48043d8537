//! HTTP server for Imprint

pub mod http;

pub use http::{run, AppState};
