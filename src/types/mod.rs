//! Shared types for Imprint

pub mod error;

pub use error::{ImprintError, Result};
