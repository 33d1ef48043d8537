//! HTTP routes for Imprint

pub mod api;
pub mod dev;
pub mod health;

pub use api::{handle_documents, handle_presigned_url, handle_publish};
pub use dev::{handle_dev_get, handle_dev_put};
pub use health::{health_check, version_info};
