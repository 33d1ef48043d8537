//! Configuration for Imprint
//!
//! CLI arguments and environment variable handling using clap.
//! All configuration is resolved once at startup and passed into components
//! explicitly; nothing reads ambient process state after parse.

use clap::Parser;
use std::net::SocketAddr;

/// Imprint - draft-to-release publishing gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "imprint")]
#[command(about = "Publishing gateway: presigned draft uploads, versioned releases")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3001")]
    pub listen: SocketAddr,

    /// Object storage bucket holding drafts, manifests and releases
    #[arg(long, env = "BUCKET", default_value = "imprint-docs")]
    pub bucket: String,

    /// Object storage region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// S3-compatible endpoint override (e.g. "http://localhost:9000" for MinIO)
    /// When unset, the standard regional S3 endpoint is used.
    #[arg(long, env = "S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Object storage access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    /// Object storage secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    pub secret_access_key: Option<String>,

    /// Enable development mode (in-memory object store, /dev/* routes)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Lifetime of presigned draft-upload URLs in seconds
    #[arg(long, env = "PRESIGN_EXPIRY_SECONDS", default_value = "300")]
    pub presign_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Resolved endpoint for the object store
    pub fn store_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", self.region))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.access_key_id.is_none() || self.secret_access_key.is_none() {
                return Err(
                    "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required outside dev mode"
                        .to_string(),
                );
            }
        }

        if self.presign_expiry_seconds == 0 {
            return Err("PRESIGN_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }
}
