//! Imprint - draft-to-release publishing gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imprint::{
    config::Args,
    server::{self, AppState},
    store::{s3::Credentials, MemoryStore, ObjectStore, S3Store},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("imprint={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Imprint - publishing gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Bucket: {}", args.bucket);
    info!("Region: {}", args.region);
    info!("Endpoint: {}", args.store_endpoint());
    info!("Presign expiry: {}s", args.presign_expiry_seconds);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("======================================");

    let state = if args.dev_mode {
        let memory = Arc::new(MemoryStore::new(format!("http://{}", args.listen)));
        AppState::dev(args, memory)
    } else {
        let credentials = Credentials {
            // validate() guarantees both are present outside dev mode
            access_key_id: args.access_key_id.clone().unwrap_or_default(),
            secret_access_key: args.secret_access_key.clone().unwrap_or_default(),
        };
        let store = S3Store::new(&args.store_endpoint(), &args.bucket, &args.region, credentials)?;
        AppState::new(args, Arc::new(store) as Arc<dyn ObjectStore>)
    };

    server::run(Arc::new(state)).await?;
    Ok(())
}
