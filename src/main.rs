//! Recall server entry point.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use recall_server::{config::AppConfig, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init();

    let config = Arc::new(AppConfig::load()?);

    info!(
        name: "config.loaded",
        persistence = %config.persistence.provider,
        storage = %config.storage.provider,
        cache = %config.cache.provider,
        detection = %config.detection.provider,
        "Configuration loaded"
    );

    server::start_server(config).await
}
