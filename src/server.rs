use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::api;
use crate::cache::{EmbeddingCache, InMemoryCache, JsonFileCache, PgEmbeddingCache};
use crate::config::AppConfig;
use crate::inference::{ClipEmbedder, Detector, HttpDetector, NoopDetector};
use crate::ingest::{HttpImageFetcher, IngestDeps};
use crate::persistence::{
    BlobStore, RecordStore,
    providers::{
        local::LocalBlobStore, memory::InMemoryRecordStore, postgres::PostgresRecordStore,
        supabase::SupabaseClient,
    },
};

fn supabase_client(config: &AppConfig) -> anyhow::Result<Arc<SupabaseClient>> {
    let sb = config
        .supabase
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("supabase.url and supabase.key must be set"))?;
    Ok(Arc::new(SupabaseClient::new(
        sb,
        &config.persistence.table,
        &config.storage.bucket,
    )?))
}

fn database_url(config: &AppConfig) -> anyhow::Result<&str> {
    config
        .persistence
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("persistence.database_url must be set"))
}

/// Build the record store, blob store and embedding cache chosen in `config`.
async fn build_storage(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn RecordStore>, Arc<dyn BlobStore>, Arc<dyn EmbeddingCache>)> {
    let mut pg_store: Option<PostgresRecordStore> = None;
    let records: Arc<dyn RecordStore> = match config.persistence.provider.as_str() {
        "supabase" => supabase_client(config)?,
        "postgres" => {
            let store =
                PostgresRecordStore::connect(database_url(config)?, config.persistence.max_connections)
                    .await?;
            pg_store = Some(store.clone());
            Arc::new(store)
        }
        "memory" => Arc::new(InMemoryRecordStore::new()),
        other => anyhow::bail!("unknown persistence provider: {other}"),
    };

    let blobs: Arc<dyn BlobStore> = match config.storage.provider.as_str() {
        "supabase" => supabase_client(config)?,
        "local" => Arc::new(LocalBlobStore::new(
            &config.storage.local_dir,
            &config.local_files_base_url(),
        )),
        other => anyhow::bail!("unknown storage provider: {other}"),
    };

    let cache: Arc<dyn EmbeddingCache> = match config.cache.provider.as_str() {
        "file" => Arc::new(JsonFileCache::new(&config.cache.path)),
        "postgres" => match &pg_store {
            Some(store) => Arc::new(PgEmbeddingCache::with_pool(store.get_pool().clone()).await?),
            None => Arc::new(
                PgEmbeddingCache::connect(database_url(config)?, config.persistence.max_connections)
                    .await?,
            ),
        },
        "memory" => Arc::new(InMemoryCache::new()),
        other => anyhow::bail!("unknown cache provider: {other}"),
    };

    info!(
        records = records.provider_name(),
        blobs = blobs.provider_name(),
        cache = cache.provider_name(),
        "Storage initialized"
    );

    Ok((records, blobs, cache))
}

/// Construct every adapter named in `config`, loading models once.
pub async fn build_deps(config: &AppConfig) -> anyhow::Result<IngestDeps> {
    let (records, blobs, cache) = build_storage(config).await?;

    let detector: Arc<dyn Detector> = match config.detection.provider.as_str() {
        "http" => Arc::new(HttpDetector::new(&config.detection)?),
        "none" => Arc::new(NoopDetector),
        other => anyhow::bail!("unknown detection provider: {other}"),
    };

    let embedding_config = config.embedding.clone();
    let embedder = tokio::task::spawn_blocking(move || ClipEmbedder::load(&embedding_config))
        .await??;

    info!(
        name: "models.loaded",
        detector = detector.provider_name(),
        embedder = %config.embedding.model,
        "Models loaded"
    );

    Ok(IngestDeps {
        records,
        blobs,
        cache,
        detector,
        embedder: Arc::new(embedder),
        fetcher: Arc::new(HttpImageFetcher::new()),
    })
}

/// Router with every middleware layer applied.
pub fn build_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut app = api::router();

    if config.storage.provider == "local" {
        app = app.nest_service("/files", ServeDir::new(&config.storage.local_dir));
    }

    // Always layered; "disabled" means a timeout nobody will hit.
    let timeout_duration = if config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(config.resilience.timeout_secs)
    };

    app.layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api::rate_limit::rate_limit_middleware,
        ))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let deps = build_deps(&config).await?;
    let state = AppState::new(Arc::clone(&config), deps);
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
