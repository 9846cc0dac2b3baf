//! Recall server
//!
//! Photo memories with automatic tagging and semantic search.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP API (`/scan`, `/memories`, `/search`, `/reindex`)
//! - **Ingest**: upload flow (detection, storage, embedding) and reindexing
//! - **Search**: tag matching plus CLIP similarity over cached embeddings
//! - **Adapters**: record/blob stores, embedding cache, detector and embedder,
//!   each injected behind a trait
//!
//! # Modules
//!
//! - [`api`]: HTTP handlers and routes
//! - [`cache`]: embedding cache stores
//! - [`domain`]: memory records and tag normalization
//! - [`inference`]: detection and embedding adapters
//! - [`persistence`]: record and blob stores
//! - [`search`]: scoring engine and search service

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod inference;
pub mod ingest;
pub mod memories;
pub mod persistence;
pub mod search;
pub mod server;
pub mod telemetry;

use crate::api::rate_limit::SimpleRateLimiter;
use crate::config::AppConfig;
use crate::ingest::{IngestDeps, IngestService};
use crate::memories::MemoryService;
use crate::search::{ScoringEngine, SearchService};
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Upload and reindex flows.
    pub ingest: Arc<IngestService>,
    /// Memory search.
    pub search: Arc<SearchService>,
    /// Listing, update and delete.
    pub memories: Arc<MemoryService>,
    /// Global Rate Limiter
    pub rate_limiter: Arc<SimpleRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the services around already constructed adapters.
    pub fn new(config: Arc<AppConfig>, deps: IngestDeps) -> Self {
        let search = SearchService::new(
            Arc::clone(&deps.records),
            Arc::clone(&deps.cache),
            Arc::clone(&deps.embedder),
            ScoringEngine::new(config.search.into()),
        );
        let memories = MemoryService::new(Arc::clone(&deps.records));
        let ingest = IngestService::new(deps, &config.ingest.scratch_dir);
        let rate_limiter = Arc::new(SimpleRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ));

        Self {
            ingest: Arc::new(ingest),
            search: Arc::new(search),
            memories: Arc::new(memories),
            rate_limiter,
            config,
        }
    }
}
