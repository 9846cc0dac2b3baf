//! Embedding cache: image URL -> embedding vector.
//!
//! Search reads the whole mapping; ingest and reindex write to it. Stores are
//! injected behind [`EmbeddingCache`] so the JSON file used by earlier
//! deployments can be swapped for Postgres without touching callers.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::JsonFileCache;
pub use memory::InMemoryCache;
pub use postgres::PgEmbeddingCache;

/// Full cache contents keyed by image URL.
pub type EmbeddingMap = HashMap<String, Vec<f32>>;

/// Errors raised by embedding caches.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistent mapping from image URL to embedding.
///
/// Implementations serialize their own writers: concurrent `save` and `merge`
/// calls on one instance never lose each other's entries.
#[async_trait]
pub trait EmbeddingCache: Send + Sync + std::fmt::Debug {
    /// Full mapping; empty when nothing has been persisted yet.
    async fn load(&self) -> Result<EmbeddingMap, CacheError>;

    /// Vector cached for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
        Ok(self.load().await?.remove(key))
    }

    /// Insert or replace one entry.
    async fn save(&self, key: &str, vector: Vec<f32>) -> Result<(), CacheError>;

    /// Insert or replace many entries in a single write.
    async fn merge(&self, entries: EmbeddingMap) -> Result<(), CacheError>;

    /// Replace the entire mapping.
    async fn bulk_save(&self, mapping: EmbeddingMap) -> Result<(), CacheError>;

    fn provider_name(&self) -> &'static str;
}
