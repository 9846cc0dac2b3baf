//! Memory search: tag matching plus CLIP similarity over cached embeddings.

use crate::cache::EmbeddingCache;
use crate::domain::ScoredMemory;
use crate::error::RecallError;
use crate::inference::Embedder;
use crate::persistence::RecordStore;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod scoring;

pub use scoring::{ScoringEngine, ScoringParams, cosine_similarity};

#[derive(Debug, Clone)]
pub struct SearchService {
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn EmbeddingCache>,
    embedder: Arc<dyn Embedder>,
    engine: ScoringEngine,
}

impl SearchService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        cache: Arc<dyn EmbeddingCache>,
        embedder: Arc<dyn Embedder>,
        engine: ScoringEngine,
    ) -> Self {
        Self {
            records,
            cache,
            embedder,
            engine,
        }
    }

    /// Rank `user_id`'s memories against `query`, best first.
    ///
    /// If the query cannot be embedded, ranking falls back to tags only.
    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<Vec<ScoredMemory>, RecallError> {
        let memories = self.records.list_by_user(user_id).await?;
        if memories.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.cache.load().await?;

        let query_vec = match self.embedder.embed_text(query).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Query embedding failed, ranking on tags only");
                None
            }
        };

        let results = self
            .engine
            .rank(query, query_vec.as_deref(), memories, &embeddings);

        debug!(
            user_id,
            query,
            candidates = results.len(),
            "Search ranked"
        );
        Ok(results)
    }
}
