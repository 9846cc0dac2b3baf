//! Relevance scoring for memory search.
//!
//! A candidate's score is the sum of a fixed tag bonus (query is a substring of
//! one of its tags) and the cosine similarity between the query embedding and
//! the cached image embedding. Candidates at or below the threshold are dropped.

use crate::cache::EmbeddingMap;
use crate::config::SearchConfig;
use crate::domain::{MemoryRecord, ScoredMemory};
use tracing::warn;

/// Tunable scoring constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    /// Added when the query occurs inside any tag.
    pub tag_bonus: f32,
    /// Scores must be strictly greater than this to be returned.
    pub threshold: f32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            tag_bonus: 0.5,
            threshold: 0.26,
        }
    }
}

impl From<SearchConfig> for ScoringParams {
    fn from(config: SearchConfig) -> Self {
        Self {
            tag_bonus: config.tag_bonus,
            threshold: config.threshold,
        }
    }
}

/// Cosine similarity of two vectors.
///
/// `None` when the dimensions differ; zero-norm vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some(dot_product / (norm_a * norm_b))
}

/// Whether lowercase `query` is non-empty and occurs inside any of `tags`.
fn matches_tag(query: &str, tags: &[String]) -> bool {
    !query.is_empty() && tags.iter().any(|t| t.to_lowercase().contains(query))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    params: ScoringParams,
}

impl ScoringEngine {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> ScoringParams {
        self.params
    }

    /// Score a single record. `query` must already be lowercase.
    fn score_one(
        &self,
        query: &str,
        query_vec: Option<&[f32]>,
        record: &MemoryRecord,
        embeddings: &EmbeddingMap,
    ) -> f32 {
        let mut score = 0.0;

        if matches_tag(query, &record.tags) {
            score += self.params.tag_bonus;
        }

        if let (Some(query_vec), Some(image_vec)) = (query_vec, embeddings.get(&record.image_url)) {
            match cosine_similarity(query_vec, image_vec) {
                Some(similarity) => score += similarity,
                None => warn!(
                    image_url = %record.image_url,
                    cached_dim = image_vec.len(),
                    query_dim = query_vec.len(),
                    "Cached embedding has a stale dimension, ignoring it"
                ),
            }
        }

        score
    }

    /// Score, filter and rank `records` for `query`.
    ///
    /// `query_vec` is the query's embedding; pass `None` to rank on tags only.
    pub fn rank(
        &self,
        query: &str,
        query_vec: Option<&[f32]>,
        records: Vec<MemoryRecord>,
        embeddings: &EmbeddingMap,
    ) -> Vec<ScoredMemory> {
        let query = query.to_lowercase();

        let mut scored: Vec<ScoredMemory> = records
            .into_iter()
            .filter_map(|memory| {
                let score = self.score_one(&query, query_vec, &memory, embeddings);
                (score > self.params.threshold).then_some(ScoredMemory { memory, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }
}
