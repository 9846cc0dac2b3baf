//! Photo ingestion: the upload ("scan") flow and embedding reindexing.
//!
//! A scan writes the upload to a scratch file, runs detection on it, stores the
//! photo and its record, then caches the photo's embedding on a best-effort
//! basis. Reindex fills in cache entries for records that never got one.

use crate::cache::{EmbeddingCache, EmbeddingMap};
use crate::domain::tags::{merge_tags, parse_manual_tags};
use crate::domain::{MemoryRecord, NewMemory};
use crate::error::RecallError;
use crate::inference::{Detector, Embedder};
use crate::persistence::{BlobStore, RecordStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub mod fetch;

pub use fetch::{HttpImageFetcher, ImageFetcher};

/// An uploaded photo with its form fields.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub user_id: String,
    pub location: String,
    /// Comma separated, as typed by the user.
    pub manual_tags: String,
}

/// Result of a reindex run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexReport {
    /// Records inspected.
    pub scanned: usize,
    /// New cache entries written.
    pub updated: usize,
    /// Images that could not be downloaded or embedded.
    pub failed: usize,
}

/// Adapters used by [`IngestService`].
#[derive(Debug, Clone)]
pub struct IngestDeps {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub cache: Arc<dyn EmbeddingCache>,
    pub detector: Arc<dyn Detector>,
    pub embedder: Arc<dyn Embedder>,
    pub fetcher: Arc<dyn ImageFetcher>,
}

#[derive(Debug, Clone)]
pub struct IngestService {
    deps: IngestDeps,
    scratch_dir: PathBuf,
}

/// Keep the name portable and free of path separators.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

impl IngestService {
    pub fn new(deps: IngestDeps, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            deps,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Store an uploaded photo as a new memory.
    pub async fn scan(&self, request: ScanRequest) -> Result<MemoryRecord, RecallError> {
        if request.data.is_empty() {
            return Err(RecallError::Validation("uploaded file is empty".to_string()));
        }
        if !request.content_type.starts_with("image/") {
            return Err(RecallError::Validation(format!(
                "unsupported content type: {}",
                request.content_type
            )));
        }

        let file_name = sanitize_file_name(&request.file_name);
        let object_name = format!("{}_{}", uuid::Uuid::new_v4(), file_name);

        // Removed on drop, whichever way this function returns.
        let scratch = self.write_scratch(&file_name, &request.data).await?;

        let detected = match self.deps.detector.detect(scratch.path()).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!(
                    provider = self.deps.detector.provider_name(),
                    error = %e,
                    "Detection failed, continuing with manual tags"
                );
                Vec::new()
            }
        };

        let tags = merge_tags(parse_manual_tags(&request.manual_tags), detected);

        let url = self
            .deps
            .blobs
            .upload(&object_name, &request.data, &request.content_type)
            .await?;

        let record = self
            .deps
            .records
            .insert(NewMemory {
                image_url: url.clone(),
                tags,
                user_id: request.user_id,
                location: request.location,
            })
            .await?;

        let embedded = match self.embed_and_cache(&url, request.data).await {
            Ok(()) => {
                info!(image_url = %url, "Saved embedding");
                true
            }
            Err(e) => {
                warn!(image_url = %url, error = %e, "Image embedding failed");
                false
            }
        };

        info!(
            name: "scan.saved",
            memory_id = %record.id,
            tags = record.tags.len(),
            embedded,
            "Memory saved"
        );

        Ok(record)
    }

    async fn write_scratch(
        &self,
        file_name: &str,
        data: &[u8],
    ) -> Result<tempfile::NamedTempFile, RecallError> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| RecallError::Store(e.into()))?;

        let suffix = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let scratch = tempfile::Builder::new()
            .prefix("scan_")
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| RecallError::Store(e.into()))?;
        tokio::fs::write(scratch.path(), data)
            .await
            .map_err(|e| RecallError::Store(e.into()))?;

        Ok(scratch)
    }

    async fn embed_and_cache(&self, url: &str, image: Vec<u8>) -> Result<(), RecallError> {
        let embedding = self.deps.embedder.embed_image(image).await?;
        self.deps.cache.save(url, embedding).await?;
        Ok(())
    }

    /// Embed every stored image that has no cache entry yet.
    ///
    /// Per-image failures are logged and skipped; the new entries are written
    /// to the cache in one batch at the end.
    pub async fn reindex(&self) -> Result<ReindexReport, RecallError> {
        let memories = self.deps.records.list_all().await?;
        let cached = self.deps.cache.load().await?;

        let mut fresh = EmbeddingMap::new();
        let mut failed = 0;

        for memory in &memories {
            let url = &memory.image_url;
            if cached.contains_key(url) || fresh.contains_key(url) {
                continue;
            }

            info!(image_url = %url, "Generating embedding");
            let image = match self.deps.fetcher.fetch(url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(image_url = %url, error = %e, "Download failed, skipping");
                    failed += 1;
                    continue;
                }
            };

            match self.deps.embedder.embed_image(image).await {
                Ok(embedding) => {
                    fresh.insert(url.clone(), embedding);
                }
                Err(e) => {
                    warn!(image_url = %url, error = %e, "Embedding failed, skipping");
                    failed += 1;
                }
            }
        }

        let updated = fresh.len();
        if updated > 0 {
            self.deps.cache.merge(fresh).await?;
        }

        let report = ReindexReport {
            scanned: memories.len(),
            updated,
            failed,
        };
        info!(
            name: "reindex.completed",
            scanned = report.scanned,
            updated = report.updated,
            failed = report.failed,
            "Reindex completed"
        );
        Ok(report)
    }
}
