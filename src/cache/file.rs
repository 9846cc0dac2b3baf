use super::{CacheError, EmbeddingCache, EmbeddingMap};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Embedding cache stored as one JSON object on disk.
///
/// The file layout is `{"<image url>": [f32, ...], ...}`, the format written by
/// earlier deployments, so an existing `embeddings.json` can be reused as is.
/// Every mutation rewrites the whole file: the new contents go to a temporary
/// sibling which is then renamed over the target.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<EmbeddingMap, CacheError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(EmbeddingMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EmbeddingMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, mapping: &EmbeddingMap) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(mapping)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("embeddings.json");
        let tmp = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingCache for JsonFileCache {
    async fn load(&self) -> Result<EmbeddingMap, CacheError> {
        self.read().await
    }

    async fn save(&self, key: &str, vector: Vec<f32>) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut mapping = self.read().await?;
        mapping.insert(key.to_string(), vector);
        self.write(&mapping).await
    }

    async fn merge(&self, entries: EmbeddingMap) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut mapping = self.read().await?;
        mapping.extend(entries);
        self.write(&mapping).await
    }

    async fn bulk_save(&self, mapping: EmbeddingMap) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        self.write(&mapping).await
    }

    fn provider_name(&self) -> &'static str {
        "file"
    }
}
