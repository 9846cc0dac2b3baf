use super::{CacheError, EmbeddingCache, EmbeddingMap};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Non-persistent cache, used when no cache file is wanted and in tests.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<EmbeddingMap>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmbeddingCache for InMemoryCache {
    async fn load(&self) -> Result<EmbeddingMap, CacheError> {
        Ok(self.entries.read().await.clone())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, vector: Vec<f32>) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), vector);
        Ok(())
    }

    async fn merge(&self, entries: EmbeddingMap) -> Result<(), CacheError> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn bulk_save(&self, mapping: EmbeddingMap) -> Result<(), CacheError> {
        *self.entries.write().await = mapping;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
