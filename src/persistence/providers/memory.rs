use crate::domain::{MemoryRecord, MemoryUpdate, NewMemory};
use crate::persistence::{RecordStore, StoreError};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local record store.
///
/// Records are kept in insertion order and lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<MemoryRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: Vec<MemoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, StoreError> {
        let record = memory.into_record(uuid::Uuid::new_v4().to_string(), chrono::Utc::now());
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<MemoryRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn update(&self, id: &str, update: &MemoryUpdate) -> Result<MemoryRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.location = update.location.clone();
        record.tags = update.tags.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
