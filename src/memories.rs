use crate::domain::tags::normalize_tags;
use crate::domain::{MemoryRecord, MemoryUpdate};
use crate::error::RecallError;
use crate::persistence::RecordStore;
use std::sync::Arc;

/// Listing and editing of stored memories.
///
/// Deleting a memory leaves its cached embedding in place; it is simply never
/// matched again because search only scores the owner's current records.
#[derive(Debug, Clone)]
pub struct MemoryService {
    records: Arc<dyn RecordStore>,
}

impl MemoryService {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<MemoryRecord>, RecallError> {
        Ok(self.records.list_by_user(user_id).await?)
    }

    /// Replace location and tags. Detected tags are not kept.
    pub async fn update(
        &self,
        id: &str,
        location: String,
        manual_tags: &str,
    ) -> Result<MemoryUpdate, RecallError> {
        let update = MemoryUpdate {
            location,
            tags: normalize_tags(manual_tags),
        };
        self.records.update(id, &update).await?;
        Ok(update)
    }

    pub async fn delete(&self, id: &str) -> Result<(), RecallError> {
        Ok(self.records.delete(id).await?)
    }
}
