use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored photo memory.
///
/// The `id` is assigned by the record store. Supabase tables commonly use an
/// integer identity column while the Postgres provider uses UUIDs, so the
/// identifier is accepted as either a JSON string or number and always kept as
/// a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub image_url: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    pub user_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A memory that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMemory {
    pub image_url: String,
    pub tags: Vec<String>,
    pub user_id: String,
    pub location: String,
}

impl NewMemory {
    /// Materialize the record with a store-assigned identifier.
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> MemoryRecord {
        MemoryRecord {
            id,
            image_url: self.image_url,
            tags: self.tags,
            user_id: self.user_id,
            location: self.location,
            created_at: Some(created_at),
        }
    }
}

/// Fields replaced by an explicit update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub location: String,
    pub tags: Vec<String>,
}

/// A memory with its relevance score for one search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub memory: MemoryRecord,
    pub score: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

// Rows written by older clients may carry `null` tags.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_id_is_read_as_string() {
        let record: MemoryRecord = serde_json::from_value(json!({
            "id": 42,
            "image_url": "https://x/scans/a.jpg",
            "tags": ["cat"],
            "user_id": "u1",
            "location": "home",
            "created_at": "2025-12-15T10:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(record.id, "42");
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_null_tags_become_empty() {
        let record: MemoryRecord = serde_json::from_value(json!({
            "id": "abc",
            "image_url": "u",
            "tags": null,
            "user_id": "u1",
            "location": "park"
        }))
        .unwrap();

        assert!(record.tags.is_empty());
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_scored_memory_is_flattened() {
        let scored = ScoredMemory {
            memory: MemoryRecord {
                id: "1".into(),
                image_url: "u".into(),
                tags: vec!["dog".into()],
                user_id: "u1".into(),
                location: "beach".into(),
                created_at: None,
            },
            score: 0.5,
        };

        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["id"], "1");
        assert_eq!(value["score"], 0.5);
        assert!(value.get("memory").is_none());
        assert!(value.get("created_at").is_none());
    }
}
