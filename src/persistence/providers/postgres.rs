use crate::domain::{MemoryRecord, MemoryUpdate, NewMemory};
use crate::persistence::{RecordStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Record store talking to Postgres directly.
///
/// Uses the same `memories` table shape as the Supabase project, created by the
/// bundled migrations.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub async fn connect(connection_string: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        // Run Migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> Result<MemoryRecord, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(MemoryRecord {
        id: id.to_string(),
        image_url: row.try_get("image_url")?,
        tags: row.try_get("tags")?,
        user_id: row.try_get("user_id")?,
        location: row.try_get("location")?,
        created_at: Some(created_at),
    })
}

fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    // A malformed id cannot match any row.
    Uuid::parse_str(id)
        .ok()
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO memories (id, image_url, tags, user_id, location, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, image_url, tags, user_id, location, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&memory.image_url)
        .bind(&memory.tags)
        .bind(&memory.user_id)
        .bind(&memory.location)
        .fetch_one(&self.pool)
        .await?;

        Ok(record_from_row(&row)?)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, image_url, tags, user_id, location, created_at
            FROM memories
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_all(&self) -> Result<Vec<MemoryRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, image_url, tags, user_id, location, created_at FROM memories ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update(&self, id: &str, update: &MemoryUpdate) -> Result<MemoryRecord, StoreError> {
        let uuid = parse_id(id)?;
        let row = sqlx::query(
            r#"
            UPDATE memories SET location = $2, tags = $3
            WHERE id = $1
            RETURNING id, image_url, tags, user_id, location, created_at
            "#,
        )
        .bind(uuid)
        .bind(&update.location)
        .bind(&update.tags)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(record_from_row(&row)?),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let uuid = parse_id(id)?;
        let result = sqlx::query("DELETE FROM memories WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "postgres"
    }
}
