use super::{CacheError, EmbeddingCache, EmbeddingMap};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Embedding cache kept in a pgvector column.
///
/// Each entry is its own row, so writers only contend on the rows they touch
/// and `merge` / `bulk_save` are transactional.
#[derive(Debug, Clone)]
pub struct PgEmbeddingCache {
    pool: PgPool,
}

impl PgEmbeddingCache {
    pub async fn connect(connection_string: &str, max_connections: u32) -> Result<Self, CacheError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;
        Self::with_pool(pool).await
    }

    /// Reuse an existing pool, creating the table if needed.
    pub async fn with_pool(pool: PgPool) -> Result<Self, CacheError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&pool)
            .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                image_url TEXT PRIMARY KEY,
                embedding vector NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn upsert<'e, E>(executor: E, key: &str, vector: Vec<f32>) -> Result<(), sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO embeddings (image_url, embedding, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (image_url) DO UPDATE SET
                embedding = EXCLUDED.embedding,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(Vector::from(vector))
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EmbeddingCache for PgEmbeddingCache {
    async fn load(&self) -> Result<EmbeddingMap, CacheError> {
        let rows = sqlx::query("SELECT image_url, embedding FROM embeddings")
            .fetch_all(&self.pool)
            .await?;

        let mut mapping = EmbeddingMap::with_capacity(rows.len());
        for row in rows {
            let url: String = row.try_get("image_url")?;
            let embedding: Vector = row.try_get("embedding")?;
            mapping.insert(url, embedding.to_vec());
        }
        Ok(mapping)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
        let row = sqlx::query("SELECT embedding FROM embeddings WHERE image_url = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let embedding: Vector = row.try_get("embedding")?;
                Ok(Some(embedding.to_vec()))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, vector: Vec<f32>) -> Result<(), CacheError> {
        Self::upsert(&self.pool, key, vector).await?;
        Ok(())
    }

    async fn merge(&self, entries: EmbeddingMap) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;
        for (key, vector) in entries {
            Self::upsert(&mut *tx, &key, vector).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn bulk_save(&self, mapping: EmbeddingMap) -> Result<(), CacheError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM embeddings").execute(&mut *tx).await?;
        for (key, vector) in mapping {
            Self::upsert(&mut *tx, &key, vector).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "postgres"
    }
}
