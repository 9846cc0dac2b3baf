//! Supabase provider.
//!
//! Records go through the PostgREST endpoint (`/rest/v1/<table>`), photos through
//! the Storage API (`/storage/v1/object/<bucket>/<name>`). Both authenticate
//! with the project's service key.

use crate::config::SupabaseConfig;
use crate::domain::{MemoryRecord, MemoryUpdate, NewMemory};
use crate::persistence::{BlobStore, RecordStore, StoreError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

const RETURN_REPRESENTATION: &str = "return=representation";

/// Client for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    table: String,
    bucket: String,
}

impl SupabaseClient {
    /// Build a client for `config`, storing records in `table` and photos in `bucket`.
    pub fn new(config: &SupabaseConfig, table: &str, bucket: &str) -> Result<Self, StoreError> {
        let parsed = Url::parse(&config.url)
            .map_err(|e| StoreError::Malformed(format!("invalid Supabase URL: {e}")))?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.key)
            .map_err(|e| StoreError::Malformed(format!("invalid Supabase key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .map_err(|e| StoreError::Malformed(format!("invalid Supabase key: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            table: table.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }

    async fn rows(response: reqwest::Response) -> Result<Vec<MemoryRecord>, StoreError> {
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        parse_rows(&body)
    }
}

/// Turn a non-2xx response into [`StoreError::Rejected`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn parse_rows(body: &str) -> Result<Vec<MemoryRecord>, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn single_row(rows: Vec<MemoryRecord>, id: &str) -> Result<MemoryRecord, StoreError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, StoreError> {
        let response = self
            .client
            .post(self.table_url())
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&memory)
            .send()
            .await?;

        let rows = Self::rows(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no rows".to_string()))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, StoreError> {
        let response = self
            .client
            .get(self.table_url())
            .query(&[("select", "*".to_string()), ("user_id", format!("eq.{user_id}"))])
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn list_all(&self) -> Result<Vec<MemoryRecord>, StoreError> {
        let response = self
            .client
            .get(self.table_url())
            .query(&[("select", "*")])
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn update(&self, id: &str, update: &MemoryUpdate) -> Result<MemoryRecord, StoreError> {
        let response = self
            .client
            .patch(self.table_url())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(update)
            .send()
            .await?;
        single_row(Self::rows(response).await?, id)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.table_url())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", RETURN_REPRESENTATION)
            .send()
            .await?;
        single_row(Self::rows(response).await?, id).map(|_| ())
    }

    fn provider_name(&self) -> &'static str {
        "supabase"
    }
}

#[async_trait]
impl BlobStore for SupabaseClient {
    async fn upload(
        &self,
        name: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.object_url(name))
            .header(CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(self.public_url(name))
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    fn provider_name(&self) -> &'static str {
        "supabase"
    }
}
