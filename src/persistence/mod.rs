//! Record and blob storage adapters.
//!
//! Memory metadata lives in a [`RecordStore`]; the uploaded photo bytes live in
//! a [`BlobStore`] which also knows how to derive the public URL stored on the
//! record. The two are independent so that, for example, records can be kept in
//! Postgres while photos go to Supabase Storage.
//!
//! # Providers
//!
//! - [`providers::supabase::SupabaseClient`] - PostgREST table + Storage bucket
//! - [`providers::postgres::PostgresRecordStore`] - direct Postgres via `sqlx`
//! - [`providers::memory::InMemoryRecordStore`] - process-local, for development and tests
//! - [`providers::local::LocalBlobStore`] - files on local disk served under `/files`

use crate::domain::{MemoryRecord, MemoryUpdate, NewMemory};
use async_trait::async_trait;

pub mod providers;

/// Errors raised by record and blob stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record matched the given identifier.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The backing service rejected the request.
    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An I/O error from a filesystem-backed store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store returned data that could not be interpreted.
    #[error("Malformed store response: {0}")]
    Malformed(String),
}

/// Persistence for memory records.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Insert a new record and return it with its assigned identifier.
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, StoreError>;

    /// All records owned by `user_id`.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Every record in the store, regardless of owner.
    async fn list_all(&self) -> Result<Vec<MemoryRecord>, StoreError>;

    /// Replace location and tags of record `id`.
    async fn update(&self, id: &str, update: &MemoryUpdate) -> Result<MemoryRecord, StoreError>;

    /// Delete record `id`.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}

/// Persistence for uploaded image bytes.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Store `data` under `name` and return its public URL.
    async fn upload(&self, name: &str, data: &[u8], content_type: &str)
    -> Result<String, StoreError>;

    /// Public URL of an object stored under `name`.
    fn public_url(&self, name: &str) -> String;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}
