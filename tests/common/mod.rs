#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use recall_server::AppState;
use recall_server::cache::{EmbeddingCache, InMemoryCache};
use recall_server::config::AppConfig;
use recall_server::domain::{MemoryRecord, MemoryUpdate, NewMemory};
use recall_server::inference::{Detector, Embedder, InferenceError};
use recall_server::ingest::{ImageFetcher, IngestDeps};
use recall_server::persistence::providers::local::LocalBlobStore;
use recall_server::persistence::{RecordStore, StoreError};
use recall_server::server::build_app;

pub const BLOB_BASE_URL: &str = "http://files.test/scans";

/// Embeds images by their leading bytes and text by keyword.
#[derive(Debug, Default)]
pub struct FakeEmbedder {
    pub image_calls: AtomicUsize,
    pub fail_images: bool,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail_images: true,
            ..Self::default()
        }
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_image(&self, image: Vec<u8>) -> Result<Vec<f32>, InferenceError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_images {
            return Err(InferenceError::Model("image encoder unavailable".to_string()));
        }
        if image.starts_with(b"cat") {
            Ok(vec![1.0, 0.0])
        } else if image.starts_with(b"dog") {
            Ok(vec![0.0, 1.0])
        } else {
            Ok(vec![0.6, 0.8])
        }
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        if text.contains("kitten") {
            Ok(vec![1.0, 0.0])
        } else if text.contains("puppy") {
            Ok(vec![0.0, 1.0])
        } else {
            Ok(vec![0.0, 0.0])
        }
    }
}

/// Detector returning a fixed label set, or failing when `None`.
#[derive(Debug)]
pub struct FakeDetector(pub Option<Vec<String>>);

#[async_trait]
impl Detector for FakeDetector {
    async fn detect(&self, path: &Path) -> Result<Vec<String>, InferenceError> {
        assert!(path.exists(), "scratch file must exist during detection");
        self.0
            .clone()
            .ok_or_else(|| InferenceError::Service("detector offline".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Serves image bytes from a fixed URL map.
#[derive(Debug, Default)]
pub struct FakeFetcher(pub HashMap<String, Vec<u8>>);

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        self.0.get(url).cloned().ok_or_else(|| StoreError::Rejected {
            status: 404,
            message: format!("no image at {url}"),
        })
    }
}

/// Record store whose backend is always down.
#[derive(Debug)]
pub struct UnavailableRecordStore;

fn unavailable() -> StoreError {
    StoreError::Rejected {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl RecordStore for UnavailableRecordStore {
    async fn insert(&self, _memory: NewMemory) -> Result<MemoryRecord, StoreError> {
        Err(unavailable())
    }

    async fn list_by_user(&self, _user_id: &str) -> Result<Vec<MemoryRecord>, StoreError> {
        Err(unavailable())
    }

    async fn list_all(&self) -> Result<Vec<MemoryRecord>, StoreError> {
        Err(unavailable())
    }

    async fn update(&self, _id: &str, _update: &MemoryUpdate) -> Result<MemoryRecord, StoreError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn provider_name(&self) -> &'static str {
        "unavailable"
    }
}

pub fn record(id: &str, user_id: &str, image_url: &str, tags: &[&str]) -> MemoryRecord {
    MemoryRecord {
        id: id.to_string(),
        image_url: image_url.to_string(),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        user_id: user_id.to_string(),
        location: "Lisbon".to_string(),
        created_at: None,
    }
}

/// A running app over in-process adapters.
pub struct Harness {
    pub server: TestServer,
    pub cache: Arc<InMemoryCache>,
    pub embedder: Arc<FakeEmbedder>,
    pub blob_dir: TempDir,
    pub scratch_dir: TempDir,
}

pub struct HarnessBuilder {
    records: Arc<dyn RecordStore>,
    detector: FakeDetector,
    embedder: FakeEmbedder,
    fetcher: FakeFetcher,
}

impl HarnessBuilder {
    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = records;
        self
    }

    pub fn detector(mut self, detector: FakeDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn embedder(mut self, embedder: FakeEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn fetcher(mut self, fetcher: FakeFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn build(self) -> Harness {
        let blob_dir = TempDir::new().expect("blob dir");
        let scratch_dir = TempDir::new().expect("scratch dir");

        let mut config = AppConfig::load_from_args(["recall-server"]).expect("default config");
        config.ingest.scratch_dir = scratch_dir.path().to_string_lossy().to_string();
        config.resilience.rate_limit_enabled = false;

        let cache = Arc::new(InMemoryCache::new());
        let embedder = Arc::new(self.embedder);

        let deps = IngestDeps {
            records: self.records,
            blobs: Arc::new(LocalBlobStore::new(blob_dir.path(), BLOB_BASE_URL)),
            cache: Arc::clone(&cache) as Arc<dyn EmbeddingCache>,
            detector: Arc::new(self.detector),
            embedder: Arc::clone(&embedder) as Arc<dyn Embedder>,
            fetcher: Arc::new(self.fetcher),
        };

        let app = build_app(AppState::new(Arc::new(config), deps));
        let server = TestServer::new(app).expect("test server");

        Harness {
            server,
            cache,
            embedder,
            blob_dir,
            scratch_dir,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            records: Arc::new(recall_server::persistence::providers::memory::InMemoryRecordStore::new()),
            detector: FakeDetector(Some(Vec::new())),
            embedder: FakeEmbedder::default(),
            fetcher: FakeFetcher::default(),
        }
    }

    pub fn with_records(records: Vec<MemoryRecord>) -> HarnessBuilder {
        Self::builder().records(Arc::new(
            recall_server::persistence::providers::memory::InMemoryRecordStore::with_records(
                records,
            ),
        ))
    }
}
