use crate::persistence::{BlobStore, StoreError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Blob store backed by a local directory.
///
/// The HTTP layer serves `root` under `/files`, so `base_url` is normally
/// `http://<host>:<port>/files`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(
        &self,
        name: &str,
        data: &[u8],
        _content_type: &str,
    ) -> Result<String, StoreError> {
        if name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Err(StoreError::Rejected {
                status: 400,
                message: format!("invalid object name: {name}"),
            });
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        if tokio::fs::try_exists(&path).await? {
            return Err(StoreError::Rejected {
                status: 409,
                message: format!("object already exists: {name}"),
            });
        }
        tokio::fs::write(&path, data).await?;

        Ok(self.public_url(name))
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
