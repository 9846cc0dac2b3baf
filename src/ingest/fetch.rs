use crate::persistence::StoreError;
use async_trait::async_trait;

/// Downloads stored images back for re-embedding.
#[async_trait]
pub trait ImageFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError>;
}

/// Fetches images over plain HTTP(S), as public storage URLs allow.
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message: format!("download of {url} failed"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
