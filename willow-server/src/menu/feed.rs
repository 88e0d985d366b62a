//! Menu feed

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("menu feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("menu feed returned HTTP {0}")]
    Status(u16),
    #[error("menu feed is not configured")]
    NotConfigured,
    #[error("menu feed has no header row")]
    Empty,
    #[error("menu feed unavailable: {0}")]
    Unavailable(String),
}

/// Source of raw menu CSV
#[async_trait]
pub trait MenuFeed: Send + Sync {
    async fn fetch(&self) -> Result<String, FeedError>;
}

/// Fetches the published sheet over HTTP
pub struct HttpMenuFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpMenuFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MenuFeed for HttpMenuFeed {
    async fn fetch(&self) -> Result<String, FeedError> {
        if self.url.is_empty() {
            return Err(FeedError::NotConfigured);
        }
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status().as_u16()));
        }
        Ok(resp.text().await?)
    }
}
