//! Page fetch capability.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, WatchError};

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body. Unreachable hosts and non-2xx statuses come back
    /// as [`WatchError::Network`].
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("inventory-watcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("http client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let network = |e: reqwest::Error| WatchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;

        resp.text().await.map_err(network)
    }
}
