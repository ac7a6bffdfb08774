use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use super::ObjectFetcher;
use crate::config::Config;
use crate::error::{FsError, Result};

/// Fetches objects over HTTP(S). One GET per call, any non-2xx status is a
/// [`FsError::Transport`] carrying the code.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| FsError::transport(&config.api_url, e))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept)
                .map_err(|e| FsError::transport(&config.api_url, e))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FsError::transport(&config.api_url, e))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client as is.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
        debug!(url, "GET");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FsError::transport(url, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FsError::status(url, status.as_u16()));
        }

        let body = res.bytes().await.map_err(|e| FsError::transport(url, e))?;
        serde_json::from_slice(&body).map_err(|e| FsError::decode(url, e))
    }
}
