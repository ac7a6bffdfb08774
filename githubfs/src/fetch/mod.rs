//! Remote object fetcher
//!
//! The only I/O boundary of the crate: `fetch(url)` retrieves one JSON object.
//! There is no caching, retrying or path logic here; the cache layer owns all
//! of that, which lets it be exercised against [`MemoryFetcher`] instead of
//! the network.
//!
//! Submodules:
//! - `http`: reqwest-backed fetcher talking to the real API
//! - `memory`: in-memory stub with fetch counters and failure injection

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{FsError, Result};

pub mod http;
pub mod memory;

pub use http::HttpFetcher;
pub use memory::MemoryFetcher;

#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch and JSON-decode the object at `url`.
    async fn fetch(&self, url: &str) -> Result<serde_json::Value>;
}

/// Fetch `url` and decode it into the shape the caller expects. The wire
/// carries no object kind, so a tree decoded as a blob is a decode error.
pub async fn fetch_object<T: DeserializeOwned>(fetcher: &dyn ObjectFetcher, url: &str) -> Result<T> {
    let value = fetcher.fetch(url).await?;
    serde_json::from_value(value).map_err(|e| FsError::decode(url, e))
}
