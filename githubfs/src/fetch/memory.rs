//! In-memory fetcher for tests and offline use.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::ObjectFetcher;
use crate::error::{FsError, Result};

#[derive(Default)]
struct State {
    objects: HashMap<String, serde_json::Value>,
    fetches: HashMap<String, usize>,
    failures: HashMap<String, VecDeque<FsError>>,
}

/// Serves objects from a map keyed by URL and counts every fetch, so callers
/// can assert how often the network would have been hit.
#[derive(Default)]
pub struct MemoryFetcher {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, url: impl Into<String>, object: serde_json::Value) {
        self.state.lock().unwrap().objects.insert(url.into(), object);
    }

    /// Serialize `object` (a `Tree`, `Blob`, ...) and serve it at `url`.
    pub fn insert_object<T: Serialize>(
        &self,
        url: impl Into<String>,
        object: &T,
    ) -> serde_json::Result<()> {
        let value = serde_json::to_value(object)?;
        self.insert(url, value);
        Ok(())
    }

    /// Make the next fetch of `url` fail with `err`. Queued failures are
    /// consumed in order before the stored object is served again.
    pub fn fail_next(&self, url: impl Into<String>, err: FsError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(url.into())
            .or_default()
            .push_back(err);
    }

    /// Number of fetches issued for `url`, successful or not.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .fetches
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.state.lock().unwrap().fetches.values().sum()
    }
}

#[async_trait]
impl ObjectFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        *state.fetches.entry(url.to_string()).or_default() += 1;

        if let Some(err) = state.failures.get_mut(url).and_then(|q| q.pop_front()) {
            return Err(err);
        }
        state
            .objects
            .get(url)
            .cloned()
            .ok_or_else(|| FsError::status(url, 404))
    }
}
