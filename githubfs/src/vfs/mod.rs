//! Read-only filesystem view of a repository tree at a fixed revision.
//!
//! Paths are slash-separated and relative to the repository root, which is
//! spelled `"."`. Nothing is fetched until a path is first resolved.
//!
//! Submodules:
//! - `file`: handles returned by `open`
//! - `metadata`: `stat` results, mode bits and directory pages

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::cache::TreeCache;
use crate::config::Config;
use crate::error::{FsError, Result};
use crate::fetch::{HttpFetcher, ObjectFetcher};
use crate::object::{EntryKind, ROOT, Repository};

pub mod file;
pub mod metadata;

pub use file::File;
pub use metadata::{DirPage, FileMode, Metadata};

#[derive(Clone)]
pub struct GithubFs {
    cache: Arc<TreeCache>,
}

impl GithubFs {
    /// Filesystem over `owner/repo` at `revision`, using the public API.
    /// No request is made until the first lookup.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        revision: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(Repository::new(owner, repo, revision), Config::default())
    }

    pub fn with_config(repo: Repository, config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(repo, &config.api_url, Arc::new(fetcher)))
    }

    pub fn with_fetcher(repo: Repository, api_url: &str, fetcher: Arc<dyn ObjectFetcher>) -> Self {
        Self {
            cache: Arc::new(TreeCache::new(repo, api_url, fetcher)),
        }
    }

    pub fn repository(&self) -> &Repository {
        self.cache.repository()
    }

    pub async fn open(&self, path: &str) -> Result<File> {
        check_path(path)?;
        let entry = self.cache.resolve_entry(path).await?;
        debug!(path, kind = entry.kind.as_str(), "open");

        match &entry.kind {
            EntryKind::Blob => {
                let content = self.cache.read_blob_content(path).await?;
                Ok(File::content(path, entry, content))
            }
            EntryKind::Tree => Ok(File::directory(path, entry, Arc::clone(&self.cache))),
            EntryKind::Other(kind) => Err(FsError::InvalidType {
                path: path.to_string(),
                kind: kind.clone(),
            }),
        }
    }

    /// Metadata of `path` without fetching its content.
    pub async fn stat(&self, path: &str) -> Result<Metadata> {
        check_path(path)?;
        let entry = self.cache.resolve_entry(path).await?;
        Ok(Metadata::from_entry(&entry))
    }

    pub async fn read_file(&self, path: &str) -> Result<Bytes> {
        check_path(path)?;
        self.cache.read_blob_content(path).await
    }

    /// Every child of the directory at `path`.
    pub async fn read_dir(&self, path: &str) -> Result<Vec<Metadata>> {
        check_path(path)?;
        if path != ROOT && !self.cache.resolve_entry(path).await?.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        let tree = self.cache.resolve_tree(path).await?;
        Ok(tree.tree.iter().map(Metadata::from_entry).collect())
    }
}

/// Whether `path` is acceptable to [`GithubFs`]: `"."`, or slash-separated
/// elements with no empty, `.` or `..` element and no leading or trailing slash.
pub fn valid_path(path: &str) -> bool {
    if path == ROOT {
        return true;
    }
    !path.is_empty()
        && path
            .split('/')
            .all(|elem| !elem.is_empty() && elem != "." && elem != "..")
}

fn check_path(path: &str) -> Result<()> {
    if valid_path(path) {
        Ok(())
    } else {
        Err(FsError::InvalidPath(path.to_string()))
    }
}
