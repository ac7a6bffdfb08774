//! Lazy tree/blob cache.
//!
//! Trees are memoized by canonical directory path (`"."` for the root) and
//! blob contents by full file path. Both maps only ever grow: the revision is
//! fixed, so nothing cached can go stale.
//!
//! Each map is a `moka` cache filled through `try_get_with`, which gives
//! per-key in-flight deduplication: concurrent lookups of one key share a
//! single fetch, lookups of different keys run in parallel, and a failed
//! fetch leaves no entry behind so the next call retries it.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use moka::future::Cache;
use tracing::{debug, trace};

use crate::error::{FsError, Result};
use crate::fetch::{ObjectFetcher, fetch_object};
use crate::object::{Blob, EntryKind, ROOT, Repository, Tree, TreeEntry};

pub struct TreeCache {
    repo: Repository,
    root_url: String,
    fetcher: Arc<dyn ObjectFetcher>,
    trees: Cache<String, Arc<Tree>>,
    blobs: Cache<String, Bytes>,
}

impl TreeCache {
    pub fn new(repo: Repository, api_url: &str, fetcher: Arc<dyn ObjectFetcher>) -> Self {
        let root_url = repo.root_tree_url(api_url);
        Self {
            repo,
            root_url,
            fetcher,
            trees: Cache::builder().build(),
            blobs: Cache::builder().build(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Listing of the directory at `path`, fetched on first use.
    ///
    /// `path` must already be canonical (see [`crate::vfs::valid_path`]).
    /// Resolving a nested path walks and caches every ancestor.
    pub fn resolve_tree<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Arc<Tree>>> {
        Box::pin(async move {
            self.trees
                .try_get_with(path.to_string(), self.load_tree(path))
                .await
                .map_err(Arc::unwrap_or_clone)
        })
    }

    async fn load_tree(&self, path: &str) -> Result<Arc<Tree>> {
        let url = if path == ROOT {
            self.root_url.clone()
        } else {
            let entry = self.resolve_entry(path).await?;
            if !entry.is_dir() {
                return Err(FsError::NotADirectory(path.to_string()));
            }
            entry.url
        };

        debug!(path, url = %url, "fetching tree");
        let tree: Tree = fetch_object(self.fetcher.as_ref(), &url).await?;
        Ok(Arc::new(tree))
    }

    /// The entry named by `path`, looked up in its parent's listing.
    ///
    /// The root has no parent, so it is answered with a synthesized entry
    /// named after the repository.
    pub async fn resolve_entry(&self, path: &str) -> Result<TreeEntry> {
        if path == ROOT {
            let root = self.resolve_tree(ROOT).await?;
            return Ok(TreeEntry::root(&self.repo.name, &root.url));
        }

        let (dir, name) = split_path(path);
        let parent = self.resolve_tree(dir).await?;
        trace!(path, dir, name, "scanning parent tree");
        parent
            .find(name)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Raw content of the file at `path`, fetched on first use.
    pub async fn read_blob_content(&self, path: &str) -> Result<Bytes> {
        let entry = self.resolve_entry(path).await?;
        match &entry.kind {
            EntryKind::Blob => {}
            EntryKind::Tree => return Err(FsError::IsADirectory(path.to_string())),
            EntryKind::Other(kind) => {
                return Err(FsError::InvalidType {
                    path: path.to_string(),
                    kind: kind.clone(),
                });
            }
        }

        self.blobs
            .try_get_with(path.to_string(), async {
                debug!(path, url = %entry.url, "fetching blob");
                let blob: Blob = fetch_object(self.fetcher.as_ref(), &entry.url).await?;
                blob.into_content()
            })
            .await
            .map_err(Arc::unwrap_or_clone)
    }
}

/// Split `a/b/c` into (`a/b`, `c`); a top-level name has `"."` as parent.
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) if !dir.is_empty() => (dir, name),
        Some((_, name)) => (ROOT, name),
        None => (ROOT, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::object::{MODE_DIR, MODE_EXECUTABLE, MODE_FILE};
    use std::time::Duration;

    const API: &str = "https://api.test";

    fn entry(path: &str, mode: &str, kind: EntryKind, size: u64, url: &str) -> TreeEntry {
        TreeEntry {
            path: path.into(),
            mode: mode.into(),
            kind,
            size,
            url: url.into(),
        }
    }

    fn tree(url: &str, entries: Vec<TreeEntry>) -> Tree {
        Tree {
            sha: String::new(),
            url: url.into(),
            tree: entries,
            truncated: false,
        }
    }

    /// octo/demo@main:
    ///   README.md, run.sh, vendor (submodule), src/lib.rs, src/util/mod.rs
    fn fixture() -> (Arc<MemoryFetcher>, TreeCache) {
        fixture_with(MemoryFetcher::new())
    }

    fn fixture_with(fetcher: MemoryFetcher) -> (Arc<MemoryFetcher>, TreeCache) {
        let repo = Repository::new("octo", "demo", "main");
        let root_url = repo.root_tree_url(API);

        fetcher
            .insert_object(
                &root_url,
                &tree(
                    &root_url,
                    vec![
                        entry("README.md", MODE_FILE, EntryKind::Blob, 5, "b/readme"),
                        entry("run.sh", MODE_EXECUTABLE, EntryKind::Blob, 2, "b/run"),
                        entry("src", MODE_DIR, EntryKind::Tree, 0, "t/src"),
                        entry("vendor", "160000", EntryKind::Other("commit".into()), 0, ""),
                    ],
                ),
            )
            .unwrap();
        fetcher
            .insert_object(
                "t/src",
                &tree(
                    "t/src",
                    vec![
                        entry("lib.rs", MODE_FILE, EntryKind::Blob, 3, "b/lib"),
                        entry("util", MODE_DIR, EntryKind::Tree, 0, "t/util"),
                    ],
                ),
            )
            .unwrap();
        fetcher
            .insert_object(
                "t/util",
                &tree(
                    "t/util",
                    vec![entry("mod.rs", MODE_FILE, EntryKind::Blob, 2, "b/mod")],
                ),
            )
            .unwrap();
        fetcher
            .insert_object("b/readme", &Blob::from_bytes("b/readme", b"hello"))
            .unwrap();
        fetcher
            .insert_object("b/run", &Blob::from_bytes("b/run", b"#!"))
            .unwrap();
        fetcher
            .insert_object("b/lib", &Blob::from_bytes("b/lib", b"fn;"))
            .unwrap();
        fetcher
            .insert_object("b/mod", &Blob::from_bytes("b/mod", b"//"))
            .unwrap();

        let fetcher = Arc::new(fetcher);
        let cache = TreeCache::new(repo, API, fetcher.clone());
        (fetcher, cache)
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a"), (ROOT, "a"));
        assert_eq!(split_path("a/b"), ("a", "b"));
        assert_eq!(split_path("a/b/c"), ("a/b", "c"));
    }

    #[tokio::test]
    async fn test_nested_resolution_is_memoized() {
        let (fetcher, cache) = fixture();

        let first = cache.resolve_entry("src/util/mod.rs").await.unwrap();
        assert_eq!(first.url, "b/mod");
        assert_eq!(fetcher.fetch_count(cache.root_url()), 1);
        assert_eq!(fetcher.fetch_count("t/src"), 1);
        assert_eq!(fetcher.fetch_count("t/util"), 1);
        assert_eq!(fetcher.total_fetches(), 3);

        let second = cache.resolve_entry("src/util/mod.rs").await.unwrap();
        assert_eq!(first, second);
        let util = cache.resolve_tree("src/util").await.unwrap();
        let again = cache.resolve_tree("src/util").await.unwrap();
        assert_eq!(util, again);
        assert_eq!(fetcher.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_root_entry() {
        let (_, cache) = fixture();
        let root = cache.resolve_entry(ROOT).await.unwrap();
        assert_eq!(root.path, "demo");
        assert!(root.is_dir());
        assert_eq!(root.size, 0);
        assert_eq!(root.url, cache.root_url());
    }

    #[tokio::test]
    async fn test_missing_ancestor_is_not_found() {
        let (fetcher, cache) = fixture();

        let err = cache.resolve_entry("src/nope/mod.rs").await.unwrap_err();
        assert_eq!(err, FsError::NotFound("src/nope".into()));

        let err = cache.resolve_entry("src/util/nope.rs").await.unwrap_err();
        assert_eq!(err, FsError::NotFound("src/util/nope.rs".into()));

        let err = cache.read_blob_content("missing/path").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(fetcher.fetch_count("b/readme"), 0);
    }

    #[tokio::test]
    async fn test_blob_as_directory() {
        let (_, cache) = fixture();
        let err = cache.resolve_tree("README.md").await.unwrap_err();
        assert_eq!(err, FsError::NotADirectory("README.md".into()));

        let err = cache.resolve_entry("README.md/x").await.unwrap_err();
        assert_eq!(err, FsError::NotADirectory("README.md".into()));
    }

    #[tokio::test]
    async fn test_blob_content_is_memoized() {
        let (fetcher, cache) = fixture();

        let content = cache.read_blob_content("README.md").await.unwrap();
        assert_eq!(content, Bytes::from_static(b"hello"));
        let again = cache.read_blob_content("README.md").await.unwrap();
        assert_eq!(content, again);
        assert_eq!(fetcher.fetch_count("b/readme"), 1);
        assert_eq!(fetcher.fetch_count(cache.root_url()), 1);
    }

    #[tokio::test]
    async fn test_blob_kind_checks() {
        let (_, cache) = fixture();
        assert_eq!(
            cache.read_blob_content("src").await.unwrap_err(),
            FsError::IsADirectory("src".into())
        );
        assert_eq!(
            cache.read_blob_content("vendor").await.unwrap_err(),
            FsError::InvalidType {
                path: "vendor".into(),
                kind: "commit".into()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (fetcher, cache) = fixture();
        let root_url = cache.root_url().to_string();
        fetcher.fail_next(&root_url, FsError::status(&root_url, 503));

        let err = cache.resolve_tree(ROOT).await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));

        let root = cache.resolve_tree(ROOT).await.unwrap();
        assert_eq!(root.tree.len(), 4);
        assert_eq!(fetcher.fetch_count(&root_url), 2);
    }

    #[tokio::test]
    async fn test_failed_ancestor_tree_is_retried() {
        let (fetcher, cache) = fixture();
        fetcher.fail_next("t/util", FsError::status("t/util", 500));

        let err = cache.resolve_entry("src/util/mod.rs").await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));

        let entry = cache.resolve_entry("src/util/mod.rs").await.unwrap();
        assert_eq!(entry.url, "b/mod");
        assert_eq!(fetcher.fetch_count("t/util"), 2);
        assert_eq!(fetcher.fetch_count("t/src"), 1);
        assert_eq!(fetcher.fetch_count(cache.root_url()), 1);
    }

    #[tokio::test]
    async fn test_failed_blob_fetch_is_retried() {
        let (fetcher, cache) = fixture();
        fetcher.fail_next("b/lib", FsError::transport("b/lib", "connection reset"));

        assert!(cache.read_blob_content("src/lib.rs").await.is_err());
        let content = cache.read_blob_content("src/lib.rs").await.unwrap();
        assert_eq!(content, Bytes::from_static(b"fn;"));
        assert_eq!(fetcher.fetch_count("b/lib"), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_path_fetches_once() {
        let (fetcher, cache) =
            fixture_with(MemoryFetcher::new().with_latency(Duration::from_millis(50)));
        let cache = Arc::new(cache);

        let mut handles = vec![];
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.read_blob_content("src/util/mod.rs").await
            }));
        }
        for handle in handles {
            let content = handle.await.unwrap().unwrap();
            assert_eq!(content, Bytes::from_static(b"//"));
        }

        assert_eq!(fetcher.fetch_count(cache.root_url()), 1);
        assert_eq!(fetcher.fetch_count("t/src"), 1);
        assert_eq!(fetcher.fetch_count("t/util"), 1);
        assert_eq!(fetcher.fetch_count("b/mod"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_paths_fetch_in_parallel() {
        let latency = Duration::from_millis(300);
        let (_, cache) = fixture_with(MemoryFetcher::new().with_latency(latency));
        cache.resolve_entry("README.md").await.unwrap();

        let start = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            cache.read_blob_content("README.md"),
            cache.read_blob_content("run.sh"),
        );
        assert_eq!(a.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(b.unwrap(), Bytes::from_static(b"#!"));
        assert!(start.elapsed() < latency * 2);
    }
}
