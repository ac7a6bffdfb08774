//! githubfs: a lazy, read-only filesystem over a remote git tree.
//!
//! Layers, leaves first:
//! - `fetch`: one JSON object per URL, no caching
//! - `cache`: per-path memoization of trees and blob contents
//! - `vfs`: path-based `open`/`stat`/`read_dir` and the handles it returns
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::io::Read;
//!
//! let fs = githubfs::GithubFs::new("rust-lang", "rust", "master")?;
//! let mut readme = fs.open("README.md").await?;
//! let mut text = String::new();
//! readme.read_to_string(&mut text)?;
//! for entry in fs.read_dir("src").await? {
//!     println!("{} {:>8} {}", entry.mode(), entry.size(), entry.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod object;
pub mod vfs;

pub use cache::TreeCache;
pub use config::Config;
pub use error::{FsError, Result};
pub use fetch::{HttpFetcher, MemoryFetcher, ObjectFetcher};
pub use object::{ROOT, Repository};
pub use vfs::{DirPage, File, FileMode, GithubFs, Metadata, valid_path};
