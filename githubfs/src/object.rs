//! Wire shapes of the git trees/blobs API and the repository identity they
//! are fetched for.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{FsError, Result};

/// Path of the repository root.
pub const ROOT: &str = ".";

pub const MODE_DIR: &str = "040000";
pub const MODE_FILE: &str = "100644";
pub const MODE_EXECUTABLE: &str = "100755";

/// Which remote tree is being browsed. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub revision: String,
}

impl Repository {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            revision: revision.into(),
        }
    }

    pub fn root_tree_url(&self, api_url: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}",
            api_url.trim_end_matches('/'),
            self.owner,
            self.name,
            self.revision
        )
    }
}

/// The `type` of a tree entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    Tree,
    Blob,
    /// Anything else the API reports, e.g. `commit` for submodules.
    Other(String),
}

impl From<String> for EntryKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tree" => EntryKind::Tree,
            "blob" => EntryKind::Blob,
            _ => EntryKind::Other(s),
        }
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.as_str().to_string()
    }
}

impl EntryKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::Tree => "tree",
            EntryKind::Blob => "blob",
            EntryKind::Other(s) => s,
        }
    }
}

/// One child of a [`Tree`]. `path` is the leaf name, not a full path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: String,
}

impl TreeEntry {
    /// Pseudo entry standing for the repository root, which has no parent listing.
    pub fn root(repo_name: &str, url: &str) -> Self {
        Self {
            path: repo_name.to_string(),
            mode: MODE_DIR.to_string(),
            kind: EntryKind::Tree,
            size: 0,
            url: url.to_string(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Tree
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    #[serde(default)]
    pub sha: String,
    pub url: String,
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

impl Tree {
    /// First entry named `name`.
    pub fn find(&self, name: &str) -> Option<&TreeEntry> {
        self.tree.iter().find(|e| e.path == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    #[serde(default)]
    pub sha: String,
    pub url: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl Blob {
    /// Builds a base64-encoded blob, the shape the API serves.
    pub fn from_bytes(url: impl Into<String>, data: &[u8]) -> Self {
        Self {
            sha: String::new(),
            url: url.into(),
            content: B64.encode(data),
            encoding: Some("base64".to_string()),
        }
    }

    /// Raw file bytes. Line breaks inside base64 content are skipped.
    pub fn into_content(self) -> Result<Bytes> {
        match self.encoding.as_deref() {
            Some("utf-8") | Some("utf8") => Ok(Bytes::from(self.content)),
            None | Some("base64") => {
                let packed: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                B64.decode(packed)
                    .map(Bytes::from)
                    .map_err(|e| FsError::decode(&self.url, e))
            }
            Some(other) => Err(FsError::decode(
                &self.url,
                format!("unsupported blob encoding {other}"),
            )),
        }
    }
}
