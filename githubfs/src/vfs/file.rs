use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use super::metadata::{DirPage, Metadata};
use crate::cache::TreeCache;
use crate::error::{FsError, Result};
use crate::object::{Tree, TreeEntry};

/// A handle returned by [`GithubFs::open`](super::GithubFs::open).
///
/// File handles read from an in-memory copy of the blob. Directory handles
/// list their children and reject every stream operation.
pub struct File {
    path: String,
    entry: TreeEntry,
    body: Body,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("entry", &self.entry)
            .field("is_dir", &self.is_dir())
            .finish()
    }
}

enum Body {
    Content(Cursor<Bytes>),
    Listing {
        cache: Arc<TreeCache>,
        tree: Option<Arc<Tree>>,
        offset: usize,
    },
}

impl File {
    pub(crate) fn content(path: &str, entry: TreeEntry, content: Bytes) -> Self {
        Self {
            path: path.to_string(),
            entry,
            body: Body::Content(Cursor::new(content)),
        }
    }

    pub(crate) fn directory(path: &str, entry: TreeEntry, cache: Arc<TreeCache>) -> Self {
        Self {
            path: path.to_string(),
            entry,
            body: Body::Listing {
                cache,
                tree: None,
                offset: 0,
            },
        }
    }

    /// Path this handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.body, Body::Listing { .. })
    }

    pub fn stat(&self) -> Metadata {
        Metadata::from_entry(&self.entry)
    }

    fn cursor(&mut self) -> io::Result<&mut Cursor<Bytes>> {
        match &mut self.body {
            Body::Content(cursor) => Ok(cursor),
            Body::Listing { .. } => Err(FsError::IsADirectory(self.path.clone()).into()),
        }
    }

    /// Read at `offset` without moving the cursor. Returns 0 at or past the end.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let data = match &self.body {
            Body::Content(cursor) => cursor.get_ref(),
            Body::Listing { .. } => return Err(FsError::IsADirectory(self.path.clone()).into()),
        };
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    /// Next batch of at most `n` children, or every remaining child when
    /// `n == 0`.
    ///
    /// The listing is taken from the tree cache on the first call and paged
    /// through on later calls, in the order the remote reported it. `end` is
    /// set on a batch shorter than `n`, so a listing that divides evenly ends
    /// with an empty batch.
    pub async fn read_dir(&mut self, n: usize) -> Result<DirPage> {
        let Body::Listing {
            cache,
            tree,
            offset,
        } = &mut self.body
        else {
            return Err(FsError::NotADirectory(self.path.clone()));
        };

        let listing = match tree {
            Some(listing) => Arc::clone(listing),
            None => {
                let listing = cache.resolve_tree(&self.path).await?;
                *tree = Some(Arc::clone(&listing));
                listing
            }
        };

        let remaining = &listing.tree[*offset..];
        let take = if n == 0 {
            remaining.len()
        } else {
            n.min(remaining.len())
        };
        let entries = remaining[..take].iter().map(Metadata::from_entry).collect();
        *offset += take;

        Ok(DirPage {
            entries,
            end: n == 0 || take < n,
        })
    }

    /// Release the handle. Nothing is held beyond the in-memory buffer.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor()?.read(buf)
    }
}

impl Seek for File {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor()?.seek(pos)
    }
}

impl AsyncRead for File {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().cursor() {
            Ok(cursor) => Pin::new(cursor).poll_read(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl AsyncSeek for File {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(self.get_mut().cursor()?).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        match self.get_mut().cursor() {
            Ok(cursor) => Pin::new(cursor).poll_complete(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}
