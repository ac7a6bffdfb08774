use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsError>;

/// Errors surfaced by the filesystem and its fetchers.
///
/// The enum is `Clone` because a failed in-flight fetch is handed to every
/// caller that was waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("request to {url} failed: {message}")]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("failed to decode object from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{0}: does not exist")]
    NotFound(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("{0}: is a directory")]
    IsADirectory(String),

    #[error("{path}: invalid file type {kind}")]
    InvalidType { path: String, kind: String },

    #[error("{0}: invalid path")]
    InvalidPath(String),
}

impl FsError {
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Transport {
            url: url.into(),
            status: Some(status),
            message: format!("non-2XX status code: {status}"),
        }
    }

    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            status: None,
            message: message.to_string(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status carried by a transport failure, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::NotFound(_) => io::ErrorKind::NotFound,
            FsError::NotADirectory(_) => io::ErrorKind::NotADirectory,
            FsError::IsADirectory(_) => io::ErrorKind::IsADirectory,
            FsError::InvalidPath(_) => io::ErrorKind::InvalidInput,
            FsError::Decode { .. } | FsError::InvalidType { .. } => io::ErrorKind::InvalidData,
            FsError::Transport { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
