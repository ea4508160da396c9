use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the zero-length object that keeps an otherwise empty folder
/// visible in the flat namespace.
pub const PLACEHOLDER_NAME: &str = ".gitkeep";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("expected a directory at {path}")]
    NotADirectory { path: String },
    #[error("expected a file at {path}")]
    NotAFile { path: String },
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("api returned {status}: {message}")]
    Remote { status: StatusCode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    RateLimited,
    Auth,
    Transient,
    Permanent,
    /// The request or the remote shape did not match what the caller asked for.
    Malformed,
}

impl StoreError {
    pub fn classification(&self) -> ErrorClass {
        match self {
            StoreError::NotFound { .. } => ErrorClass::NotFound,
            StoreError::RateLimited { .. } => ErrorClass::RateLimited,
            StoreError::Request(_) => ErrorClass::Transient,
            StoreError::Remote { status, .. } => classify_status(*status),
            StoreError::Decode(_) => ErrorClass::Permanent,
            StoreError::NotADirectory { .. }
            | StoreError::NotAFile { .. }
            | StoreError::InvalidBaseUrl(_)
            | StoreError::Url(_) => ErrorClass::Malformed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.classification() == ErrorClass::NotFound
    }
}

fn classify_status(status: StatusCode) -> ErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ErrorClass::Auth
    } else if status.is_server_error()
        || matches!(status, StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT)
    {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Locator of a remote object as of the listing or write that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl RemoteRef {
    pub fn new(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sha: sha.into(),
            html_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub reference: RemoteRef,
}

impl RemoteEntry {
    pub fn is_placeholder(&self) -> bool {
        self.kind == EntryKind::File && self.name == PLACEHOLDER_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub bytes: Vec<u8>,
    pub reference: RemoteRef,
}

/// A flat, path-addressed object namespace with no folder or move primitive.
///
/// Paths are repository-relative and `/`-separated; the empty string is the
/// repository root. Every mutating call records a remote-visible commit
/// labeled with `message`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Immediate children of the folder at `path`.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StoreError>;

    async fn get(&self, reference: &RemoteRef) -> Result<RemoteObject, StoreError>;

    /// Creates or overwrites the object at `path`.
    ///
    /// Not idempotent: when a rate-limited request was in fact applied
    /// before the limit was signalled, the retry writes a second commit or
    /// fails with a sha conflict.
    async fn put(&self, path: &str, bytes: &[u8], message: &str) -> Result<RemoteRef, StoreError>;

    async fn delete(&self, path: &str, message: &str) -> Result<(), StoreError>;
}
