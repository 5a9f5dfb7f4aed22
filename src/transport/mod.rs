// Backend transport abstraction

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::intake::{FileInfo, PatternRequest};
use crate::normalize::RawProcessingPayload;
use crate::types::Dataset;

pub const UPLOAD_FALLBACK_MESSAGE: &str = "File upload failed";
pub const PROCESS_FALLBACK_MESSAGE: &str = "Data processing failed";

/// Failure of a transport call. Every variant carries a human-readable message:
/// the server's own `message` when it supplied one, otherwise the endpoint's
/// generic fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{message} (timed out after {timeout_ms} ms)")]
    Timeout { message: String, timeout_ms: u64 },

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{message}: {detail}")]
    Network { message: String, detail: String },

    #[error("{message}: unexpected response ({detail})")]
    InvalidResponse { message: String, detail: String },

    #[error("{message}: could not read {path} ({detail})")]
    ReadFile {
        message: String,
        path: String,
        detail: String,
    },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// HTTP status for non-2xx responses
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Read lazily at send time
    Path(PathBuf),
    Memory(Bytes),
}

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub info: FileInfo,
    pub source: FileSource,
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        let contents = contents.into();
        Self {
            info: FileInfo::new(name, contents.len() as u64),
            source: FileSource::Memory(contents),
        }
    }

    /// Describe a file on disk without reading it
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            info: FileInfo::new(name, metadata.len()),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub async fn read_contents(&self) -> std::io::Result<Bytes> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
        }
    }
}

/// Sends a raw file and returns the parsed dataset
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<Dataset, TransportError>;
}

/// Sends a dataset plus instruction and returns the unvalidated payload
#[async_trait]
pub trait ProcessingTransport: Send + Sync {
    async fn process(
        &self,
        dataset: &Dataset,
        pattern: &PatternRequest,
    ) -> Result<RawProcessingPayload, TransportError>;
}

/// Both backend contracts
pub trait Transport: UploadTransport + ProcessingTransport {}

impl<T: UploadTransport + ProcessingTransport> Transport for T {}
