//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Classification of a processing failure, used by callers to map the
/// failure onto their own surface (e.g. a transport status code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingErrorKind {
    /// The input itself is malformed or otherwise unusable.
    InvalidInput,
    /// The input (or a derived artifact) exceeds a hard size ceiling.
    PayloadTooLarge,
}

/// A format provider or segmentation step failed on the given input.
///
/// Terminal per request; never retried.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProcessingError {
    pub message: String,
    pub kind: ProcessingErrorKind,
}

impl ProcessingError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ProcessingErrorKind::InvalidInput,
        }
    }

    pub fn too_large(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ProcessingErrorKind::PayloadTooLarge,
        }
    }
}

impl From<std::io::Error> for ProcessingError {
    fn from(e: std::io::Error) -> Self {
        ProcessingError::invalid(format!("failed to read source file: {e}"))
    }
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

/// Errors related to the transcription backend.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription payload too large")]
    PayloadTooLarge,

    #[error("transcription backend error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("transcription request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Errors raised while driving one file through the ingestion pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file format not supported")]
    UnsupportedFormat,

    #[error("processing failed: {0}")]
    Processing(#[from] ProcessingError),

    #[error("isolated worker failed: {0}")]
    Worker(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}
