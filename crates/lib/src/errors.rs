//! # Core Error Kinds
//!
//! One `thiserror` enum, so callers can match on a stable code instead of
//! parsing messages. Module-local errors (`LoaderError`, `VectorStoreError`,
//! ...) convert into this via `#[from]`; every variant below is already
//! load-bearing, so none of them wraps a bare `String`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document content is empty after extraction")]
    EmptyContent,

    #[error("document loader failed: {0}")]
    LoaderFailure(String),

    #[error("embedding provider unavailable after retries: {0}")]
    EmbeddingUnavailable(String),

    #[error("vector store unavailable: {0}")]
    VectorStoreUnavailable(String),

    #[error("vector store corrupt: {0}")]
    VectorStoreCorrupt(String),

    #[error("project has no indexed collection")]
    NotIndexed,

    #[error("model returned an empty response")]
    ModelReturnedEmpty,

    #[error("document already processed")]
    AlreadyProcessed,

    #[error("operation cancelled")]
    Cancelled,

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Stable machine-readable code, independent of the (possibly
    /// parameterized) display message.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            CoreError::EmptyContent => "EMPTY_CONTENT",
            CoreError::LoaderFailure(_) => "LOADER_FAILURE",
            CoreError::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            CoreError::VectorStoreUnavailable(_) => "VECTOR_STORE_UNAVAILABLE",
            CoreError::VectorStoreCorrupt(_) => "VECTOR_STORE_CORRUPT",
            CoreError::NotIndexed => "NOT_INDEXED",
            CoreError::ModelReturnedEmpty => "MODEL_RETURNED_EMPTY",
            CoreError::AlreadyProcessed => "ALREADY_PROCESSED",
            CoreError::Cancelled => "CANCELLED",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Storage(_) => "STORAGE_ERROR",
            CoreError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<turso::Error> for CoreError {
    fn from(err: turso::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}
