//! Error type for the kernel facade.

use thiserror::Error;

use arbor_index::IndexError;
use arbor_store::StoreError;
use arbor_types::BlockId;
use arbor_view::ViewError;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("cannot delete the root block {0}")]
    ProtectedRoot(BlockId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("logging already initialized: {0}")]
    LoggingInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
