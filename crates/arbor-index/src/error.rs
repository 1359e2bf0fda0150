//! Error type for index maintenance and queries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("search index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
