//! Error types for store operations.

use thiserror::Error;

use arbor_types::{BlockId, StatusError};

/// Errors that can occur while resolving, committing, or importing blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Block id does not resolve to a live block.
    #[error("block not found: {0}")]
    NotFound(BlockId),

    /// A mirror/virtual `src` chain loops back on itself.
    #[error("src cycle resolving {start}: {at} visited twice")]
    CycleDetected { start: BlockId, at: BlockId },

    /// Packed status outside the valid range.
    #[error(transparent)]
    InvalidStatus(#[from] StatusError),

    /// Add of an id that already exists.
    #[error("block already exists: {0}")]
    DuplicateBlock(BlockId),

    /// Block violates the kind-specific field rules.
    #[error("invalid block {id}: {reason}")]
    InvalidBlock { id: BlockId, reason: &'static str },

    /// Import batch has more than one block whose parent is outside the batch.
    #[error("import batch needs more than one fallback-linked block: {0:?}")]
    MultipleFallbackRoots(Vec<BlockId>),
}
