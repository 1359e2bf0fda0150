//! Error types for projection.

use thiserror::Error;

/// Option combinations the projector refuses before doing any work.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("enlarge_root_block and add_side_pane_header are mutually exclusive")]
    EnlargeWithSidePaneHeader,

    #[error("enlarge_root_block takes exactly one root, got {0}")]
    EnlargeWithMultipleRoots(usize),
}

/// Errors that abort a projection.
///
/// Per-node faults (missing children, broken or cyclic aliases) never show
/// up here; they become placeholder rows or log lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("invalid view options: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
