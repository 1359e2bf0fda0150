//! # arbor-kernel
//!
//! Wires the arbor pieces together for a host application:
//!
//! - a [`BlockStore`](arbor_store::BlockStore) owning every block,
//! - a lazily rebuilt full-text index and an eager backlink index, both fed
//!   from commit events,
//! - the display projector, with the kernel itself as its search backend,
//! - RON configuration and tracing subscriber setup.
//!
//! The kernel is single-writer: commits take `&mut self`, reads take `&self`.

pub mod config;
pub mod error;
pub mod kernel;
pub mod logging;

pub use config::{KernelConfig, LogConfig, SearchConfig, ViewDefaults};
pub use error::{KernelError, Result};
pub use kernel::Kernel;
pub use logging::init_logging;

pub use arbor_index::{SearchMode, SearchOptions};
pub use arbor_store::{CommitEvent, ImportRecord, Origin, Patch, Transaction};
pub use arbor_types::{Block, BlockContent, BlockId, BlockKind, Status};
pub use arbor_view::{DisplayItem, ExpandedState, ItemKind, ViewOptions};
