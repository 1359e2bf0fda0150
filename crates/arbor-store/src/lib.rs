//! Block store for arbor.
//!
//! Owns every block record, resolves mirror/virtual `src` chains, and applies
//! buffered transactions atomically, broadcasting one [`CommitEvent`] per
//! commit.
//!
//! # Example
//!
//! ```
//! use arbor_store::{BlockStore, Origin};
//! use arbor_types::{Block, BlockContent};
//!
//! let mut store = BlockStore::new();
//! let mut tx = store.begin(Origin::Ui);
//! tx.add_block(Block::normal("a", "root", BlockContent::text("hello")));
//! let event = store.commit(tx).unwrap();
//! assert_eq!(event.patches.len(), 1);
//! assert_eq!(store.get(&"a".into()).unwrap().ctext(), "hello");
//! ```

mod block_store;
mod error;
mod import;
mod ops;
mod tree;

pub use block_store::{BlockStore, ChildSlot};
pub use error::StoreError;
pub use import::{ImportRecord, import_batch};
pub use ops::{CommitEvent, Op, Origin, Patch, Transaction};
pub use tree::Descendants;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
