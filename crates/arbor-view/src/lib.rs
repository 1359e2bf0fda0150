//! Display projection for arbor.
//!
//! Turns a rooted view of the block graph into ordered, render-ready rows.
//! Collaborators (store, backlink lookup, text search) are passed in; the
//! projector holds no state between calls.
//!
//! ```
//! use std::collections::HashMap;
//!
//! use arbor_store::{BlockStore, Origin};
//! use arbor_types::{Block, BlockContent, BlockId};
//! use arbor_view::{ExpandedState, ItemKind, Projector, ViewOptions};
//!
//! let mut store = BlockStore::new();
//! let mut tx = store.begin(Origin::Ui);
//! tx.add_block(Block::normal("R", "root", BlockContent::text("hello")).with_children(["C"]));
//! tx.add_block(Block::normal("C", "R", BlockContent::text("child")));
//! store.commit(tx).unwrap();
//!
//! let backlinks: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
//! let search = |_: &str| -> Vec<BlockId> { Vec::new() };
//! let projector = Projector::new(&store, &backlinks, &search);
//! let items = projector
//!     .project(&["R".into()], &ViewOptions::default(), &ExpandedState::new())
//!     .unwrap();
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[1].kind, ItemKind::BasicBlock);
//! ```

mod error;
mod item;
mod options;
mod projector;

pub use error::{ConfigError, Result, ViewError};
pub use item::{DisplayItem, ItemKind};
pub use options::{ExpandedState, ViewOptions};
pub use projector::Projector;
