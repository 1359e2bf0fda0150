//! Search and link indexes for arbor.
//!
//! - [`FullTextIndex`]: an in-RAM tantivy index over `ctext`/`mtext`, marked
//!   dirty by commits and rebuilt lazily on the next search.
//! - [`BacklinkIndex`]: reverse map of `olinks`, maintained eagerly.
//!
//! The display projector consumes both through the [`BacklinkLookup`] and
//! [`TextSearch`] traits, so tests can hand it plain maps and closures.

mod backlinks;
mod error;
mod fulltext;
mod tokenize;

use std::collections::HashMap;

use arbor_store::BlockStore;
use arbor_types::BlockId;

pub use backlinks::BacklinkIndex;
pub use error::{IndexError, Result};
pub use fulltext::{DEFAULT_SEARCH_LIMIT, FullTextIndex, SearchMode, SearchOptions};
pub use tokenize::{DEFAULT_MIN_TOKEN_LEN, analyzer, tokenize};

/// `blockId -> ids of blocks referencing it`.
pub trait BacklinkLookup {
    fn backlinks(&self, target: &BlockId) -> Vec<BlockId>;
}

impl BacklinkLookup for HashMap<BlockId, Vec<BlockId>> {
    fn backlinks(&self, target: &BlockId) -> Vec<BlockId> {
        self.get(target).cloned().unwrap_or_default()
    }
}

/// Free-text query returning matching block ids, best first.
pub trait TextSearch {
    fn search(&self, query: &str) -> Vec<BlockId>;
}

impl<F> TextSearch for F
where
    F: Fn(&str) -> Vec<BlockId>,
{
    fn search(&self, query: &str) -> Vec<BlockId> {
        self(query)
    }
}

/// [`TextSearch`] over a [`FullTextIndex`] bound to a store snapshot.
pub struct IndexSearch<'a> {
    pub index: &'a FullTextIndex,
    pub store: &'a BlockStore,
    pub options: SearchOptions,
}

impl TextSearch for IndexSearch<'_> {
    fn search(&self, query: &str) -> Vec<BlockId> {
        match self.index.search(self.store, query, &self.options) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%err, "full-text search failed");
                Vec::new()
            }
        }
    }
}
