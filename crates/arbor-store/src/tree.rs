//! Ownership-tree navigation.
//!
//! These walks follow `parent_id` and own `children` lists only; they never
//! cross `src` edges. Every walk is iterative and circuit-breaks at
//! [`MAX_TREE_DEPTH`], since a corrupted parent edge can form a loop.

use std::collections::HashSet;

use arbor_types::{Block, BlockId, MAX_TREE_DEPTH};

use crate::{BlockStore, Result, StoreError};

impl BlockStore {
    /// Ordered ancestor chain including the block itself, root first.
    ///
    /// The walk stops at the first parent id that isn't a live block (the
    /// root sentinel, or an orphan's dangling parent).
    pub fn get_block_path(&self, id: &BlockId) -> Result<Vec<&Block>> {
        let block = self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(block);
        Ok(path)
    }

    /// Ancestors of a block, from immediate parent up to the topmost live one.
    ///
    /// Circuit-breaks at `MAX_TREE_DEPTH`.
    pub fn ancestors(&self, id: &BlockId) -> Vec<&Block> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut current = self.get(id);

        while let Some(block) = current {
            if result.len() >= MAX_TREE_DEPTH {
                tracing::warn!("ancestors() hit MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), truncating");
                break;
            }
            if !seen.insert(&block.parent_id) {
                tracing::warn!(block = %block.id, "parent chain loops, truncating");
                break;
            }
            match self.get(&block.parent_id) {
                Some(parent) => {
                    result.push(parent);
                    current = Some(parent);
                }
                None => break,
            }
        }

        result
    }

    /// Number of live ancestors (0 for top-level blocks).
    pub fn depth(&self, id: &BlockId) -> usize {
        self.ancestors(id).len()
    }

    /// Pre-order walk of the owned subtree under `id`, including `id`.
    ///
    /// Yields `(depth, block)` with the start block at depth 0. Soft-deleted
    /// and missing children are skipped.
    pub fn descendants<'a>(&'a self, id: &BlockId) -> Descendants<'a> {
        let stack = self.get(id).map(|b| vec![(0, b)]).unwrap_or_default();
        Descendants {
            store: self,
            stack,
            visited: HashSet::new(),
        }
    }
}

/// Depth-first iterator over an owned subtree.
///
/// Tracks visited ids to protect against child-list cycles. Stops descending
/// past `MAX_TREE_DEPTH`.
pub struct Descendants<'a> {
    store: &'a BlockStore,
    stack: Vec<(usize, &'a Block)>,
    visited: HashSet<&'a BlockId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (usize, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((depth, block)) = self.stack.pop() {
            if !self.visited.insert(&block.id) {
                continue; // already visited (cycle)
            }
            if depth >= MAX_TREE_DEPTH {
                tracing::warn!("descendants() hit MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), pruning");
                continue;
            }
            if let Some(children) = block.children_ids() {
                for child in children.iter().rev() {
                    if let Some(child) = self.store.get(child) {
                        self.stack.push((depth + 1, child));
                    }
                }
            }
            return Some((depth, block));
        }
        None
    }
}
