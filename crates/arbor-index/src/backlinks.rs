//! Reverse index of block references.
//!
//! Kept eagerly in step with commits: each patch replaces the source block's
//! forward link set, and the reverse map is patched by diffing old against
//! new. Only live Normal blocks contribute links.

use std::collections::{BTreeSet, HashMap};

use arbor_store::{BlockStore, CommitEvent, Patch};
use arbor_types::{Block, BlockId, BlockKind};

use crate::BacklinkLookup;

#[derive(Debug, Default)]
pub struct BacklinkIndex {
    /// source -> targets it references
    forward: HashMap<BlockId, BTreeSet<BlockId>>,
    /// target -> sources referencing it
    reverse: HashMap<BlockId, BTreeSet<BlockId>>,
}

fn links_of(block: &Block) -> BTreeSet<BlockId> {
    if block.deleted || block.kind != BlockKind::Normal {
        return BTreeSet::new();
    }
    block.olinks().iter().filter(|t| **t != block.id).cloned().collect()
}

impl BacklinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from every live block in the store.
    pub fn from_store(store: &BlockStore) -> Self {
        let mut index = Self::new();
        for block in store.iter() {
            index.set_links(&block.id, links_of(block));
        }
        tracing::debug!(sources = index.forward.len(), targets = index.reverse.len(), "built backlink index");
        index
    }

    /// Apply the patches of one commit.
    pub fn observe(&mut self, event: &CommitEvent) {
        for patch in &event.patches {
            match patch {
                Patch::Add { block } | Patch::Update { block } => self.set_links(&block.id, links_of(block)),
                Patch::Delete { block_id } => self.set_links(block_id, BTreeSet::new()),
            }
        }
    }

    fn set_links(&mut self, source: &BlockId, new: BTreeSet<BlockId>) {
        let old = self.forward.remove(source).unwrap_or_default();
        for target in old.difference(&new) {
            if let Some(sources) = self.reverse.get_mut(target) {
                sources.remove(source);
                if sources.is_empty() {
                    self.reverse.remove(target);
                }
            }
        }
        for target in new.difference(&old) {
            self.reverse.entry(target.clone()).or_default().insert(source.clone());
        }
        if !new.is_empty() {
            self.forward.insert(source.clone(), new);
        }
    }

    /// Blocks referencing `target`, in id order.
    pub fn backlinks_of(&self, target: &BlockId) -> Vec<BlockId> {
        self.reverse
            .get(target)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Blocks `source` references.
    pub fn links_from(&self, source: &BlockId) -> Vec<BlockId> {
        self.forward
            .get(source)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}

impl BacklinkLookup for BacklinkIndex {
    fn backlinks(&self, target: &BlockId) -> Vec<BlockId> {
        self.backlinks_of(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::Origin;
    use arbor_types::BlockContent;

    fn text(id: &str, body: &str) -> Block {
        Block::normal(id, "root", BlockContent::text(body))
    }

    fn names(ids: Vec<BlockId>) -> Vec<String> {
        ids.into_iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_backlinks_follow_commits() {
        let mut store = BlockStore::new();
        let mut index = BacklinkIndex::new();

        let mut tx = store.begin(Origin::Ui);
        tx.add_block(text("t", "target"));
        tx.add_block(text("a", "see ((t))"));
        tx.add_block(text("b", "also ((t)) and ((a))"));
        index.observe(&store.commit(tx).unwrap());

        assert_eq!(names(index.backlinks_of(&"t".into())), vec!["a", "b"]);
        assert_eq!(names(index.backlinks_of(&"a".into())), vec!["b"]);
        assert_eq!(names(index.links_from(&"b".into())), vec!["a", "t"]);

        let mut tx = store.begin(Origin::Ui);
        tx.update_block(text("a", "no links now"));
        tx.delete_block("b");
        index.observe(&store.commit(tx).unwrap());

        assert!(index.backlinks_of(&"t".into()).is_empty());
        assert!(index.backlinks_of(&"a".into()).is_empty());
    }

    #[test]
    fn test_soft_delete_drops_links() {
        let mut store = BlockStore::new();
        let mut tx = store.begin(Origin::Ui);
        tx.add_block(text("a", "((t))"));
        store.commit(tx).unwrap();
        let mut index = BacklinkIndex::from_store(&store);
        assert_eq!(names(index.backlinks(&"t".into())), vec!["a"]);

        let mut gone = text("a", "((t))");
        gone.deleted = true;
        let mut tx = store.begin(Origin::Ui);
        tx.update_block(gone);
        index.observe(&store.commit(tx).unwrap());
        assert!(index.backlinks(&"t".into()).is_empty());
    }

    #[test]
    fn test_self_reference_ignored() {
        let mut store = BlockStore::new();
        let mut tx = store.begin(Origin::Ui);
        tx.add_block(text("a", "me ((a))"));
        store.commit(tx).unwrap();
        let index = BacklinkIndex::from_store(&store);
        assert!(index.backlinks_of(&"a".into()).is_empty());
    }
}
