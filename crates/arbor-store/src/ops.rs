//! Transactions and the patch log.
//!
//! All mutations to a [`BlockStore`] go through a [`Transaction`]:
//! operations are buffered without touching the store, then applied as one
//! unit by [`BlockStore::commit`], which emits a single [`CommitEvent`].
//!
//! Operations on the same id coalesce to that id's last effective state,
//! keeping the position of the id's first recorded operation.

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use arbor_types::{Block, BlockId};

use crate::BlockStore;

/// Where a change came from. Carried through to subscribers; has no effect
/// on store semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Origin {
    /// Local interactive edit.
    #[default]
    Ui,
    /// Bulk import.
    Import,
    /// Externally driven (sync layer).
    Remote,
}

impl Origin {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Ui => "ui",
            Origin::Import => "import",
            Origin::Remote => "remote",
        }
    }

    /// Whether the change originated outside this replica.
    pub fn is_remote(&self) -> bool {
        matches!(self, Origin::Remote)
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A buffered operation, as recorded.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Add(Block),
    Update(Block),
    Delete(BlockId),
}

impl Op {
    /// Get the block ID this operation targets.
    pub fn target_block(&self) -> &BlockId {
        match self {
            Op::Add(block) | Op::Update(block) => &block.id,
            Op::Delete(id) => id,
        }
    }
}

/// One applied change, as delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Patch {
    Add { block: Block },
    Update { block: Block },
    Delete { block_id: BlockId },
}

impl Patch {
    pub fn block_id(&self) -> &BlockId {
        match self {
            Patch::Add { block } | Patch::Update { block } => &block.id,
            Patch::Delete { block_id } => block_id,
        }
    }

    /// The block state after the patch, if it still exists.
    pub fn block(&self) -> Option<&Block> {
        match self {
            Patch::Add { block } | Patch::Update { block } => Some(block),
            Patch::Delete { .. } => None,
        }
    }
}

/// Emitted once per successful commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub origin: Origin,
    /// Store version after this commit.
    pub version: u64,
    pub patches: Vec<Patch>,
}

impl CommitEvent {
    /// Ids touched by this commit, in patch order.
    pub fn block_ids(&self) -> impl Iterator<Item = &BlockId> {
        self.patches.iter().map(Patch::block_id)
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Buffered set of operations awaiting commit.
#[derive(Clone, Debug)]
pub struct Transaction {
    origin: Origin,
    ops: Vec<Op>,
}

impl Transaction {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            ops: Vec::new(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn add_block(&mut self, block: Block) -> &mut Self {
        self.ops.push(Op::Add(block));
        self
    }

    pub fn update_block(&mut self, block: Block) -> &mut Self {
        self.ops.push(Op::Update(block));
        self
    }

    pub fn delete_block(&mut self, id: impl Into<BlockId>) -> &mut Self {
        self.ops.push(Op::Delete(id.into()));
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub(crate) fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Read a block as this transaction would leave it.
    ///
    /// A block deleted earlier in the transaction stays addressable, with
    /// `deleted` set, until commit.
    pub fn get<'a>(&'a self, store: &'a BlockStore, id: &BlockId) -> Option<Cow<'a, Block>> {
        let mut deleted = false;
        for op in self.ops.iter().rev() {
            if op.target_block() != id {
                continue;
            }
            match op {
                Op::Add(block) | Op::Update(block) if !deleted => return Some(Cow::Borrowed(block)),
                Op::Add(block) | Op::Update(block) => {
                    let mut block = block.clone();
                    block.deleted = true;
                    return Some(Cow::Owned(block));
                }
                Op::Delete(_) => deleted = true,
            }
        }
        let current = store.get_raw(id)?;
        if deleted {
            let mut block = current.clone();
            block.deleted = true;
            Some(Cow::Owned(block))
        } else {
            Some(Cow::Borrowed(current))
        }
    }
}
