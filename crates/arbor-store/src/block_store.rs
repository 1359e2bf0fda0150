//! Block store: the canonical table of blocks.
//!
//! Blocks live in one owned table keyed by id. Mirror and virtual blocks
//! hold ids, never references, so every alias hop is an explicit lookup that
//! can be bounded and cycle-checked.
//!
//! # Concurrency Model
//!
//! Single writer. Mutations happen only in [`BlockStore::commit`], which
//! applies a whole transaction before returning; readers holding `&self`
//! can never observe a partial commit. Subscribers receive one
//! [`CommitEvent`] per commit over a broadcast channel.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tokio::sync::broadcast;

use arbor_types::{Block, BlockId, MAX_TREE_DEPTH};

use crate::ops::{CommitEvent, Op, Origin, Patch, Transaction};
use crate::{Result, StoreError};

/// Capacity of the commit event channel.
const EVENT_CAPACITY: usize = 1024;

/// One entry of a resolved child list.
#[derive(Clone, Copy, Debug)]
pub enum ChildSlot<'a> {
    Present(&'a Block),
    /// Listed as a child but absent from the store.
    Missing(&'a BlockId),
}

/// The canonical set of blocks.
pub struct BlockStore {
    /// Blocks indexed by ID (including soft-deleted ones).
    blocks: BTreeMap<BlockId, Block>,

    /// Store version (bumped on every non-empty commit).
    version: u64,

    /// Commit event broadcaster.
    event_tx: broadcast::Sender<CommitEvent>,
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            blocks: BTreeMap::new(),
            version: 0,
            event_tx,
        }
    }

    /// Get the event receiver for subscribing to commits.
    pub fn subscribe(&self) -> broadcast::Receiver<CommitEvent> {
        self.event_tx.subscribe()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of live (non-deleted) blocks.
    pub fn len(&self) -> usize {
        self.blocks.values().filter(|b| !b.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live block by id. Soft-deleted blocks are absent here.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id).filter(|b| !b.deleted)
    }

    /// Block by id, including soft-deleted ones.
    pub fn get_raw(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.get(id).is_some()
    }

    /// Live blocks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values().filter(|b| !b.deleted)
    }

    // =========================================================================
    // Alias resolution
    // =========================================================================

    /// Follow `src` pointers to the terminal Normal block.
    ///
    /// Normal blocks resolve to themselves. A chain that revisits an id is a
    /// [`StoreError::CycleDetected`]; a dangling `src` is
    /// [`StoreError::NotFound`].
    pub fn resolve_source<'a>(&'a self, block: &'a Block) -> Result<&'a Block> {
        let mut current = block;
        let mut visited = HashSet::new();
        visited.insert(&block.id);

        while current.kind.is_alias() {
            let src = current.src.as_ref().ok_or_else(|| StoreError::InvalidBlock {
                id: current.id.clone(),
                reason: "alias block without src",
            })?;
            if !visited.insert(src) || visited.len() > MAX_TREE_DEPTH {
                return Err(StoreError::CycleDetected {
                    start: block.id.clone(),
                    at: src.clone(),
                });
            }
            current = self.get(src).ok_or_else(|| StoreError::NotFound(src.clone()))?;
        }
        Ok(current)
    }

    /// Resolved terminal source id (`acturalSrc`) of the block at `id`.
    pub fn actual_src(&self, id: &BlockId) -> Result<BlockId> {
        let block = self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(self.resolve_source(block)?.id.clone())
    }

    /// Children of `block` as displayed.
    ///
    /// Normal blocks use their own list. Mirror and Virtual blocks use the
    /// resolved source's list, except a Virtual block with
    /// `children_created`, whose local children win. Returns `Ok(None)` when
    /// the list isn't loaded. Soft-deleted children are skipped; ids absent
    /// from the store come back as [`ChildSlot::Missing`].
    pub fn resolve_children<'a>(&'a self, block: &'a Block) -> Result<Option<Vec<ChildSlot<'a>>>> {
        let owner = if block.children_from_source() {
            self.resolve_source(block)?
        } else {
            block
        };
        let Some(ids) = owner.children.ids() else {
            return Ok(None);
        };

        let mut slots = Vec::with_capacity(ids.len());
        for id in ids {
            match self.blocks.get(id) {
                Some(child) if child.deleted => {}
                Some(child) => slots.push(ChildSlot::Present(child)),
                None => {
                    tracing::warn!(parent = %owner.id, child = %id, "child id does not resolve");
                    slots.push(ChildSlot::Missing(id));
                }
            }
        }
        Ok(Some(slots))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Start buffering a set of changes.
    pub fn begin(&self, origin: Origin) -> Transaction {
        Transaction::new(origin)
    }

    /// Apply a transaction atomically.
    ///
    /// Every operation is validated against the coalesced state before
    /// anything is written: on error the store is left untouched. Adding a
    /// block whose parent doesn't exist is allowed (bulk imports relink
    /// afterwards).
    pub fn commit(&mut self, tx: Transaction) -> Result<CommitEvent> {
        let origin = tx.origin();
        let mut finals: IndexMap<BlockId, Option<Block>> = IndexMap::new();

        for op in tx.into_ops() {
            let id = op.target_block().clone();
            let exists = match finals.get(&id) {
                Some(state) => state.is_some(),
                None => self.blocks.contains_key(&id),
            };
            match op {
                Op::Add(block) => {
                    if exists {
                        return Err(StoreError::DuplicateBlock(id));
                    }
                    finals.insert(id, Some(block));
                }
                Op::Update(block) => {
                    if !exists {
                        return Err(StoreError::NotFound(id));
                    }
                    finals.insert(id, Some(block));
                }
                Op::Delete(_) => {
                    if !exists {
                        return Err(StoreError::NotFound(id));
                    }
                    finals.insert(id, None);
                }
            }
        }

        let mut patches = Vec::with_capacity(finals.len());
        for (id, state) in finals {
            let existed = self.blocks.contains_key(&id);
            match state {
                Some(block) => {
                    block.check_invariants().map_err(|reason| StoreError::InvalidBlock {
                        id: id.clone(),
                        reason,
                    })?;
                    if existed {
                        patches.push(Patch::Update { block });
                    } else {
                        patches.push(Patch::Add { block });
                    }
                }
                None if existed => patches.push(Patch::Delete { block_id: id }),
                // added and deleted within the same transaction
                None => {}
            }
        }

        for patch in &patches {
            self.apply_patch(patch);
        }
        if !patches.is_empty() {
            self.version += 1;
        }

        let event = CommitEvent {
            origin,
            version: self.version,
            patches,
        };
        tracing::debug!(
            origin = %origin,
            version = self.version,
            patches = event.patches.len(),
            "committed transaction"
        );
        // No receivers is fine
        let _ = self.event_tx.send(event.clone());
        Ok(event)
    }

    /// Apply one patch without validation.
    pub(crate) fn apply_patch(&mut self, patch: &Patch) {
        match patch {
            Patch::Add { block } | Patch::Update { block } => {
                self.blocks.insert(block.id.clone(), block.clone());
            }
            Patch::Delete { block_id } => {
                self.blocks.remove(block_id);
            }
        }
    }
}
