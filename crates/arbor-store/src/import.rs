//! Bulk import of externally constructed block records.
//!
//! A batch goes in as one [`Origin::Import`] transaction. Records whose
//! declared parent isn't part of the batch are relinked under a well-known
//! root, and that root's child list gains them in the same transaction.
//! Only one such fallback-linked block is accepted per batch.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use arbor_types::{Block, BlockContent, BlockData, BlockId, BlockKind, Children, DocId, Metadata, Status};

use crate::{BlockStore, CommitEvent, Origin, Result, StoreError};

/// A block record as supplied by an importer.
///
/// `status` is the packed kind/fold integer; `children_ids: None` means the
/// child list isn't known yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: BlockId,
    pub status: u32,
    pub parent_id: BlockId,
    #[serde(default)]
    pub children_ids: Option<Vec<BlockId>>,
    #[serde(default)]
    pub src: Option<BlockId>,
    #[serde(default)]
    pub children_created: bool,
    #[serde(default)]
    pub content: Option<BlockContent>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub doc_id: Option<DocId>,
    #[serde(default)]
    pub boosting: f32,
}

impl ImportRecord {
    /// Convert to a store block, decoding the packed status.
    pub fn into_block(self) -> Result<Block> {
        let status = Status::decode(self.status)?;
        let metadata = match self.metadata {
            Some(value) => serde_json::from_value::<Metadata>(value).map_err(|_| StoreError::InvalidBlock {
                id: self.id.clone(),
                reason: "metadata is not an object",
            })?,
            None => Metadata::default(),
        };
        let data = match (status.kind, self.content) {
            (BlockKind::Normal, Some(content)) => {
                Some(BlockData::new(content, metadata).with_boosting(self.boosting))
            }
            _ => None,
        };

        let block = Block {
            id: self.id,
            parent_id: self.parent_id,
            children: Children::from(self.children_ids),
            kind: status.kind,
            fold: status.fold,
            deleted: false,
            doc_id: self.doc_id.unwrap_or_default(),
            src: self.src,
            children_created: self.children_created,
            data,
        };
        block
            .check_invariants()
            .map_err(|reason| StoreError::InvalidBlock { id: block.id.clone(), reason })?;
        Ok(block)
    }
}

/// Insert a batch of records in one transaction.
///
/// Fails with [`StoreError::MultipleFallbackRoots`] if more than one record
/// points outside the batch, and with [`StoreError::NotFound`] if a fallback
/// is needed but `root_id` isn't in the store or the batch. A root whose
/// child list isn't loaded can't take the fallback block. Nothing is written
/// on error.
pub fn import_batch(store: &mut BlockStore, records: Vec<ImportRecord>, root_id: &BlockId) -> Result<CommitEvent> {
    let batch_ids: HashSet<BlockId> = records.iter().map(|r| r.id.clone()).collect();
    let mut blocks = records
        .into_iter()
        .map(ImportRecord::into_block)
        .collect::<Result<Vec<_>>>()?;

    // The root itself never needs relinking.
    let fallback: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.id != *root_id && !batch_ids.contains(&b.parent_id))
        .map(|(ix, _)| ix)
        .collect();
    if fallback.len() > 1 {
        return Err(StoreError::MultipleFallbackRoots(
            fallback.iter().map(|&ix| blocks[ix].id.clone()).collect(),
        ));
    }

    let mut tx = store.begin(Origin::Import);
    if let Some(&ix) = fallback.first() {
        let block = &mut blocks[ix];
        tracing::debug!(block = %block.id, declared_parent = %block.parent_id, root = %root_id, "relinking import block under root");
        block.parent_id = root_id.clone();
        let child_id = block.id.clone();

        match blocks.iter_mut().find(|b| b.id == *root_id) {
            Some(root) => link_child(root, &child_id)?,
            None => {
                let mut root = store
                    .get(root_id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(root_id.clone()))?;
                link_child(&mut root, &child_id)?;
                tx.update_block(root);
            }
        }
    }

    let count = blocks.len();
    for block in blocks {
        if store.get_raw(&block.id).is_some() {
            tx.update_block(block);
        } else {
            tx.add_block(block);
        }
    }
    let event = store.commit(tx)?;
    tracing::info!(count, version = event.version, "imported block batch");
    Ok(event)
}

/// Append `child` to the root's loaded child list.
fn link_child(root: &mut Block, child: &BlockId) -> Result<()> {
    let Some(ids) = root.children_ids() else {
        return Err(StoreError::InvalidBlock {
            id: root.id.clone(),
            reason: "fallback root children are not loaded",
        });
    };
    if !ids.contains(child) {
        let mut ids = ids.to_vec();
        ids.push(child.clone());
        root.children = Children::Loaded(ids);
    }
    Ok(())
}
