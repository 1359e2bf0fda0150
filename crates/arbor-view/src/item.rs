//! Display items, the projector's output rows.

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

use arbor_types::{Block, BlockId};

/// What a display row represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ItemKind {
    BasicBlock,
    RootBlock,
    BacklinkBlock,
    BacklinkHeader,
    BacklinkDescendant,
    PotentialLinksHeader,
    PotentialLinksBlock,
    PotentialLinksDescendant,
    MissingBlock,
    SidePaneHeader,
    BlockProperties,
}

impl ItemKind {
    pub fn is_header(&self) -> bool {
        matches!(
            self,
            ItemKind::BacklinkHeader | ItemKind::PotentialLinksHeader | ItemKind::SidePaneHeader
        )
    }
}

/// One flattened, render-ready row.
///
/// `item_id` is unique within a projection and a pure function of the
/// logical row, so UI state keyed by it survives re-projection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem<'a> {
    pub item_id: String,
    pub kind: ItemKind,
    /// Indentation depth; `None` for headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<&'a Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
    /// Alias rows: the resolved source. Backlink and potential-link rows:
    /// the root they relate to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_block_id: Option<BlockId>,
    /// Header rows: every id the panel covers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<BlockId>,
}

impl<'a> DisplayItem<'a> {
    pub(crate) fn new(item_id: String, kind: ItemKind) -> Self {
        Self {
            item_id,
            kind,
            level: None,
            block: None,
            block_id: None,
            ref_block_id: None,
            links: Vec::new(),
        }
    }

    pub(crate) fn for_block(item_id: String, kind: ItemKind, level: usize, block: &'a Block) -> Self {
        Self {
            level: Some(level),
            block: Some(block),
            block_id: Some(block.id.clone()),
            ..Self::new(item_id, kind)
        }
    }

    pub(crate) fn with_ref(mut self, ref_block_id: Option<BlockId>) -> Self {
        self.ref_block_id = ref_block_id;
        self
    }

    pub(crate) fn with_links(mut self, links: Vec<BlockId>) -> Self {
        self.links = links;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::BlockContent;

    #[test]
    fn test_kind_strings() {
        assert_eq!(ItemKind::BasicBlock.to_string(), "basic-block");
        assert_eq!(ItemKind::PotentialLinksDescendant.as_ref(), "potential-links-descendant");
        assert_eq!("side-pane-header".parse::<ItemKind>().unwrap(), ItemKind::SidePaneHeader);
        assert!(ItemKind::BacklinkHeader.is_header());
        assert!(!ItemKind::MissingBlock.is_header());
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let block = Block::normal("a", "root", BlockContent::text("x"));
        let item = DisplayItem::for_block("block:a".into(), ItemKind::BasicBlock, 0, &block);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["itemId"], "block:a");
        assert_eq!(json["kind"], "basic-block");
        assert_eq!(json["blockId"], "a");
        assert!(json.get("refBlockId").is_none());
    }
}
