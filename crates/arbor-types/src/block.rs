//! Block records.
//!
//! A block is a node in the outline tree. Ownership edges (`parent_id` /
//! `children`) always form a tree; mirror and virtual blocks add a second,
//! id-only edge (`src`) that may point anywhere, including into a cycle.
//! Nothing in this crate follows `src`; resolution lives in the store,
//! where it can be bounded.
//!
//! ## Loading vs loaded
//!
//! Edges and status are always known. A Normal block's content may not be
//! materialized yet (`data == None`): that block is *loading*. Mirror and
//! Virtual blocks never carry content of their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::BlockContent;
use crate::ids::{BlockId, DocId};
use crate::status::{BlockKind, Status};

/// Maximum expected tree depth. Traversal code uses this as a circuit breaker.
///
/// Real outlines rarely go past a few dozen levels; exceeding 512 almost
/// certainly means corrupted parent edges or an alias loop.
pub const MAX_TREE_DEPTH: usize = 512;

/// A block's child list, or the marker that it hasn't been loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "ids")]
pub enum Children {
    /// Not yet loaded. Distinct from an empty list.
    Unloaded,
    Loaded(Vec<BlockId>),
}

impl Children {
    pub fn empty() -> Self {
        Children::Loaded(Vec::new())
    }

    pub fn ids(&self) -> Option<&[BlockId]> {
        match self {
            Children::Unloaded => None,
            Children::Loaded(ids) => Some(ids),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Children::Loaded(_))
    }
}

impl Default for Children {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Option<Vec<BlockId>>> for Children {
    fn from(ids: Option<Vec<BlockId>>) -> Self {
        match ids {
            Some(ids) => Children::Loaded(ids),
            None => Children::Unloaded,
        }
    }
}

/// Open key-value metadata attached to a block.
///
/// `properties` are user-visible block properties (rendered as their own
/// row when requested); everything else is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metadata {
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    /// Derived text (`mtext`): property keys and every string/number leaf,
    /// space separated, in key order.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        for (key, value) in &self.properties {
            parts.push(key.clone());
            push_leaves(value, &mut parts);
        }
        for value in self.extra.values() {
            push_leaves(value, &mut parts);
        }
        parts.retain(|p| !p.is_empty());
        parts.join(" ")
    }
}

fn push_leaves(value: &Value, parts: &mut Vec<String>) {
    match value {
        Value::String(s) => parts.push(s.clone()),
        Value::Number(n) => parts.push(n.to_string()),
        Value::Array(items) => items.iter().for_each(|v| push_leaves(v, parts)),
        Value::Object(map) => map.values().for_each(|v| push_leaves(v, parts)),
        Value::Bool(_) | Value::Null => {}
    }
}

/// Materialized content of a loaded Normal block, with derived fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub content: BlockContent,
    #[serde(default)]
    pub metadata: Metadata,
    /// Plain-text projection of `content`.
    pub ctext: String,
    /// Plain-text projection of `metadata`.
    pub mtext: String,
    /// Blocks referenced by `content`.
    pub olinks: Vec<BlockId>,
    /// Search relevance weight.
    #[serde(default)]
    pub boosting: f32,
}

impl BlockData {
    /// Build from content and metadata, deriving `ctext`, `mtext`, `olinks`.
    pub fn new(content: BlockContent, metadata: Metadata) -> Self {
        let ctext = content.plain_text();
        let mtext = metadata.text();
        let olinks = content.block_refs();
        Self {
            content,
            metadata,
            ctext,
            mtext,
            olinks,
            boosting: 0.0,
        }
    }

    pub fn with_boosting(mut self, boosting: f32) -> Self {
        self.boosting = boosting;
        self
    }
}

/// A block record as owned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// Owning parent, or the root sentinel for top-level blocks.
    pub parent_id: BlockId,
    pub children: Children,
    pub kind: BlockKind,
    pub fold: bool,
    #[serde(default)]
    pub deleted: bool,
    pub doc_id: DocId,
    /// Mirror/Virtual only: the block this one aliases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<BlockId>,
    /// Virtual only: local children have been materialized and take
    /// precedence over the source's.
    #[serde(default)]
    pub children_created: bool,
    /// Normal only: `None` while loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BlockData>,
}

impl Block {
    fn base(id: BlockId, parent_id: BlockId, kind: BlockKind) -> Self {
        Self {
            id,
            parent_id,
            children: Children::empty(),
            kind,
            fold: false,
            deleted: false,
            doc_id: DocId::main(),
            src: None,
            children_created: false,
            data: None,
        }
    }

    /// A loaded Normal block.
    pub fn normal(id: impl Into<BlockId>, parent_id: impl Into<BlockId>, content: BlockContent) -> Self {
        let mut block = Self::base(id.into(), parent_id.into(), BlockKind::Normal);
        block.data = Some(BlockData::new(content, Metadata::default()));
        block
    }

    /// A Normal block whose content hasn't been materialized.
    pub fn loading(id: impl Into<BlockId>, parent_id: impl Into<BlockId>) -> Self {
        Self::base(id.into(), parent_id.into(), BlockKind::Normal)
    }

    /// A Mirror of `src`.
    pub fn mirror(id: impl Into<BlockId>, parent_id: impl Into<BlockId>, src: impl Into<BlockId>) -> Self {
        let mut block = Self::base(id.into(), parent_id.into(), BlockKind::Mirror);
        block.src = Some(src.into());
        block
    }

    /// A Virtual stand-in for `src`.
    pub fn virtual_of(id: impl Into<BlockId>, parent_id: impl Into<BlockId>, src: impl Into<BlockId>) -> Self {
        let mut block = Self::base(id.into(), parent_id.into(), BlockKind::Virtual);
        block.src = Some(src.into());
        block
    }

    pub fn with_children<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BlockId>,
    {
        self.children = Children::Loaded(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_unloaded_children(mut self) -> Self {
        self.children = Children::Unloaded;
        self
    }

    pub fn with_fold(mut self, fold: bool) -> Self {
        self.fold = fold;
        self
    }

    pub fn with_doc(mut self, doc_id: DocId) -> Self {
        self.doc_id = doc_id;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        if let Some(data) = self.data.take() {
            self.data = Some(BlockData::new(data.content, metadata).with_boosting(data.boosting));
        }
        self
    }

    pub fn with_children_created(mut self, created: bool) -> Self {
        self.children_created = created;
        self
    }

    /// Replace content, re-deriving text and links.
    pub fn set_content(&mut self, content: BlockContent) {
        let (metadata, boosting) = match self.data.take() {
            Some(data) => (data.metadata, data.boosting),
            None => (Metadata::default(), 0.0),
        };
        self.data = Some(BlockData::new(content, metadata).with_boosting(boosting));
    }

    pub fn status(&self) -> Status {
        Status::new(self.kind, self.fold)
    }

    pub fn is_loading(&self) -> bool {
        self.kind == BlockKind::Normal && self.data.is_none()
    }

    pub fn content(&self) -> Option<&BlockContent> {
        self.data.as_ref().map(|d| &d.content)
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.data.as_ref().map(|d| &d.metadata)
    }

    /// Plain text, empty while loading or for aliases.
    pub fn ctext(&self) -> &str {
        self.data.as_ref().map(|d| d.ctext.as_str()).unwrap_or("")
    }

    pub fn mtext(&self) -> &str {
        self.data.as_ref().map(|d| d.mtext.as_str()).unwrap_or("")
    }

    pub fn olinks(&self) -> &[BlockId] {
        self.data.as_ref().map(|d| d.olinks.as_slice()).unwrap_or(&[])
    }

    pub fn is_text(&self) -> bool {
        self.content().is_some_and(BlockContent::is_text)
    }

    /// Whether displayed children come from the resolved source instead of
    /// this block's own list.
    pub fn children_from_source(&self) -> bool {
        match self.kind {
            BlockKind::Normal => false,
            BlockKind::Mirror => true,
            BlockKind::Virtual => !self.children_created,
        }
    }

    pub fn has_properties(&self) -> bool {
        self.metadata().is_some_and(Metadata::has_properties)
    }

    pub fn children_ids(&self) -> Option<&[BlockId]> {
        self.children.ids()
    }

    /// Check the kind-specific field rules. Returns a reason on violation.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        match self.kind {
            BlockKind::Normal => {
                if self.src.is_some() {
                    return Err("normal block carries a src");
                }
                if self.children_created {
                    return Err("normal block marked children_created");
                }
            }
            BlockKind::Mirror | BlockKind::Virtual => {
                if self.src.is_none() {
                    return Err("alias block without src");
                }
                if self.data.is_some() {
                    return Err("alias block carries content");
                }
                if self.kind == BlockKind::Mirror && self.children_created {
                    return Err("mirror block marked children_created");
                }
            }
        }
        if self.parent_id == self.id {
            return Err("block is its own parent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normal_block_derives_text() {
        let block = Block::normal("a", "root", BlockContent::text("hello ((b))"));
        assert_eq!(block.ctext(), "hello ((b))");
        assert_eq!(block.olinks(), &[BlockId::from("b")]);
        assert!(block.is_text());
        assert!(!block.is_loading());
        assert!(block.check_invariants().is_ok());
    }

    #[test]
    fn test_loading_block() {
        let block = Block::loading("a", "root");
        assert!(block.is_loading());
        assert_eq!(block.ctext(), "");
        assert!(block.content().is_none());
    }

    #[test]
    fn test_alias_invariants() {
        let mirror = Block::mirror("m", "root", "a");
        assert!(mirror.check_invariants().is_ok());

        let mut broken = mirror.clone();
        broken.src = None;
        assert!(broken.check_invariants().is_err());

        let mut with_content = mirror;
        with_content.data = Some(BlockData::new(BlockContent::text("x"), Metadata::default()));
        assert!(with_content.check_invariants().is_err());

        let mut normal_with_src = Block::normal("n", "root", BlockContent::text("x"));
        normal_with_src.src = Some(BlockId::from("a"));
        assert!(normal_with_src.check_invariants().is_err());

        let virt = Block::virtual_of("v", "root", "a").with_children_created(true);
        assert!(virt.check_invariants().is_ok());
    }

    #[test]
    fn test_children_from_source() {
        assert!(!Block::normal("n", "root", BlockContent::text("x")).children_from_source());
        assert!(Block::mirror("m", "root", "a").children_from_source());
        let virt = Block::virtual_of("v", "root", "a");
        assert!(virt.children_from_source());
        assert!(!virt.with_children_created(true).children_from_source());
    }

    #[test]
    fn test_children_unloaded_is_not_empty() {
        let block = Block::loading("a", "root").with_unloaded_children();
        assert_eq!(block.children_ids(), None);
        let block = block.with_children(["x", "y"]);
        assert_eq!(block.children_ids().map(<[_]>::len), Some(2));
        assert_ne!(Children::Unloaded, Children::empty());
    }

    #[test]
    fn test_metadata_text_and_properties() {
        let meta = Metadata::default()
            .with_property("status", "done")
            .with_property("rank", 3);
        assert!(meta.has_properties());
        assert_eq!(meta.text(), "rank 3 status done");

        let block = Block::normal("a", "root", BlockContent::text("x")).with_metadata(meta);
        assert!(block.has_properties());
        assert_eq!(block.mtext(), "rank 3 status done");
    }

    #[test]
    fn test_metadata_flatten_keeps_extra_keys() {
        let meta: Metadata = serde_json::from_value(json!({
            "properties": { "k": "v" },
            "color": "red"
        }))
        .unwrap();
        assert_eq!(meta.extra.get("color"), Some(&json!("red")));
        assert_eq!(meta.text(), "k v red");
    }

    #[test]
    fn test_set_content_keeps_metadata() {
        let mut block = Block::normal("a", "root", BlockContent::text("old"))
            .with_metadata(Metadata::default().with_property("p", "q"));
        block.set_content(BlockContent::text("new"));
        assert_eq!(block.ctext(), "new");
        assert!(block.has_properties());
    }

    #[test]
    fn test_status_from_fields() {
        let block = Block::mirror("m", "root", "a").with_fold(true);
        assert_eq!(block.status().pack().unwrap(), 0b001);
    }
}
