//! Block content variants and their plain-text projections.
//!
//! Content is a closed sum type. The rich-text document inside `Text` and
//! `Query` titles is opaque to the engine: it is kept as JSON and only walked
//! to produce plain text (`ctext`) and outgoing block references (`olinks`).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::block::MAX_TREE_DEPTH;
use crate::ids::BlockId;

/// Node types that start a new line in the plain-text projection.
const BLOCK_NODES: &[&str] = &["paragraph", "heading", "blockquote", "listItem", "codeBlock"];

/// Opaque rich-text document (a ProseMirror-style JSON tree).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Value);

impl RichText {
    /// A one-paragraph document holding `text`.
    pub fn plain(text: &str) -> Self {
        let paragraph = if text.is_empty() {
            json!({ "type": "paragraph" })
        } else {
            json!({ "type": "paragraph", "content": [{ "type": "text", "text": text }] })
        };
        Self(json!({ "type": "doc", "content": [paragraph] }))
    }

    /// Plain-text rendering: text leaves in order, block nodes on new lines.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.0, &mut out);
        out
    }

    /// Ids referenced from this document, in first-seen order.
    ///
    /// Picks up `blockRef` nodes (`attrs.blockId`) and inline `((id))` /
    /// `((id|alias))` references inside text leaves.
    pub fn block_refs(&self) -> Vec<BlockId> {
        let mut refs = Vec::new();
        collect_refs(&self.0, &mut refs);
        refs
    }
}

fn is_block_node(node: &Value) -> bool {
    node.get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| BLOCK_NODES.contains(&t))
}

enum TextFrame<'v> {
    Node(&'v Value, usize),
    Newline,
}

/// Children of an object or array node, if any.
fn child_nodes(node: &Value) -> &[Value] {
    match node {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("content") {
            Some(Value::Array(children)) => children,
            _ => &[],
        },
        _ => &[],
    }
}

fn depth_exceeded(depth: usize) -> bool {
    if depth >= MAX_TREE_DEPTH {
        tracing::warn!("rich text nested past MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), pruning");
        return true;
    }
    false
}

fn collect_text(root: &Value, out: &mut String) {
    let mut stack = vec![TextFrame::Node(root, 0)];
    while let Some(frame) = stack.pop() {
        let (node, depth) = match frame {
            TextFrame::Newline => {
                out.push('\n');
                continue;
            }
            TextFrame::Node(node, depth) => (node, depth),
        };
        match node {
            Value::String(s) => out.push_str(s),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push_str(text);
                }
            }
            _ => {}
        }

        let children = child_nodes(node);
        if children.is_empty() || depth_exceeded(depth) {
            continue;
        }
        // Within an object's content, block nodes after the first start a new line.
        let first_block = match node {
            Value::Object(_) => children.iter().position(is_block_node),
            _ => None,
        };
        for (ix, child) in children.iter().enumerate().rev() {
            stack.push(TextFrame::Node(child, depth + 1));
            if first_block.is_some_and(|first| ix != first) && is_block_node(child) {
                stack.push(TextFrame::Newline);
            }
        }
    }
}

fn push_unique(refs: &mut Vec<BlockId>, id: BlockId) {
    if !refs.contains(&id) {
        refs.push(id);
    }
}

fn collect_refs(root: &Value, refs: &mut Vec<BlockId>) {
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        match node {
            Value::String(s) => {
                for id in extract_inline_refs(s) {
                    push_unique(refs, id);
                }
            }
            Value::Object(map) => {
                if map.get("type").and_then(Value::as_str) == Some("blockRef") {
                    if let Some(id) = map
                        .get("attrs")
                        .and_then(|a| a.get("blockId"))
                        .and_then(Value::as_str)
                        .filter(|id| !id.is_empty())
                    {
                        push_unique(refs, BlockId::from(id));
                    }
                }
                if let Some(Value::String(text)) = map.get("text") {
                    for id in extract_inline_refs(text) {
                        push_unique(refs, id);
                    }
                }
            }
            _ => {}
        }

        let children = child_nodes(node);
        if children.is_empty() || depth_exceeded(depth) {
            continue;
        }
        stack.extend(children.iter().rev().map(|child| (child, depth + 1)));
    }
}

/// Extract `((id))` and `((id|alias))` references from a text run.
pub fn extract_inline_refs(text: &str) -> Vec<BlockId> {
    let mut refs = Vec::new();
    let mut cursor = 0;
    while let Some(start) = text[cursor..].find("((") {
        let start_ix = cursor + start + 2;
        let Some(end_rel) = text[start_ix..].find("))") else {
            break;
        };
        let end_ix = start_ix + end_rel;
        let mut value = text[start_ix..end_ix].trim();
        if let Some((id, _alias)) = value.split_once('|') {
            value = id.trim();
        }
        if !value.is_empty() {
            refs.push(BlockId::from(value));
        }
        cursor = end_ix + 2;
    }
    refs
}

/// Horizontal placement of an image block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAlign {
    #[default]
    Left,
    Center,
}

/// The content of a Normal block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockContent {
    Text {
        doc: RichText,
    },
    Image {
        path: String,
        #[serde(default)]
        align: ImageAlign,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default)]
        filters: Vec<String>,
    },
    Code {
        code: String,
        lang: String,
    },
    MathDisplay {
        src: String,
    },
    Query {
        title: RichText,
        query: String,
        #[serde(default = "default_true")]
        show_results: bool,
        #[serde(default = "default_true")]
        show_query: bool,
    },
}

fn default_true() -> bool {
    true
}

impl BlockContent {
    /// Plain text content.
    pub fn text(text: &str) -> Self {
        BlockContent::Text {
            doc: RichText::plain(text),
        }
    }

    pub fn code(code: impl Into<String>, lang: impl Into<String>) -> Self {
        BlockContent::Code {
            code: code.into(),
            lang: lang.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, BlockContent::Text { .. })
    }

    /// Discriminant tag as it appears on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            BlockContent::Text { .. } => "text",
            BlockContent::Image { .. } => "image",
            BlockContent::Code { .. } => "code",
            BlockContent::MathDisplay { .. } => "mathDisplay",
            BlockContent::Query { .. } => "query",
        }
    }

    /// Derived plain text used for display and indexing (`ctext`).
    pub fn plain_text(&self) -> String {
        match self {
            BlockContent::Text { doc } => doc.plain_text(),
            BlockContent::Image { caption, .. } => caption.clone().unwrap_or_default(),
            BlockContent::Code { code, .. } => code.clone(),
            BlockContent::MathDisplay { src } => src.clone(),
            BlockContent::Query { title, .. } => title.plain_text(),
        }
    }

    /// Outgoing block references (`olinks`).
    pub fn block_refs(&self) -> Vec<BlockId> {
        match self {
            BlockContent::Text { doc } => doc.block_refs(),
            BlockContent::Query { title, .. } => title.block_refs(),
            BlockContent::Image { .. } | BlockContent::Code { .. } | BlockContent::MathDisplay { .. } => {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_doc_roundtrips_text() {
        let doc = RichText::plain("hello world");
        assert_eq!(doc.plain_text(), "hello world");
        assert_eq!(RichText::plain("").plain_text(), "");
    }

    #[test]
    fn test_paragraphs_join_with_newlines() {
        let doc = RichText(json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "one" }] },
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "two " },
                    { "type": "text", "text": "parts" }
                ] }
            ]
        }));
        assert_eq!(doc.plain_text(), "one\ntwo parts");
    }

    #[test]
    fn test_block_refs_from_nodes_and_inline() {
        let doc = RichText(json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [
                { "type": "text", "text": "see ((abc)) and ((def|Alias)) " },
                { "type": "blockRef", "attrs": { "blockId": "ghi" } },
                { "type": "text", "text": "again ((abc))" }
            ] }]
        }));
        let refs: Vec<_> = doc.block_refs().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["abc", "def", "ghi"]);
    }

    #[test]
    fn test_nesting_past_depth_limit_is_pruned() {
        let mut node = json!({ "type": "text", "text": "deep ((bottom))" });
        for _ in 0..MAX_TREE_DEPTH + 8 {
            node = json!({ "type": "paragraph", "content": [node] });
        }
        let doc = RichText(json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "top ((near))" }] },
                node
            ]
        }));
        assert_eq!(doc.plain_text(), "top ((near))\n");
        assert_eq!(doc.block_refs(), vec![BlockId::from("near")]);
    }

    #[test]
    fn test_inline_refs_unterminated() {
        assert!(extract_inline_refs("broken ((abc").is_empty());
        assert!(extract_inline_refs("(( ))").is_empty());
    }

    #[test]
    fn test_content_plain_text_per_variant() {
        assert_eq!(BlockContent::text("hi").plain_text(), "hi");
        assert_eq!(BlockContent::code("fn main() {}", "rust").plain_text(), "fn main() {}");
        let math = BlockContent::MathDisplay { src: "e^{i\\pi}".into() };
        assert_eq!(math.plain_text(), "e^{i\\pi}");
        let image = BlockContent::Image {
            path: "a.png".into(),
            align: ImageAlign::Center,
            caption: Some("a cat".into()),
            width: None,
            filters: vec![],
        };
        assert_eq!(image.plain_text(), "a cat");
        let query = BlockContent::Query {
            title: RichText::plain("open tasks"),
            query: "todo".into(),
            show_results: true,
            show_query: false,
        };
        assert_eq!(query.plain_text(), "open tasks");
    }

    #[test]
    fn test_content_tagged_serde() {
        let json = serde_json::to_value(BlockContent::code("x", "py")).unwrap();
        assert_eq!(json["type"], "code");
        let parsed: BlockContent =
            serde_json::from_value(json!({ "type": "mathDisplay", "src": "x^2" })).unwrap();
        assert_eq!(parsed.tag(), "mathDisplay");
        let image: BlockContent = serde_json::from_value(json!({ "type": "image", "path": "p.png" })).unwrap();
        assert!(matches!(image, BlockContent::Image { align: ImageAlign::Left, .. }));
    }

    #[test]
    fn test_is_text() {
        assert!(BlockContent::text("x").is_text());
        assert!(!BlockContent::code("x", "c").is_text());
    }
}
