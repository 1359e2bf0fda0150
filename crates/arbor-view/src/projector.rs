//! Display projector.
//!
//! Flattens one or more rooted views of the block graph into ordered
//! [`DisplayItem`] rows: the content tree, an optional side-pane header, the
//! backlinks panel, and the potential-links panel.
//!
//! The projector is a pure read: it borrows the store and its collaborators
//! and rebuilds every row on each call. Traversal is iterative (explicit
//! stack) and bounded by [`MAX_TREE_DEPTH`].
//!
//! # Item ids
//!
//! | Row                        | Id                                      |
//! |----------------------------|-----------------------------------------|
//! | `root-block`               | `root-block:{root}`                     |
//! | `side-pane-header`         | `side-pane-header:{root}`               |
//! | `basic-block` (root)       | `block:{root}`                          |
//! | `basic-block`              | `block:{root}:{aliases/}{id}`           |
//! | `block-properties`         | `props:{item id of the block}`          |
//! | `missing-block`            | `missing:{item id of the parent}:{id}`  |
//! | `backlink-header`          | `backlinks:{root}`                      |
//! | `backlink-block`           | `backlink:{root}:{b}`                   |
//! | `backlink-descendant`      | `backlink:{root}:{b}:{aliases/}{id}`    |
//! | `potential-links-header`   | `potential-links:{root}`                |
//! | `potential-links-block`    | `potential:{root}:{p}`                  |
//! | `potential-links-descendant` | `potential:{root}:{p}:{aliases/}{id}` |
//!
//! `{aliases/}` is the chain of mirror/virtual ids the row was reached
//! through, so a source subtree shown under two mirrors yields distinct ids.

use std::collections::HashSet;

use arbor_index::{BacklinkLookup, TextSearch};
use arbor_store::{BlockStore, ChildSlot};
use arbor_types::{Block, BlockId, MAX_TREE_DEPTH};

use crate::error::Result;
use crate::item::{DisplayItem, ItemKind};
use crate::options::{ExpandedState, ViewOptions};

/// When a visited row shows its children.
#[derive(Clone, Copy)]
enum Gate<'e> {
    /// Content tree: each block's own `fold`, optionally overridden for the
    /// walk's start block.
    OwnFold { force_start: bool },
    /// Panels: the caller's expanded map, default collapsed.
    Expanded(&'e ExpandedState),
}

/// One subtree walk.
struct Walk<'e> {
    start_id: String,
    /// `None` suppresses the start row (already emitted as `root-block`).
    start_kind: Option<ItemKind>,
    desc_kind: ItemKind,
    level: usize,
    gate: Gate<'e>,
    /// Overrides `ref_block_id` on the start row.
    start_ref: Option<BlockId>,
    show_properties: bool,
    show_missing: bool,
}

enum Entry<'a> {
    Block {
        block: &'a Block,
        item_id: String,
        chain: String,
        depth: usize,
        /// Block ids (and resolved sources) on the path above this row.
        lineage: Vec<BlockId>,
    },
    Missing {
        item_id: String,
        id: BlockId,
        depth: usize,
    },
}

/// Rows collected so far, with the ids already used.
#[derive(Default)]
struct Output<'a> {
    items: Vec<DisplayItem<'a>>,
    seen: HashSet<String>,
}

impl<'a> Output<'a> {
    /// Append unless the id was already emitted.
    fn push(&mut self, item: DisplayItem<'a>) -> bool {
        if !self.seen.insert(item.item_id.clone()) {
            tracing::warn!(item_id = %item.item_id, "duplicate display item skipped");
            return false;
        }
        self.items.push(item);
        true
    }
}

/// Projects block trees into display rows.
pub struct Projector<'a> {
    store: &'a BlockStore,
    backlinks: &'a dyn BacklinkLookup,
    search: &'a dyn TextSearch,
}

impl<'a> Projector<'a> {
    pub fn new(store: &'a BlockStore, backlinks: &'a dyn BacklinkLookup, search: &'a dyn TextSearch) -> Self {
        Self {
            store,
            backlinks,
            search,
        }
    }

    /// Project `roots` in order.
    ///
    /// Option conflicts fail before anything is emitted. Everything else
    /// (missing roots or children, broken aliases, cycles) is contained to
    /// the row it affects.
    pub fn project(
        &self,
        roots: &[BlockId],
        options: &ViewOptions,
        expanded: &ExpandedState,
    ) -> Result<Vec<DisplayItem<'a>>> {
        options.validate(roots.len())?;

        let mut out = Output::default();
        let mut projected = HashSet::new();
        for root_id in roots {
            if !projected.insert(root_id) {
                tracing::warn!(root = %root_id, "root listed twice, skipping repeat");
                continue;
            }
            self.project_root(root_id, options, expanded, &mut out);
        }
        tracing::debug!(roots = roots.len(), items = out.items.len(), "projected view");
        Ok(out.items)
    }

    fn project_root(&self, root_id: &BlockId, options: &ViewOptions, expanded: &ExpandedState, out: &mut Output<'a>) {
        let level = options.root_level;
        let Some(root) = self.store.get(root_id) else {
            tracing::warn!(root = %root_id, "root block not found");
            let mut item = DisplayItem::new(format!("missing:{root_id}"), ItemKind::MissingBlock);
            item.level = Some(level);
            item.block_id = Some(root_id.clone());
            out.push(item);
            return;
        };

        if options.enlarge_root_block {
            out.push(DisplayItem::for_block(
                format!("root-block:{root_id}"),
                ItemKind::RootBlock,
                level,
                root,
            ));
        }
        if options.add_side_pane_header {
            let mut item = DisplayItem::new(format!("side-pane-header:{root_id}"), ItemKind::SidePaneHeader);
            item.block = Some(root);
            item.block_id = Some(root_id.clone());
            out.push(item);
        }

        self.walk(
            root,
            Walk {
                start_id: format!("block:{root_id}"),
                start_kind: (!options.enlarge_root_block).then_some(ItemKind::BasicBlock),
                desc_kind: ItemKind::BasicBlock,
                level,
                gate: Gate::OwnFold {
                    force_start: root.fold && !options.add_side_pane_header,
                },
                start_ref: None,
                show_properties: options.show_block_properties,
                show_missing: true,
            },
            out,
        );

        if !options.show_backlinks && !options.show_potential_links {
            return;
        }
        let backlinks = self.live_backlinks(root_id);

        if options.show_backlinks && !backlinks.is_empty() {
            let mut header =
                DisplayItem::new(format!("backlinks:{root_id}"), ItemKind::BacklinkHeader).with_links(backlinks.clone());
            header.block_id = Some(root_id.clone());
            out.push(header);
            for id in self.top_level_backlinks(&backlinks) {
                let Some(block) = self.store.get(&id) else { continue };
                self.walk(
                    block,
                    Walk {
                        start_id: format!("backlink:{root_id}:{id}"),
                        start_kind: Some(ItemKind::BacklinkBlock),
                        desc_kind: ItemKind::BacklinkDescendant,
                        level,
                        gate: Gate::Expanded(expanded),
                        start_ref: Some(root_id.clone()),
                        show_properties: false,
                        show_missing: false,
                    },
                    out,
                );
            }
        }

        if options.show_potential_links {
            self.potential_links(root, &backlinks, options, expanded, out);
        }
    }

    /// Backlinks of `root_id` that resolve to live blocks, deduplicated, in
    /// lookup order.
    fn live_backlinks(&self, root_id: &BlockId) -> Vec<BlockId> {
        let mut live = Vec::new();
        for id in self.backlinks.backlinks(root_id) {
            if live.contains(&id) {
                continue;
            }
            if self.store.get(&id).is_none() {
                tracing::warn!(root = %root_id, backlink = %id, "backlink does not resolve, skipping");
                continue;
            }
            live.push(id);
        }
        live
    }

    /// Drop every backlink with an ancestor that is also a backlink,
    /// repeating until the set stops shrinking.
    pub fn top_level_backlinks(&self, backlinks: &[BlockId]) -> Vec<BlockId> {
        let mut remaining = backlinks.to_vec();
        loop {
            let nested: HashSet<BlockId> = {
                let current: HashSet<&BlockId> = remaining.iter().collect();
                remaining
                    .iter()
                    .filter(|id| {
                        self.store.get_block_path(id).is_ok_and(|path| {
                            path.iter()
                                .take(path.len().saturating_sub(1))
                                .any(|ancestor| current.contains(&ancestor.id))
                        })
                    })
                    .cloned()
                    .collect()
            };
            if nested.is_empty() {
                return remaining;
            }
            remaining.retain(|id| !nested.contains(id));
        }
    }

    fn potential_links(
        &self,
        root: &'a Block,
        backlinks: &[BlockId],
        options: &ViewOptions,
        expanded: &ExpandedState,
        out: &mut Output<'a>,
    ) {
        let level = options.root_level;
        let subject = match self.store.resolve_source(root) {
            Ok(subject) => subject,
            Err(err) => {
                tracing::warn!(root = %root.id, error = %err, "cannot resolve root for potential links");
                return;
            }
        };
        if !subject.is_text() {
            return;
        }

        let limit = match options.potential_links_limit {
            0 => usize::MAX,
            n => n,
        };
        let mut found: Vec<&'a Block> = Vec::new();
        for id in self.search.search(subject.ctext()) {
            if found.len() == limit {
                break;
            }
            if id == root.id || id == subject.id || backlinks.contains(&id) || found.iter().any(|b| b.id == id) {
                continue;
            }
            match self.store.get(&id) {
                Some(block) if block.is_text() => found.push(block),
                _ => {}
            }
        }
        if found.is_empty() {
            return;
        }

        let mut header = DisplayItem::new(format!("potential-links:{}", root.id), ItemKind::PotentialLinksHeader)
            .with_links(found.iter().map(|b| b.id.clone()).collect());
        header.block_id = Some(root.id.clone());
        out.push(header);
        for block in found {
            self.walk(
                block,
                Walk {
                    start_id: format!("potential:{}:{}", root.id, block.id),
                    start_kind: Some(ItemKind::PotentialLinksBlock),
                    desc_kind: ItemKind::PotentialLinksDescendant,
                    level,
                    gate: Gate::Expanded(expanded),
                    start_ref: Some(root.id.clone()),
                    show_properties: false,
                    show_missing: false,
                },
                out,
            );
        }
    }

    /// Pre-order walk from `start`, emitting rows per `walk`.
    fn walk(&self, start: &'a Block, walk: Walk<'_>, out: &mut Output<'a>) {
        let mut stack = vec![Entry::Block {
            block: start,
            item_id: walk.start_id.clone(),
            chain: String::new(),
            depth: 0,
            lineage: Vec::new(),
        }];

        while let Some(entry) = stack.pop() {
            let (block, item_id, chain, depth, lineage) = match entry {
                Entry::Block {
                    block,
                    item_id,
                    chain,
                    depth,
                    lineage,
                } => (block, item_id, chain, depth, lineage),
                Entry::Missing { item_id, id, depth } => {
                    let mut item = DisplayItem::new(item_id, ItemKind::MissingBlock);
                    item.level = Some(walk.level + depth);
                    item.block_id = Some(id);
                    out.push(item);
                    continue;
                }
            };
            let is_start = depth == 0;
            let level = walk.level + depth;

            let source = if block.kind.is_alias() {
                match self.store.resolve_source(block) {
                    Ok(source) => Some(source),
                    Err(err) => {
                        tracing::warn!(block = %block.id, error = %err, "alias does not resolve");
                        None
                    }
                }
            } else {
                None
            };

            let kind = if is_start { walk.start_kind } else { Some(walk.desc_kind) };
            if let Some(kind) = kind {
                let ref_id = match (&walk.start_ref, is_start) {
                    (Some(start_ref), true) => Some(start_ref.clone()),
                    _ => source.map(|s| s.id.clone()),
                };
                let item = DisplayItem::for_block(item_id.clone(), kind, level, block).with_ref(ref_id);
                if !out.push(item) {
                    continue;
                }
            }
            if walk.show_properties && block.has_properties() {
                out.push(DisplayItem::for_block(
                    format!("props:{item_id}"),
                    ItemKind::BlockProperties,
                    level,
                    block,
                ));
            }

            let open = match walk.gate {
                Gate::OwnFold { force_start } => (is_start && force_start) || !block.fold,
                Gate::Expanded(state) => state.get(&item_id).copied().unwrap_or(false),
            };
            if !open {
                continue;
            }
            if depth >= MAX_TREE_DEPTH {
                tracing::warn!("projection hit MAX_TREE_DEPTH ({MAX_TREE_DEPTH}), pruning");
                continue;
            }
            // Children reached through the source; None for local children.
            let via = if block.children_from_source() {
                match source {
                    Some(source) => Some(source),
                    None => continue,
                }
            } else {
                None
            };
            if lineage.contains(&block.id) || via.is_some_and(|s| lineage.contains(&s.id)) {
                tracing::debug!(block = %block.id, "source already on path, not expanding");
                continue;
            }

            let children = match self.store.resolve_children(block) {
                Ok(Some(children)) => children,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(block = %block.id, error = %err, "cannot resolve children");
                    continue;
                }
            };

            let mut child_lineage = lineage;
            child_lineage.push(block.id.clone());
            let child_chain = match via {
                Some(source) => {
                    child_lineage.push(source.id.clone());
                    format!("{chain}{}/", block.id)
                }
                None => chain,
            };

            for slot in children.into_iter().rev() {
                match slot {
                    ChildSlot::Present(child) => stack.push(Entry::Block {
                        block: child,
                        item_id: format!("{}:{child_chain}{}", walk.start_id, child.id),
                        chain: child_chain.clone(),
                        depth: depth + 1,
                        lineage: child_lineage.clone(),
                    }),
                    ChildSlot::Missing(id) if walk.show_missing => stack.push(Entry::Missing {
                        item_id: format!("missing:{item_id}:{id}"),
                        id: id.clone(),
                        depth: depth + 1,
                    }),
                    ChildSlot::Missing(_) => {}
                }
            }
        }
    }
}
