//! The kernel: one handle over the store and its derived indexes.
//!
//! All writes go through [`Kernel::commit`], which applies the transaction
//! and then feeds the resulting event to both indexes: the backlink index
//! updates immediately, the full-text index only records dirty ids. Reads
//! (search, projection) take `&self`, so a caller holding `&mut Kernel` for
//! a commit can never overlap a projection on the same generation.

use tokio::sync::broadcast;

use arbor_index::{BacklinkIndex, FullTextIndex, IndexSearch, SearchMode, SearchOptions, TextSearch};
use arbor_store::{BlockStore, CommitEvent, ImportRecord, Origin, Transaction, import_batch};
use arbor_types::{Block, BlockContent, BlockId, Children};
use arbor_view::{DisplayItem, ExpandedState, Projector, ViewOptions};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};

pub struct Kernel {
    config: KernelConfig,
    store: BlockStore,
    fulltext: FullTextIndex,
    backlinks: BacklinkIndex,
}

impl Kernel {
    /// Create a kernel with an empty store holding only the root block.
    pub fn new(config: KernelConfig) -> Result<Self> {
        let mut kernel = Self {
            fulltext: FullTextIndex::new(config.search.min_token_len)?,
            store: BlockStore::new(),
            backlinks: BacklinkIndex::new(),
            config,
        };
        let root = Block::normal(kernel.config.root_id.clone(), "", BlockContent::text(""));
        let mut tx = kernel.begin(Origin::Ui);
        tx.add_block(root);
        kernel.commit(tx)?;
        tracing::info!(root = %kernel.config.root_id, "kernel ready");
        Ok(kernel)
    }

    /// Adopt an existing store, indexing it from scratch.
    ///
    /// The backlink index is built eagerly; full-text postings are built on
    /// the first search.
    pub fn with_store(config: KernelConfig, store: BlockStore) -> Result<Self> {
        let fulltext = FullTextIndex::new(config.search.min_token_len)?;
        fulltext.mark_all_dirty(&store);
        let backlinks = BacklinkIndex::from_store(&store);
        Ok(Self {
            config,
            store,
            fulltext,
            backlinks,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn root_id(&self) -> &BlockId {
        &self.config.root_id
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.store.get(id)
    }

    /// Receive every commit event from here on.
    pub fn subscribe(&self) -> broadcast::Receiver<CommitEvent> {
        self.store.subscribe()
    }

    pub fn begin(&self, origin: Origin) -> Transaction {
        self.store.begin(origin)
    }

    /// Apply a transaction and update both indexes.
    pub fn commit(&mut self, tx: Transaction) -> Result<CommitEvent> {
        let event = self.store.commit(tx)?;
        self.observe(&event);
        Ok(event)
    }

    fn observe(&mut self, event: &CommitEvent) {
        self.backlinks.observe(event);
        self.fulltext.observe(event);
    }

    /// Bulk-insert records, relinking a single orphan under the root.
    pub fn import(&mut self, records: Vec<ImportRecord>) -> Result<CommitEvent> {
        let event = import_batch(&mut self.store, records, &self.config.root_id)?;
        self.observe(&event);
        Ok(event)
    }

    /// Import a JSON array of records.
    pub fn import_json(&mut self, json: &str) -> Result<CommitEvent> {
        let records: Vec<ImportRecord> = serde_json::from_str(json)?;
        self.import(records)
    }

    /// Remove a block and its owned subtree, unlinking it from its parent.
    pub fn delete_subtree(&mut self, id: &BlockId) -> Result<CommitEvent> {
        if *id == self.config.root_id {
            return Err(KernelError::ProtectedRoot(id.clone()));
        }
        let block = self
            .store
            .get(id)
            .ok_or_else(|| arbor_store::StoreError::NotFound(id.clone()))?;

        let mut tx = self.store.begin(Origin::Ui);
        if let Some(parent) = self.store.get(&block.parent_id) {
            if let Some(children) = parent.children_ids() {
                let mut parent = parent.clone();
                parent.children = Children::Loaded(children.iter().filter(|c| *c != id).cloned().collect());
                tx.update_block(parent);
            }
        }
        let doomed: Vec<BlockId> = self.store.descendants(id).map(|(_, b)| b.id.clone()).collect();
        tracing::debug!(block = %id, count = doomed.len(), "deleting subtree");
        for doomed_id in doomed {
            tx.delete_block(doomed_id);
        }
        self.commit(tx)
    }

    /// Search with the configured options.
    pub fn search(&self, query: &str) -> Result<Vec<BlockId>> {
        self.search_with(query, &self.config.search.options())
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Result<Vec<BlockId>> {
        Ok(self.fulltext.search(&self.store, query, options)?)
    }

    /// Ids still waiting for the next lazy rebuild.
    pub fn dirty_len(&self) -> usize {
        self.fulltext.dirty_len()
    }

    /// Drop derived state and rebuild it from the store.
    pub fn reindex(&mut self) {
        self.fulltext.mark_all_dirty(&self.store);
        self.backlinks = BacklinkIndex::from_store(&self.store);
    }

    pub fn backlinks(&self, id: &BlockId) -> Vec<BlockId> {
        self.backlinks.backlinks_of(id)
    }

    /// View options built from the configured defaults.
    pub fn default_options(&self) -> ViewOptions {
        self.config.view.options()
    }

    /// Project `roots` against the current committed state.
    ///
    /// Potential links are found by searching the root's text with any-term
    /// matching. The search is unbounded; the panel applies
    /// `potential_links_limit` after dropping the root and its backlinks.
    pub fn project(
        &self,
        roots: &[BlockId],
        options: &ViewOptions,
        expanded: &ExpandedState,
    ) -> Result<Vec<DisplayItem<'_>>> {
        let projector = Projector::new(&self.store, &self.backlinks, self);
        Ok(projector.project(roots, options, expanded)?)
    }
}

impl TextSearch for Kernel {
    fn search(&self, query: &str) -> Vec<BlockId> {
        IndexSearch {
            index: &self.fulltext,
            store: &self.store,
            options: SearchOptions {
                mode: SearchMode::Any,
                limit: 0,
                prefix: false,
            },
        }
        .search(query)
    }
}
