//! Incremental full-text index over block text.
//!
//! Commits only mark ids dirty; the documents for dirty ids are replaced in
//! an in-RAM tantivy index on the next [`FullTextIndex::search`]. Write cost
//! is O(changed blocks) and no commit ever pays for re-indexing.
//!
//! ```text
//! Clean ──(commit event)──▶ Dirty ──(search)──▶ rebuild dirty ids ──▶ Clean
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::EnumString;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, ConstScoreQuery, DisjunctionMaxQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::*;
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{DocAddress, DocId, Index, IndexReader, IndexWriter, ReloadPolicy, Score, SegmentReader, Term, doc};

use arbor_store::{BlockStore, CommitEvent};
use arbor_types::{Block, BlockId, BlockKind};

use crate::error::Result;
use crate::tokenize::{analyzer, tokenize};

/// Score of a term matched in content text.
const CTEXT_WEIGHT: Score = 2.0;
/// Score of a term matched only in metadata text.
const MTEXT_WEIGHT: Score = 1.0;

/// Fast field added to every hit's score.
const BOOSTING_FIELD: &str = "boosting";

/// Indexing arena for the single writer thread.
const WRITER_ARENA_BYTES: usize = 20_000_000;

/// Default result cap.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// How query terms combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SearchMode {
    /// Every term must match.
    #[default]
    All,
    /// Any term may match.
    Any,
}

impl SearchMode {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    fn occur(self) -> Occur {
        match self {
            SearchMode::All => Occur::Must,
            SearchMode::Any => Occur::Should,
        }
    }
}

/// Per-query knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub mode: SearchMode,
    /// Maximum results; 0 means unbounded.
    pub limit: usize,
    /// Match terms as token prefixes.
    pub prefix: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::All,
            limit: DEFAULT_SEARCH_LIMIT,
            prefix: false,
        }
    }
}

#[derive(Clone, Copy)]
struct Fields {
    id: Field,
    ctext: Field,
    mtext: Field,
    boosting: Field,
}

impl Fields {
    fn schema() -> (Schema, Self) {
        let mut builder = Schema::builder();
        let fields = Self {
            id: builder.add_text_field("id", STRING | STORED),
            ctext: builder.add_text_field("ctext", TEXT),
            mtext: builder.add_text_field("mtext", TEXT),
            boosting: builder.add_f64_field(BOOSTING_FIELD, FAST),
        };
        (builder.build(), fields)
    }
}

/// Writer-side state, guarded together so a rebuild sees one dirty set.
struct IndexState {
    writer: IndexWriter,
    analyzer: TextAnalyzer,
    /// Ids that currently hold a live document.
    indexed: BTreeSet<BlockId>,
    dirty: BTreeSet<BlockId>,
}

/// Lazily rebuilt tantivy index over `ctext` and `mtext` of live Normal
/// blocks.
pub struct FullTextIndex {
    min_token_len: usize,
    fields: Fields,
    reader: IndexReader,
    state: Mutex<IndexState>,
}

impl fmt::Debug for FullTextIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FullTextIndex")
            .field("min_token_len", &self.min_token_len)
            .field("indexed", &state.indexed.len())
            .field("dirty", &state.dirty.len())
            .finish()
    }
}

impl FullTextIndex {
    pub fn new(min_token_len: usize) -> Result<Self> {
        let (schema, fields) = Fields::schema();
        let index = Index::create_in_ram(schema);
        let writer = index.writer_with_num_threads(1, WRITER_ARENA_BYTES)?;
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        Ok(Self {
            min_token_len: min_token_len.max(1),
            fields,
            reader,
            state: Mutex::new(IndexState {
                writer,
                analyzer: analyzer(),
                indexed: BTreeSet::new(),
                dirty: BTreeSet::new(),
            }),
        })
    }

    /// Mark every id touched by a commit as dirty. Does no indexing work.
    pub fn observe(&self, event: &CommitEvent) {
        let mut state = self.state.lock();
        state.dirty.extend(event.block_ids().cloned());
    }

    /// Mark a single id dirty.
    pub fn mark_dirty(&self, id: BlockId) {
        self.state.lock().dirty.insert(id);
    }

    /// Schedule every live block, and everything already indexed, for the
    /// next rebuild. Used on cold start.
    pub fn mark_all_dirty(&self, store: &BlockStore) {
        let mut state = self.state.lock();
        let indexed: Vec<BlockId> = state.indexed.iter().cloned().collect();
        state.dirty.extend(indexed);
        state.dirty.extend(store.iter().map(|b| b.id.clone()));
        tracing::debug!(dirty = state.dirty.len(), "full-text index marked for full rebuild");
    }

    pub fn dirty_len(&self) -> usize {
        self.state.lock().dirty.len()
    }

    pub fn is_clean(&self) -> bool {
        self.state.lock().dirty.is_empty()
    }

    /// Number of blocks currently holding a document.
    pub fn indexed_len(&self) -> usize {
        self.state.lock().indexed.len()
    }

    /// Search for blocks matching `query`.
    ///
    /// Rebuilds documents for dirty ids first. Each query term scores
    /// [`CTEXT_WEIGHT`] when it hits content text, else [`MTEXT_WEIGHT`] when
    /// it hits metadata text; the block's boosting is added on top. Ties
    /// break by id, so results are deterministic for a fixed index state.
    /// Queries with no term of at least the minimum token length match
    /// nothing.
    pub fn search(&self, store: &BlockStore, query: &str, options: &SearchOptions) -> Result<Vec<BlockId>> {
        let mut state = self.state.lock();
        self.rebuild_dirty(&mut state, store)?;

        let mut terms = tokenize(&mut state.analyzer, query, self.min_token_len);
        drop(state);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let occur = options.mode.occur();
        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|term| (occur, self.term_query(term, options.prefix)))
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let all = (searcher.num_docs() as usize).max(1);
        let collector = TopDocs::with_limit(all).tweak_score(move |segment: &SegmentReader| {
            let column = segment.fast_fields().f64(BOOSTING_FIELD).ok();
            move |doc: DocId, score: Score| {
                let boost = column.as_ref().and_then(|c| c.first(doc)).unwrap_or(0.0);
                score + boost as Score
            }
        });
        let hits: Vec<(Score, DocAddress)> = searcher.search(&query, &collector)?;

        let mut scored = Vec::with_capacity(hits.len());
        for (score, address) in hits {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) {
                scored.push((BlockId::from(id), score));
            }
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if options.limit > 0 {
            scored.truncate(options.limit);
        }
        Ok(scored.into_iter().map(|(id, _)| id).collect())
    }

    /// One term against both text fields: the better field wins.
    fn term_query(&self, token: &str, prefix: bool) -> Box<dyn Query> {
        let field_query = |field: Field, weight: Score| -> Box<dyn Query> {
            let term = Term::from_field_text(field, token);
            let inner: Box<dyn Query> = if prefix {
                Box::new(FuzzyTermQuery::new_prefix(term, 0, true))
            } else {
                Box::new(TermQuery::new(term, IndexRecordOption::Basic))
            };
            Box::new(ConstScoreQuery::new(inner, weight))
        };
        Box::new(DisjunctionMaxQuery::new(vec![
            field_query(self.fields.ctext, CTEXT_WEIGHT),
            field_query(self.fields.mtext, MTEXT_WEIGHT),
        ]))
    }

    fn rebuild_dirty(&self, state: &mut IndexState, store: &BlockStore) -> Result<()> {
        if state.dirty.is_empty() {
            return Ok(());
        }
        let dirty = std::mem::take(&mut state.dirty);
        let (mut indexed, mut dropped) = (0usize, 0usize);
        for id in &dirty {
            state.writer.delete_term(Term::from_field_text(self.fields.id, id.as_str()));
            let had = state.indexed.remove(id);
            match store.get(id) {
                Some(block) if block.kind == BlockKind::Normal && !block.is_loading() => {
                    let document = self.document(&mut state.analyzer, block);
                    state.writer.add_document(document)?;
                    state.indexed.insert(id.clone());
                    indexed += 1;
                }
                _ if had => dropped += 1,
                _ => {}
            }
        }
        state.writer.commit()?;
        self.reader.reload()?;
        tracing::debug!(dirty = dirty.len(), indexed, dropped, "rebuilt full-text documents");
        Ok(())
    }

    /// Text fields hold the pre-filtered tokens, so the minimum length
    /// applies to documents and queries alike.
    fn document(&self, analyzer: &mut TextAnalyzer, block: &Block) -> TantivyDocument {
        let ctext = tokenize(analyzer, block.ctext(), self.min_token_len).join(" ");
        let mtext = tokenize(analyzer, block.mtext(), self.min_token_len).join(" ");
        let boosting = block.data.as_ref().map_or(0.0, |d| f64::from(d.boosting));
        doc!(
            self.fields.id => block.id.as_str(),
            self.fields.ctext => ctext,
            self.fields.mtext => mtext,
            self.fields.boosting => boosting,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::Origin;
    use arbor_types::{BlockContent, Metadata};

    use crate::tokenize::DEFAULT_MIN_TOKEN_LEN;

    fn text(id: &str, body: &str) -> Block {
        Block::normal(id, "root", BlockContent::text(body))
    }

    fn fresh_index() -> FullTextIndex {
        FullTextIndex::new(DEFAULT_MIN_TOKEN_LEN).unwrap()
    }

    fn commit_all(store: &mut BlockStore, index: &FullTextIndex, blocks: Vec<Block>) {
        let mut tx = store.begin(Origin::Ui);
        for block in blocks {
            tx.add_block(block);
        }
        let event = store.commit(tx).unwrap();
        index.observe(&event);
    }

    fn find(index: &FullTextIndex, store: &BlockStore, query: &str, options: &SearchOptions) -> Vec<String> {
        index
            .search(store, query, options)
            .unwrap()
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_commit_only_marks_dirty() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("a", "hello world"), text("b", "goodbye")]);
        assert_eq!(index.dirty_len(), 2);
        assert_eq!(index.indexed_len(), 0, "no eager indexing");

        assert_eq!(find(&index, &store, "hello", &SearchOptions::default()), vec!["a"]);
        assert!(index.is_clean());
        assert_eq!(index.indexed_len(), 2);
    }

    #[test]
    fn test_update_replaces_old_tokens() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("a", "apple")]);
        assert_eq!(find(&index, &store, "apple", &SearchOptions::default()), vec!["a"]);

        let mut tx = store.begin(Origin::Ui);
        tx.update_block(text("a", "banana"));
        index.observe(&store.commit(tx).unwrap());

        assert!(find(&index, &store, "apple", &SearchOptions::default()).is_empty());
        assert_eq!(find(&index, &store, "banana", &SearchOptions::default()), vec!["a"]);
        assert_eq!(index.indexed_len(), 1);
    }

    #[test]
    fn test_deleted_blocks_never_returned() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("a", "shared"), text("b", "shared")]);
        assert_eq!(find(&index, &store, "shared", &SearchOptions::default()), vec!["a", "b"]);

        let mut tombstone = text("a", "shared");
        tombstone.deleted = true;
        let mut tx = store.begin(Origin::Ui);
        tx.update_block(tombstone);
        tx.delete_block("b");
        index.observe(&store.commit(tx).unwrap());

        assert!(find(&index, &store, "shared", &SearchOptions::default()).is_empty());
        assert_eq!(index.indexed_len(), 0);
        assert!(index.is_clean());
    }

    #[test]
    fn test_aliases_and_loading_blocks_not_indexed() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(
            &mut store,
            &index,
            vec![text("a", "source"), Block::mirror("m", "root", "a"), Block::loading("l", "root")],
        );
        assert_eq!(find(&index, &store, "source", &SearchOptions::default()), vec!["a"]);
        assert_eq!(index.indexed_len(), 1);
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("a", "anything")]);
        assert!(find(&index, &store, "", &SearchOptions::default()).is_empty());
        assert!(find(&index, &store, "   ", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn test_short_query_terms_dropped_like_document_terms() {
        let mut store = BlockStore::new();
        let index = FullTextIndex::new(3).unwrap();
        commit_all(&mut store, &index, vec![text("a", "a cat sat")]);

        assert_eq!(find(&index, &store, "a cat", &SearchOptions::default()), vec!["a"]);
        assert_eq!(find(&index, &store, "cat", &SearchOptions::default()), vec!["a"]);
        assert!(find(&index, &store, "a", &SearchOptions::default()).is_empty());
    }

    #[test]
    fn test_all_vs_any_mode() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("a", "red apple"), text("b", "green apple"), text("c", "red car")]);

        assert_eq!(find(&index, &store, "red apple", &SearchOptions::default()), vec!["a"]);

        let any = SearchOptions { mode: SearchMode::Any, ..Default::default() };
        assert_eq!(find(&index, &store, "red apple", &any), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ctext_outranks_mtext_and_boosting() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        let meta_only = Block::normal("a", "root", BlockContent::text("nothing"))
            .with_metadata(Metadata::default().with_property("topic", "rust"));
        let mut boosted = text("c", "rust");
        if let Some(data) = boosted.data.as_mut() {
            data.boosting = 0.5;
        }
        commit_all(&mut store, &index, vec![meta_only, text("b", "rust"), boosted]);

        assert_eq!(find(&index, &store, "rust", &SearchOptions::default()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_prefix_and_limit() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("a", "testing"), text("b", "tested"), text("c", "toast")]);

        let prefix = SearchOptions { prefix: true, ..Default::default() };
        assert_eq!(find(&index, &store, "test", &prefix), vec!["a", "b"]);
        assert!(find(&index, &store, "test", &SearchOptions::default()).is_empty());

        let limited = SearchOptions { prefix: true, limit: 1, ..Default::default() };
        assert_eq!(find(&index, &store, "t", &limited).len(), 1);
    }

    #[test]
    fn test_deterministic_ordering() {
        let mut store = BlockStore::new();
        let index = fresh_index();
        commit_all(&mut store, &index, vec![text("z", "same"), text("m", "same"), text("a", "same")]);
        let first = find(&index, &store, "same", &SearchOptions::default());
        let second = find(&index, &store, "same", &SearchOptions::default());
        assert_eq!(first, second);
        assert_eq!(first, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_mark_all_dirty_cold_start() {
        let mut store = BlockStore::new();
        let mut tx = store.begin(Origin::Import);
        tx.add_block(text("a", "cold"));
        store.commit(tx).unwrap();

        let index = fresh_index();
        assert!(find(&index, &store, "cold", &SearchOptions::default()).is_empty());
        index.mark_all_dirty(&store);
        assert_eq!(find(&index, &store, "cold", &SearchOptions::default()), vec!["a"]);
    }

    #[test]
    fn test_search_mode_parse() {
        assert_eq!(SearchMode::from_str("ANY"), Some(SearchMode::Any));
        assert_eq!(SearchMode::from_str("nope"), None);
        let opts: SearchOptions = serde_json::from_str(r#"{"mode":"any"}"#).unwrap();
        assert_eq!(opts.mode, SearchMode::Any);
        assert_eq!(opts.limit, DEFAULT_SEARCH_LIMIT);
    }
}
