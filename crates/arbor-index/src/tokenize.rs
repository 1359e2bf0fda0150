//! Query and document analysis.
//!
//! Both sides go through the same tantivy analyzer, so a query term is
//! dropped under exactly the rule that kept it out of the postings.

use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, Token, TokenStream};

/// Default minimum token length, in chars.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 1;

/// Tokens longer than this many bytes are discarded, as tantivy's default
/// analyzer does.
const MAX_TOKEN_BYTES: usize = 40;

/// Split on non-alphanumeric chars, drop oversized tokens, lowercase.
pub fn analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
        .filter(LowerCaser)
        .build()
}

/// Tokens of `text` at least `min_len` chars long, in order.
pub fn tokenize(analyzer: &mut TextAnalyzer, text: &str, min_len: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    analyzer.token_stream(text).process(&mut |token: &Token| {
        if token.text.chars().count() >= min_len {
            tokens.push(token.text.clone());
        }
    });
    tokens
}
