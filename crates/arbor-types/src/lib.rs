//! Block identity, status, and content types for arbor.
//!
//! This crate is the leaf of the workspace: typed ids, the packed status
//! codec, content variants, and the block record itself. It has **no
//! internal arbor dependencies** and performs no graph traversal.
//!
//! # Key Types
//!
//! |------------------|-----------------------------------------------|
//! | Type             | Purpose                                       |
//! |------------------|-----------------------------------------------|
//! | [`BlockId`]      | Opaque, stable block address                  |
//! | [`DocId`]        | Backing sub-document owning a block's content |
//! | [`Status`]       | Kind + fold, packed into 3 bits               |
//! | [`BlockContent`] | Text / Image / Code / MathDisplay / Query     |
//! | [`Block`]        | The record the store owns                     |
//! |------------------|-----------------------------------------------|

pub mod block;
pub mod content;
pub mod ids;
pub mod status;

pub use block::{Block, BlockData, Children, MAX_TREE_DEPTH, Metadata};
pub use content::{BlockContent, ImageAlign, RichText, extract_inline_refs};
pub use ids::{BlockId, DocId, ROOT_BLOCK_ID};
pub use status::{BlockKind, MAX_STATUS, Status, StatusError};
