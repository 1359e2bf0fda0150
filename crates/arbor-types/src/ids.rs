//! Typed identifiers for blocks and backing documents.
//!
//! `BlockId` is an opaque string key. Freshly minted ids are UUIDv7 hex
//! (time-ordered), but imported records keep whatever id they arrived with,
//! so nothing here may assume a UUID shape. `DocId` wraps a UUID and names
//! the sub-document that owns a block's content.
//!
//! The `short()` forms are for logs and human-facing UI, never for lookup.

use std::fmt;

use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;

/// Id of the well-known root block that top-level blocks hang off.
pub const ROOT_BLOCK_ID: &str = "root";

/// Opaque, stable block identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(SmartString);

impl BlockId {
    /// Mint a new time-ordered id (UUIDv7, 32 hex chars).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_simple().to_string().into())
    }

    /// The well-known root sentinel.
    pub fn root() -> Self {
        Self(ROOT_BLOCK_ID.into())
    }

    /// Whether this is the root sentinel.
    pub fn is_root(&self) -> bool {
        self.0.as_str() == ROOT_BLOCK_ID
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// First 8 characters, for human display only, not lookup.
    pub fn short(&self) -> &str {
        let s = self.0.as_str();
        match s.char_indices().nth(8) {
            Some((end, _)) => &s[..end],
            None => s,
        }
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.short())
    }
}

/// Identifier of a backing sub-document (UUIDv7, or UUIDv5 for sentinels).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(uuid::Uuid);

/// Fixed namespace for deriving deterministic DocIds via UUIDv5.
const ARBOR_DOC_NS: uuid::Uuid = uuid::uuid!("5f0c2a9e-4b7d-4c61-9e3a-8d2b17f6a0c4");

impl DocId {
    /// Create a new time-ordered ID (UUIDv7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// The well-known main document.
    ///
    /// Deterministic: same value every time (UUIDv5 derived from `b"main"`).
    pub fn main() -> Self {
        Self(uuid::Uuid::new_v5(&ARBOR_DOC_NS, b"main"))
    }

    /// First 8 hex characters, for human display only, not lookup.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::main()
    }
}

impl From<uuid::Uuid> for DocId {
    fn from(u: uuid::Uuid) -> Self {
        Self(u)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocId({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_ids_are_unique() {
        let a = BlockId::new();
        let b = BlockId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_root_sentinel() {
        assert!(BlockId::root().is_root());
        assert!(BlockId::from("root").is_root());
        assert!(!BlockId::from("other").is_root());
    }

    #[test]
    fn test_short_handles_short_and_multibyte_ids() {
        assert_eq!(BlockId::from("abc").short(), "abc");
        assert_eq!(BlockId::from("0123456789").short(), "01234567");
        assert_eq!(BlockId::from("ブロックブロックブロック").short(), "ブロックブロック");
    }

    #[test]
    fn test_block_id_serde_is_transparent() {
        let id = BlockId::from("b-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"b-1\"");
        let back: BlockId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_main_doc_is_deterministic() {
        assert_eq!(DocId::main(), DocId::main());
        assert_ne!(DocId::main(), DocId::new());
    }
}
