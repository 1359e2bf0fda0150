//! Packed block status codec.
//!
//! A block's kind and fold state travel as one small integer:
//!
//! ```text
//!  bit 2      bits 1..0
//! ┌────────┬────────────┐
//! │expanded│    kind    │   kind: 00 Normal, 01 Mirror, 10 Virtual
//! └────────┴────────────┘
//! ```
//!
//! The high bit means *expanded*, so `fold` is its negation: a clear bit
//! decodes to `fold == true`. Only `0..=5` are valid codes; `3` has no kind
//! and `6`/`7` are never produced.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

const KIND_MASK: u32 = 0b011;
const EXPANDED_BIT: u32 = 0b100;

/// Largest valid packed status.
pub const MAX_STATUS: u32 = 5;

/// Errors from decoding or packing a status integer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StatusError {
    #[error("invalid block status {0} (expected 0..=5)")]
    InvalidStatus(u32),
}

/// What a block is: its own content, or an alias of another block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockKind {
    /// Holds its own content.
    #[default]
    Normal,
    /// Renders the live subtree of its source.
    Mirror,
    /// Placeholder for its source, optionally with local children.
    Virtual,
}

impl BlockKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Normal => "normal",
            BlockKind::Mirror => "mirror",
            BlockKind::Virtual => "virtual",
        }
    }

    /// Mirror or Virtual.
    pub fn is_alias(&self) -> bool {
        !matches!(self, BlockKind::Normal)
    }

    fn bits(&self) -> u32 {
        match self {
            BlockKind::Normal => 0b00,
            BlockKind::Mirror => 0b01,
            BlockKind::Virtual => 0b10,
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded status: kind plus fold flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    pub kind: BlockKind,
    pub fold: bool,
}

impl Status {
    pub fn new(kind: BlockKind, fold: bool) -> Self {
        Self { kind, fold }
    }

    /// Decode a packed status integer.
    pub fn decode(raw: u32) -> Result<Self, StatusError> {
        if raw > MAX_STATUS {
            return Err(StatusError::InvalidStatus(raw));
        }
        let kind = match raw & KIND_MASK {
            0b00 => BlockKind::Normal,
            0b01 => BlockKind::Mirror,
            0b10 => BlockKind::Virtual,
            _ => return Err(StatusError::InvalidStatus(raw)),
        };
        Ok(Self {
            kind,
            fold: raw & EXPANDED_BIT == 0,
        })
    }

    /// Pack back into the integer form.
    ///
    /// An expanded Virtual block would need code 6, which is outside the
    /// valid range, so it is rejected rather than emitted.
    pub fn pack(&self) -> Result<u32, StatusError> {
        let raw = self.kind.bits() | if self.fold { 0 } else { EXPANDED_BIT };
        if raw > MAX_STATUS {
            return Err(StatusError::InvalidStatus(raw));
        }
        Ok(raw)
    }
}

impl TryFrom<u32> for Status {
    type Error = StatusError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::decode(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_polarity() {
        assert!(Status::decode(0b000).unwrap().fold);
        assert!(!Status::decode(0b100).unwrap().fold);
    }

    #[test]
    fn test_decode_valid_range() {
        for raw in 0..=MAX_STATUS {
            match Status::decode(raw) {
                Ok(status) => {
                    assert_eq!(status.fold, raw & 0b100 == 0, "fold polarity for {raw}");
                    assert!(matches!(
                        status.kind,
                        BlockKind::Normal | BlockKind::Mirror | BlockKind::Virtual
                    ));
                }
                // 3 carries the unused kind bits
                Err(StatusError::InvalidStatus(bad)) => assert_eq!(bad, 3),
            }
        }
    }

    #[test]
    fn test_decode_kinds() {
        assert_eq!(Status::decode(0).unwrap().kind, BlockKind::Normal);
        assert_eq!(Status::decode(1).unwrap().kind, BlockKind::Mirror);
        assert_eq!(Status::decode(2).unwrap().kind, BlockKind::Virtual);
        assert_eq!(Status::decode(4).unwrap().kind, BlockKind::Normal);
        assert_eq!(Status::decode(5).unwrap().kind, BlockKind::Mirror);
    }

    #[test]
    fn test_high_codes_rejected() {
        assert_eq!(Status::decode(6), Err(StatusError::InvalidStatus(6)));
        assert_eq!(Status::decode(7), Err(StatusError::InvalidStatus(7)));
        assert_eq!(Status::decode(3), Err(StatusError::InvalidStatus(3)));
        assert!(Status::try_from(200).is_err());
    }

    #[test]
    fn test_pack_inverts_decode() {
        for raw in [0, 1, 2, 4, 5] {
            assert_eq!(Status::decode(raw).unwrap().pack().unwrap(), raw);
        }
    }

    #[test]
    fn test_pack_never_produces_six() {
        let expanded_virtual = Status::new(BlockKind::Virtual, false);
        assert_eq!(expanded_virtual.pack(), Err(StatusError::InvalidStatus(6)));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(BlockKind::from_str("Mirror"), Some(BlockKind::Mirror));
        assert_eq!(BlockKind::from_str("virtual"), Some(BlockKind::Virtual));
        assert_eq!(BlockKind::from_str("bogus"), None);
    }
}
