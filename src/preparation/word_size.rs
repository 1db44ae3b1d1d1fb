//! Symbol width handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest supported symbol width in bits.
pub const MAX_WORD_SIZE: u8 = 8;

/// Bits per symbol, always in `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WordSize(u8);

impl WordSize {
    /// Creates a word size, returning `None` outside `1..=8`.
    pub fn new(bits: u8) -> Option<Self> {
        (1..=MAX_WORD_SIZE).contains(&bits).then_some(Self(bits))
    }

    /// Detects the smallest width able to represent every byte in `data`.
    ///
    /// The bytes are OR-folded together and the width is the position of the
    /// highest set bit plus one. All-zero input detects as one bit.
    pub fn detect(data: &[u8]) -> Self {
        let folded = data.iter().fold(0u8, |acc, &b| acc | b);
        let bits = (u8::BITS - folded.leading_zeros()) as u8;
        Self(bits.max(1))
    }

    /// Number of bits per symbol.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Mask selecting the low `bits()` bits of a byte.
    pub fn mask(self) -> u8 {
        ((1u16 << self.0) - 1) as u8
    }

    /// Number of distinct values a symbol of this width can take.
    pub fn max_symbols(self) -> usize {
        1usize << self.0
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WordSize> for u8 {
    fn from(ws: WordSize) -> Self {
        ws.0
    }
}

impl TryFrom<u8> for WordSize {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::new(bits).ok_or_else(|| format!("word size {} outside 1..=8", bits))
    }
}
