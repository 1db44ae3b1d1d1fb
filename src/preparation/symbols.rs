//! Symbol sequence, alphabet compaction and bitstring expansion.

use super::word_size::{WordSize, MAX_WORD_SIZE};
use thiserror::Error;

/// Errors that can occur while preparing samples for estimation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    #[error("sample buffer is empty")]
    EmptySamples,
    #[error("invalid word size {0} (must be 0-8, 0 to auto-detect)")]
    InvalidWordSize(u32),
    #[error("Symbol alphabet consists of 1 symbol. No entropy awarded.")]
    SingleSymbolAlphabet,
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation {
        /// Buffer that could not be allocated.
        what: &'static str,
        /// Requested size in bytes.
        bytes: usize,
    },
}

/// Samples ready to hand to an estimator suite.
///
/// Holds the compacted symbol sequence, the alphabet size and the bitstring
/// expansion of the raw (pre-compaction) values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSamples {
    symbols: Vec<u8>,
    /// `None` when the word size is 1 and the bitstring is `symbols` itself.
    bitstring: Option<Vec<u8>>,
    alphabet_size: usize,
    word_size: WordSize,
}

impl PreparedSamples {
    /// Compacted symbols, each in `0..alphabet_size()`.
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// One bit per element, MSB-first per raw symbol.
    pub fn bitstring(&self) -> &[u8] {
        self.bitstring.as_deref().unwrap_or(&self.symbols)
    }

    /// Number of distinct masked values observed.
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Resolved word size.
    pub fn word_size(&self) -> WordSize {
        self.word_size
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always false for a successfully prepared buffer.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Converts raw bytes into a symbol sequence, alphabet and bitstring.
///
/// `requested_word_size` of 0 auto-detects the width from the data.
pub fn prepare(data: &[u8], requested_word_size: u32) -> Result<PreparedSamples, PrepareError> {
    if data.is_empty() {
        return Err(PrepareError::EmptySamples);
    }
    if requested_word_size > MAX_WORD_SIZE as u32 {
        return Err(PrepareError::InvalidWordSize(requested_word_size));
    }

    let word_size = match requested_word_size {
        0 => WordSize::detect(data),
        bits => WordSize::new(bits as u8).ok_or(PrepareError::InvalidWordSize(bits))?,
    };
    let mask = word_size.mask();

    let mut symbols = alloc_buffer(data.len(), "symbol sequence")?;
    symbols.extend(data.iter().map(|&b| b & mask));

    // Presence table over every value the width allows.
    let mut present = [false; 256];
    let mut max_symbol = 0u8;
    for &s in &symbols {
        present[s as usize] = true;
        max_symbol = max_symbol.max(s);
    }

    let mut index = [0u8; 256];
    let mut alphabet_size = 0usize;
    for (value, _) in present
        .iter()
        .enumerate()
        .take(word_size.max_symbols())
        .filter(|&(_, &seen)| seen)
    {
        index[value] = alphabet_size as u8;
        alphabet_size += 1;
    }

    if alphabet_size <= 1 {
        return Err(PrepareError::SingleSymbolAlphabet);
    }

    let bitstring = if word_size.bits() == 1 {
        None
    } else {
        Some(expand_bits(&symbols, word_size)?)
    };

    // Identity mapping when every value below the maximum occurs.
    if alphabet_size < max_symbol as usize + 1 {
        for s in symbols.iter_mut() {
            *s = index[*s as usize];
        }
    }

    Ok(PreparedSamples {
        symbols,
        bitstring,
        alphabet_size,
        word_size,
    })
}

/// Expands masked raw symbols into one bit per byte, MSB-first.
fn expand_bits(raw: &[u8], word_size: WordSize) -> Result<Vec<u8>, PrepareError> {
    let width = word_size.bits() as usize;
    let len = raw
        .len()
        .checked_mul(width)
        .ok_or(PrepareError::Allocation {
            what: "bitstring",
            bytes: usize::MAX,
        })?;

    let mut bits = alloc_buffer(len, "bitstring")?;
    for &value in raw {
        for shift in (0..width).rev() {
            bits.push((value >> shift) & 1);
        }
    }
    Ok(bits)
}

fn alloc_buffer(len: usize, what: &'static str) -> Result<Vec<u8>, PrepareError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PrepareError::Allocation { what, bytes: len })?;
    Ok(buf)
}
