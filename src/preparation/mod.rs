//! Sample preparation.
//!
//! Turns a raw byte buffer into the two representations the estimators
//! consume: a compacted symbol sequence over a contiguous alphabet, and a
//! bitstring expansion of the masked raw values. Both are derived once per
//! assessment and are read-only afterward.

mod symbols;
mod word_size;

pub use symbols::{prepare, PrepareError, PreparedSamples};
pub use word_size::{WordSize, MAX_WORD_SIZE};
