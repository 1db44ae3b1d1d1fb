//! Estimator suite contract.
//!
//! The estimator algorithms are an external capability. This module defines
//! the shape every implementation must satisfy and nothing about the math.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Foreign error code for rejected input (malformed data, allocation failure).
pub const CODE_INVALID_INPUT: i32 = -1;
/// Foreign error code for an exception raised inside the suite.
pub const CODE_EXCEPTION: i32 = -2;

/// Assessment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Independent and identically distributed track.
    Iid,
    /// Non-IID track.
    NonIid,
}

impl Mode {
    /// Procedures the suite runs in this mode, in execution order.
    pub fn estimators(self) -> &'static [Estimator] {
        match self {
            Mode::Iid => &IID_ESTIMATORS,
            Mode::NonIid => &NON_IID_ESTIMATORS,
        }
    }

    /// Human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Iid => "IID",
            Mode::NonIid => "Non-IID",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which representation of the samples an estimator runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Compacted symbols over the observed alphabet.
    Literal,
    /// Binary expansion of the raw values.
    Bitstring,
}

impl Representation {
    /// Human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Representation::Literal => "Literal",
            Representation::Bitstring => "Bitstring",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named SP 800-90B procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Estimator {
    MostCommonValue,
    ChiSquare,
    LongestRepeatedSubstring,
    Permutation,
    Collision,
    Markov,
    Compression,
    TTuple,
    Lrs,
    MultiMostCommonInWindow,
    LagPrediction,
    MultiMarkovModelCounting,
    Lz78y,
}

const IID_ESTIMATORS: [Estimator; 4] = [
    Estimator::MostCommonValue,
    Estimator::ChiSquare,
    Estimator::LongestRepeatedSubstring,
    Estimator::Permutation,
];

const NON_IID_ESTIMATORS: [Estimator; 10] = [
    Estimator::MostCommonValue,
    Estimator::Collision,
    Estimator::Markov,
    Estimator::Compression,
    Estimator::TTuple,
    Estimator::Lrs,
    Estimator::MultiMostCommonInWindow,
    Estimator::LagPrediction,
    Estimator::MultiMarkovModelCounting,
    Estimator::Lz78y,
];

impl Estimator {
    /// Canonical name as reported in results.
    pub fn name(self) -> &'static str {
        match self {
            Estimator::MostCommonValue => "Most Common Value",
            Estimator::ChiSquare => "Chi-Square Tests",
            Estimator::LongestRepeatedSubstring => "Length of Longest Repeated Substring Test",
            Estimator::Permutation => "Permutation Tests",
            Estimator::Collision => "Collision Test",
            Estimator::Markov => "Markov Test",
            Estimator::Compression => "Compression Test",
            Estimator::TTuple => "t-Tuple Test",
            Estimator::Lrs => "LRS Test",
            Estimator::MultiMostCommonInWindow => "Multi Most Common in Window Test",
            Estimator::LagPrediction => "Lag Prediction Test",
            Estimator::MultiMarkovModelCounting => "Multi Markov Model with Counting Test",
            Estimator::Lz78y => "LZ78Y Test",
        }
    }

    /// True for pass/fail statistical tests that never yield an estimate.
    pub fn is_test(self) -> bool {
        matches!(
            self,
            Estimator::ChiSquare | Estimator::LongestRepeatedSubstring | Estimator::Permutation
        )
    }

    /// True for estimators defined only over a binary alphabet.
    pub fn binary_only(self) -> bool {
        matches!(
            self,
            Estimator::Collision | Estimator::Markov | Estimator::Compression
        )
    }

    /// Whether this estimator applies to a representation with the given alphabet.
    pub fn applies_to(self, representation: Representation, alphabet_size: usize) -> bool {
        !self.binary_only() || representation == Representation::Bitstring || alphabet_size == 2
    }
}

/// Input handed to a suite for one representation of one mode.
#[derive(Debug, Clone, Copy)]
pub struct SuiteRequest<'a> {
    /// Assessment mode.
    pub mode: Mode,
    /// Representation `symbols` is expressed in.
    pub representation: Representation,
    /// Symbols, each below `alphabet_size`.
    pub symbols: &'a [u8],
    /// Alphabet size; 2 for bitstrings.
    pub alphabet_size: usize,
}

/// Result of one estimator or statistical test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorOutcome {
    /// Procedure name.
    pub name: String,
    /// Entropy estimate in bits per sample of the representation, if any.
    pub entropy_estimate: Option<f64>,
    /// Verdict.
    pub passed: bool,
}

impl EstimatorOutcome {
    /// Outcome of an entropy estimator.
    pub fn estimate(name: impl Into<String>, entropy: f64) -> Self {
        Self {
            name: name.into(),
            entropy_estimate: Some(entropy),
            passed: true,
        }
    }

    /// Outcome of a pass/fail test.
    pub fn test(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            entropy_estimate: None,
            passed,
        }
    }

    /// The estimate, if present, finite and non-negative.
    pub fn valid_estimate(&self) -> Option<f64> {
        self.entropy_estimate
            .filter(|h| h.is_finite() && *h >= 0.0)
    }
}

/// Errors reported by an estimator suite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuiteError {
    #[error("estimator suite rejected input (code {code}): {message}")]
    InvalidInput { code: i32, message: String },
    #[error("estimator suite raised an exception (code {code}): {message}")]
    Exception { code: i32, message: String },
    #[error("estimator suite could not allocate {what}")]
    OutOfMemory { what: String },
}

impl SuiteError {
    /// Wraps a foreign error code and message without interpreting the text.
    pub fn from_code(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == CODE_INVALID_INPUT {
            SuiteError::InvalidInput { code, message }
        } else {
            SuiteError::Exception { code, message }
        }
    }

    /// Foreign error code, if the error carries one.
    pub fn code(&self) -> Option<i32> {
        match self {
            SuiteError::InvalidInput { code, .. } | SuiteError::Exception { code, .. } => {
                Some(*code)
            }
            SuiteError::OutOfMemory { .. } => None,
        }
    }
}

/// A conforming implementation of the estimator algorithms.
///
/// Implementations need not be deterministic, fast, or panic-free; callers
/// go through [`crate::estimators::invoke`] which handles all three.
pub trait EstimatorSuite: Send + Sync {
    /// Short identifier for logs and reports.
    fn name(&self) -> &str;

    /// Runs every estimator of `request.mode` that applies to the representation.
    fn run(&self, request: &SuiteRequest<'_>) -> Result<Vec<EstimatorOutcome>, SuiteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimator_counts() {
        assert_eq!(Mode::Iid.estimators().len(), 4);
        assert_eq!(Mode::NonIid.estimators().len(), 10);
    }

    #[test]
    fn test_iid_has_three_statistical_tests() {
        let tests = Mode::Iid.estimators().iter().filter(|e| e.is_test()).count();
        assert_eq!(tests, 3);
        assert!(Mode::NonIid.estimators().iter().all(|e| !e.is_test()));
    }

    #[test]
    fn test_binary_only_applicability() {
        assert!(!Estimator::Markov.applies_to(Representation::Literal, 4));
        assert!(Estimator::Markov.applies_to(Representation::Literal, 2));
        assert!(Estimator::Markov.applies_to(Representation::Bitstring, 2));
        assert!(Estimator::Lz78y.applies_to(Representation::Literal, 16));
    }

    #[test]
    fn test_valid_estimate_filters() {
        assert_eq!(EstimatorOutcome::estimate("x", 0.5).valid_estimate(), Some(0.5));
        assert_eq!(EstimatorOutcome::estimate("x", -1.0).valid_estimate(), None);
        assert_eq!(EstimatorOutcome::estimate("x", f64::NAN).valid_estimate(), None);
        assert_eq!(EstimatorOutcome::estimate("x", f64::INFINITY).valid_estimate(), None);
        assert_eq!(EstimatorOutcome::test("x", true).valid_estimate(), None);
    }

    #[test]
    fn test_error_from_code() {
        assert!(matches!(
            SuiteError::from_code(-1, "bad"),
            SuiteError::InvalidInput { code: -1, .. }
        ));
        assert!(matches!(
            SuiteError::from_code(-2, "boom"),
            SuiteError::Exception { code: -2, .. }
        ));
        assert_eq!(SuiteError::from_code(-7, "odd").code(), Some(-7));
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(Mode::Iid.to_string(), "IID");
        assert_eq!(Mode::NonIid.to_string(), "Non-IID");
        assert_eq!(serde_json::to_string(&Mode::NonIid).unwrap(), "\"non_iid\"");
    }
}
