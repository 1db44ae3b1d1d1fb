//! Deterministic stand-in for the native estimator library.

use super::suite::{
    Estimator, EstimatorOutcome, EstimatorSuite, Mode, Representation, SuiteError, SuiteRequest,
};
use std::sync::Mutex;

/// A call recorded by [`MockSuite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Mode requested.
    pub mode: Mode,
    /// Representation requested.
    pub representation: Representation,
    /// Number of symbols passed.
    pub len: usize,
    /// Alphabet size passed.
    pub alphabet_size: usize,
}

#[derive(Debug, Clone, Default)]
enum Behavior {
    #[default]
    Estimates,
    NoEstimates,
    Fail { code: i32, message: String },
    Panic(String),
}

/// Mock estimator suite for testing and dry runs.
///
/// Produces fixed fractions of `log2(alphabet_size)` per estimator, so the
/// same input always yields the same outcomes. NOT an entropy assessment.
#[derive(Debug, Default)]
pub struct MockSuite {
    behavior: Behavior,
    calls: Mutex<Vec<MockCall>>,
}

impl MockSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suite whose estimators all return no estimate.
    pub fn without_estimates() -> Self {
        Self {
            behavior: Behavior::NoEstimates,
            ..Self::default()
        }
    }

    /// Suite that reports a foreign error code on every call.
    pub fn failing(code: i32, message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail {
                code,
                message: message.into(),
            },
            ..Self::default()
        }
    }

    /// Suite that panics on every call.
    pub fn panicking(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Panic(message.into()),
            ..Self::default()
        }
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, request: &SuiteRequest<'_>) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(MockCall {
                mode: request.mode,
                representation: request.representation,
                len: request.symbols.len(),
                alphabet_size: request.alphabet_size,
            });
    }
}

fn fraction(estimator: Estimator) -> f64 {
    match estimator {
        Estimator::MostCommonValue => 0.95,
        Estimator::Collision => 0.90,
        Estimator::Markov => 0.93,
        Estimator::Compression => 0.85,
        Estimator::TTuple => 0.91,
        Estimator::Lrs => 0.97,
        Estimator::MultiMostCommonInWindow => 0.94,
        Estimator::LagPrediction => 0.92,
        Estimator::MultiMarkovModelCounting => 0.96,
        Estimator::Lz78y => 0.89,
        Estimator::ChiSquare | Estimator::LongestRepeatedSubstring | Estimator::Permutation => 0.0,
    }
}

impl EstimatorSuite for MockSuite {
    fn name(&self) -> &str {
        "mock"
    }

    fn run(&self, request: &SuiteRequest<'_>) -> Result<Vec<EstimatorOutcome>, SuiteError> {
        self.record(request);

        match &self.behavior {
            Behavior::Fail { code, message } => {
                return Err(SuiteError::from_code(*code, message.clone()))
            }
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::Estimates | Behavior::NoEstimates => {}
        }

        let scale = (request.alphabet_size.max(1) as f64).log2();
        let outcomes = request
            .mode
            .estimators()
            .iter()
            .filter(|e| e.applies_to(request.representation, request.alphabet_size))
            .map(|&e| {
                if e.is_test() {
                    EstimatorOutcome::test(e.name(), true)
                } else if matches!(self.behavior, Behavior::NoEstimates) {
                    EstimatorOutcome {
                        name: e.name().to_string(),
                        entropy_estimate: None,
                        passed: true,
                    }
                } else {
                    EstimatorOutcome::estimate(e.name(), fraction(e) * scale)
                }
            })
            .collect();

        Ok(outcomes)
    }
}
