//! Per-mode aggregation of estimator outcomes.

use crate::estimators::{EstimatorOutcome, Mode, Representation};
use crate::preparation::WordSize;
use serde::Serialize;

/// Which representations run for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// Literal symbols are assessed.
    pub literal: bool,
    /// The bitstring expansion is assessed.
    pub bitstring: bool,
}

impl Dispatch {
    /// Applies the dispatch rule.
    ///
    /// `initial_entropy` selects unconditioned-source assessment. IID mode
    /// never dispatches the bitstring.
    pub fn new(mode: Mode, alphabet_size: usize, initial_entropy: bool) -> Self {
        Self {
            literal: initial_entropy,
            bitstring: mode == Mode::NonIid && (alphabet_size > 2 || !initial_entropy),
        }
    }

    /// Representations to run, bitstring first.
    pub fn representations(self) -> impl Iterator<Item = Representation> {
        [
            (self.bitstring, Representation::Bitstring),
            (self.literal, Representation::Literal),
        ]
        .into_iter()
        .filter_map(|(run, r)| run.then_some(r))
    }
}

/// An outcome tagged with the representation it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedOutcome {
    /// Representation the estimator saw.
    pub representation: Representation,
    /// What it reported.
    #[serde(flatten)]
    pub outcome: EstimatorOutcome,
}

/// Result of one assessment mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeResult {
    /// Mode assessed.
    pub mode: Mode,
    /// Word size used.
    pub word_size: WordSize,
    /// Distinct symbol values observed.
    pub alphabet_size: usize,
    /// Minimum literal estimate, bits per sample.
    pub h_original: f64,
    /// Minimum bitstring estimate, bits per bit.
    pub h_bitstring: f64,
    /// Conservative min-entropy for the mode, bits per sample.
    pub h_assessed: f64,
    /// Every outcome received, including pass/fail tests.
    pub outcomes: Vec<RecordedOutcome>,
}

impl ModeResult {
    /// Min-entropy reported for this mode.
    pub fn min_entropy(&self) -> f64 {
        self.h_assessed
    }

    /// Whether every reported procedure passed.
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.passed)
    }
}

/// Running minimums for one mode.
#[derive(Debug)]
pub struct Aggregator {
    mode: Mode,
    word_size: WordSize,
    alphabet_size: usize,
    dispatch: Dispatch,
    h_original: f64,
    h_bitstring: f64,
    outcomes: Vec<RecordedOutcome>,
}

impl Aggregator {
    /// Starts both minimums at their ceilings.
    pub fn new(mode: Mode, word_size: WordSize, alphabet_size: usize, dispatch: Dispatch) -> Self {
        Self {
            mode,
            word_size,
            alphabet_size,
            dispatch,
            h_original: f64::from(word_size.bits()),
            h_bitstring: 1.0,
            outcomes: Vec::new(),
        }
    }

    /// Folds outcomes computed against `representation`.
    ///
    /// Outcomes without a valid estimate are kept but do not move a minimum.
    pub fn record(&mut self, representation: Representation, outcomes: Vec<EstimatorOutcome>) {
        for outcome in outcomes {
            if let Some(h) = outcome.valid_estimate() {
                let slot = match representation {
                    Representation::Literal => &mut self.h_original,
                    Representation::Bitstring => &mut self.h_bitstring,
                };
                *slot = slot.min(h);
            }
            self.outcomes.push(RecordedOutcome {
                representation,
                outcome,
            });
        }
    }

    /// Caps the word size by every representation that ran.
    pub fn finish(self) -> ModeResult {
        let ceiling = f64::from(self.word_size.bits());
        let mut h_assessed = ceiling;
        if self.dispatch.bitstring {
            h_assessed = h_assessed.min(self.h_bitstring * ceiling);
        }
        if self.dispatch.literal {
            h_assessed = h_assessed.min(self.h_original);
        }

        ModeResult {
            mode: self.mode,
            word_size: self.word_size,
            alphabet_size: self.alphabet_size,
            h_original: self.h_original,
            h_bitstring: self.h_bitstring,
            h_assessed,
            outcomes: self.outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(bits: u8) -> WordSize {
        WordSize::new(bits).unwrap()
    }

    #[test]
    fn test_dispatch_rule() {
        let d = Dispatch::new(Mode::NonIid, 4, true);
        assert!(d.literal && d.bitstring);

        let d = Dispatch::new(Mode::NonIid, 2, true);
        assert!(d.literal && !d.bitstring);

        let d = Dispatch::new(Mode::NonIid, 2, false);
        assert!(!d.literal && d.bitstring);

        let d = Dispatch::new(Mode::Iid, 256, true);
        assert!(d.literal && !d.bitstring);
        assert_eq!(d.representations().collect::<Vec<_>>(), vec![Representation::Literal]);
    }

    #[test]
    fn test_literal_minimum() {
        let mut agg = Aggregator::new(Mode::Iid, ws(8), 200, Dispatch::new(Mode::Iid, 200, true));
        agg.record(
            Representation::Literal,
            vec![
                EstimatorOutcome::estimate("Most Common Value", 7.2),
                EstimatorOutcome::test("Chi-Square Tests", true),
            ],
        );
        let result = agg.finish();
        assert_eq!(result.h_original, 7.2);
        assert_eq!(result.h_bitstring, 1.0);
        assert_eq!(result.h_assessed, 7.2);
        assert_eq!(result.outcomes.len(), 2);
    }

    #[test]
    fn test_bitstring_scaled_by_word_size() {
        let dispatch = Dispatch::new(Mode::NonIid, 16, true);
        let mut agg = Aggregator::new(Mode::NonIid, ws(4), 16, dispatch);
        agg.record(
            Representation::Bitstring,
            vec![
                EstimatorOutcome::estimate("Collision Test", 0.8),
                EstimatorOutcome::estimate("Markov Test", 0.6),
            ],
        );
        agg.record(
            Representation::Literal,
            vec![EstimatorOutcome::estimate("Most Common Value", 3.5)],
        );
        let result = agg.finish();
        assert_eq!(result.h_bitstring, 0.6);
        assert!((result.h_assessed - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_no_estimates_keeps_ceiling() {
        let dispatch = Dispatch::new(Mode::NonIid, 4, true);
        let mut agg = Aggregator::new(Mode::NonIid, ws(3), 4, dispatch);
        agg.record(
            Representation::Literal,
            vec![EstimatorOutcome::estimate("Most Common Value", f64::NAN)],
        );
        let result = agg.finish();
        assert_eq!(result.h_assessed, 3.0);
        assert_eq!(result.outcomes.len(), 1);
    }

    #[test]
    fn test_estimate_above_ceiling_capped() {
        let dispatch = Dispatch::new(Mode::Iid, 4, true);
        let mut agg = Aggregator::new(Mode::Iid, ws(2), 4, dispatch);
        agg.record(
            Representation::Literal,
            vec![EstimatorOutcome::estimate("Most Common Value", 5.0)],
        );
        assert_eq!(agg.finish().h_assessed, 2.0);
    }
}
