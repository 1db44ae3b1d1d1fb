//! Request validation, mode execution and result combination.

use super::aggregate::{Aggregator, Dispatch, ModeResult};
use super::error::{AssessmentError, RequestError};
use super::observer::{AssessmentObserver, NoopObserver, TestSelection};
use crate::estimators::{invoke, EstimatorSuite, Mode, Representation, SuiteRequest};
use crate::preparation::{prepare, PreparedSamples, MAX_WORD_SIZE};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Samples are assessed as an unconditioned noise source.
const INITIAL_ENTROPY: bool = true;

/// One assessment request.
#[derive(Debug, Clone, Copy)]
pub struct AssessmentRequest<'a> {
    /// Raw samples, one per byte.
    pub data: &'a [u8],
    /// Bits per symbol, 0 to auto-detect.
    pub word_size: u32,
    /// Run the IID track.
    pub run_iid: bool,
    /// Run the Non-IID track.
    pub run_non_iid: bool,
}

impl AssessmentRequest<'_> {
    /// Checks the request without touching the estimator suite.
    pub fn validate(&self) -> Result<TestSelection, RequestError> {
        if self.data.is_empty() {
            return Err(RequestError::EmptyData);
        }
        if self.word_size > u32::from(MAX_WORD_SIZE) {
            return Err(RequestError::InvalidWordSize(self.word_size));
        }
        TestSelection::from_flags(self.run_iid, self.run_non_iid)
            .ok_or(RequestError::NoModeSelected)
    }
}

/// Combined result of every mode that ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    /// Minimum of the per-mode assessments; never infinite.
    pub min_entropy: f64,
    /// Word size actually used, or the requested value if no mode resolved one.
    pub word_size: u8,
    /// Number of samples assessed.
    pub sample_count: usize,
    /// IID result, when requested.
    pub iid: Option<ModeResult>,
    /// Non-IID result, when requested.
    pub non_iid: Option<ModeResult>,
}

impl AssessmentResult {
    /// Every mode that ran, IID first.
    pub fn modes(&self) -> impl Iterator<Item = &ModeResult> {
        self.iid.iter().chain(self.non_iid.iter())
    }

    /// Whether every reported procedure in every mode passed.
    pub fn all_passed(&self) -> bool {
        self.modes().all(ModeResult::all_passed)
    }
}

/// Combines per-mode results into one answer.
///
/// The overall minimum starts at infinity; if nothing finite lowers it, the
/// result is 0.
pub fn combine(
    requested_word_size: u8,
    sample_count: usize,
    iid: Option<ModeResult>,
    non_iid: Option<ModeResult>,
) -> AssessmentResult {
    let min_entropy = iid
        .iter()
        .chain(non_iid.iter())
        .map(ModeResult::min_entropy)
        .fold(f64::INFINITY, f64::min);
    let min_entropy = if min_entropy.is_finite() { min_entropy } else { 0.0 };

    let word_size = iid
        .as_ref()
        .or(non_iid.as_ref())
        .map(|m| m.word_size.bits())
        .unwrap_or(requested_word_size);

    AssessmentResult {
        min_entropy,
        word_size,
        sample_count,
        iid,
        non_iid,
    }
}

/// Runs assessments against an estimator suite.
///
/// Holds no per-call state; one coordinator can serve concurrent callers.
#[derive(Clone)]
pub struct AssessmentCoordinator {
    suite: Arc<dyn EstimatorSuite>,
    observer: Arc<dyn AssessmentObserver>,
}

impl AssessmentCoordinator {
    /// Creates a coordinator with no observer.
    pub fn new(suite: Arc<dyn EstimatorSuite>) -> Self {
        Self {
            suite,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Reports every invocation to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn AssessmentObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Suite this coordinator calls.
    pub fn suite(&self) -> &dyn EstimatorSuite {
        self.suite.as_ref()
    }

    /// Validates `request`, runs every selected mode and combines them.
    ///
    /// A failure in any selected mode fails the whole assessment.
    pub fn assess(&self, request: &AssessmentRequest<'_>) -> Result<AssessmentResult, AssessmentError> {
        let selection = match request.validate() {
            Ok(selection) => selection,
            Err(e) => {
                self.observer.rejected(&e);
                return Err(e.into());
            }
        };

        self.observer.started(selection, request.data.len());
        let started = Instant::now();

        let outcome = self.run_selected(request);
        match &outcome {
            Ok(result) => self.observer.completed(selection, result, started.elapsed()),
            Err(e) => self.observer.failed(selection, e, started.elapsed()),
        }
        outcome
    }

    /// Reports a request rejected before it reached [`Self::assess`].
    ///
    /// For front ends that fail to decode a request into an
    /// [`AssessmentRequest`] in the first place.
    pub fn reject(&self, error: RequestError) -> AssessmentError {
        self.observer.rejected(&error);
        error.into()
    }

    fn run_selected(&self, request: &AssessmentRequest<'_>) -> Result<AssessmentResult, AssessmentError> {
        // Preparation failures are reported against the first selected mode.
        let first = if request.run_iid { Mode::Iid } else { Mode::NonIid };
        let prepared = prepare(request.data, request.word_size)
            .map_err(|e| AssessmentError::failed(first, e))?;

        let iid = request
            .run_iid
            .then(|| self.run_mode(&prepared, Mode::Iid))
            .transpose()?;
        let non_iid = request
            .run_non_iid
            .then(|| self.run_mode(&prepared, Mode::NonIid))
            .transpose()?;

        // Validation bounds word_size to 0..=8.
        let requested = u8::try_from(request.word_size).unwrap_or(0);
        Ok(combine(requested, request.data.len(), iid, non_iid))
    }

    /// Prepares `data` and runs a single mode through the suite.
    ///
    /// Performs no request validation beyond what preparation does and does
    /// not notify the observer.
    pub fn assess_mode(&self, data: &[u8], word_size: u32, mode: Mode) -> Result<ModeResult, AssessmentError> {
        let prepared = prepare(data, word_size).map_err(|e| AssessmentError::failed(mode, e))?;
        self.run_mode(&prepared, mode)
    }

    fn run_mode(&self, prepared: &PreparedSamples, mode: Mode) -> Result<ModeResult, AssessmentError> {
        let dispatch = Dispatch::new(mode, prepared.alphabet_size(), INITIAL_ENTROPY);
        let mut aggregator = Aggregator::new(
            mode,
            prepared.word_size(),
            prepared.alphabet_size(),
            dispatch,
        );

        for representation in dispatch.representations() {
            let (symbols, alphabet_size) = match representation {
                Representation::Literal => (prepared.symbols(), prepared.alphabet_size()),
                Representation::Bitstring => (prepared.bitstring(), 2),
            };
            let request = SuiteRequest {
                mode,
                representation,
                symbols,
                alphabet_size,
            };
            let outcomes = invoke(self.suite.as_ref(), &request)
                .map_err(|e| AssessmentError::failed(mode, e))?;
            aggregator.record(representation, outcomes);
        }

        Ok(aggregator.finish())
    }
}

impl std::fmt::Debug for AssessmentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentCoordinator")
            .field("suite", &self.suite.name())
            .finish_non_exhaustive()
    }
}
