//! Instrumentation hooks around an assessment.

use super::coordinator::AssessmentResult;
use super::error::{AssessmentError, RequestError};
use std::fmt;
use std::time::Duration;

/// Which modes a request selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestSelection {
    /// IID only.
    Iid,
    /// Non-IID only.
    NonIid,
    /// Both modes.
    Mixed,
}

impl TestSelection {
    /// Returns `None` when neither mode is selected.
    pub fn from_flags(run_iid: bool, run_non_iid: bool) -> Option<Self> {
        match (run_iid, run_non_iid) {
            (true, true) => Some(TestSelection::Mixed),
            (true, false) => Some(TestSelection::Iid),
            (false, true) => Some(TestSelection::NonIid),
            (false, false) => None,
        }
    }

    /// Label used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            TestSelection::Iid => "IID",
            TestSelection::NonIid => "Non-IID",
            TestSelection::Mixed => "mixed",
        }
    }
}

impl fmt::Display for TestSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives events at the coordinator's invocation boundaries.
///
/// All methods default to no-ops.
pub trait AssessmentObserver: Send + Sync {
    /// The request failed validation.
    fn rejected(&self, _error: &RequestError) {}

    /// A validated request is about to run.
    fn started(&self, _selection: TestSelection, _sample_bytes: usize) {}

    /// The assessment completed.
    fn completed(&self, _selection: TestSelection, _result: &AssessmentResult, _elapsed: Duration) {}

    /// A mode failed after validation.
    fn failed(&self, _selection: TestSelection, _error: &AssessmentError, _elapsed: Duration) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AssessmentObserver for NoopObserver {}
