//! Assessment orchestration.
//!
//! The coordinator validates a request, prepares the samples once per mode,
//! runs the estimator suite for each dispatched representation and folds the
//! outcomes into a conservative per-mode figure. The overall answer is the
//! minimum across modes.
//!
//! ```text
//! request → validate → prepare → suite (guarded) → aggregate → combine
//! ```
//!
//! Nothing in this module logs or records metrics directly. Callers attach
//! an [`AssessmentObserver`] to see invocation boundaries.

mod aggregate;
mod coordinator;
mod error;
mod observer;

pub use aggregate::{Aggregator, Dispatch, ModeResult, RecordedOutcome};
pub use coordinator::{combine, AssessmentCoordinator, AssessmentRequest, AssessmentResult};
pub use error::{AssessmentError, ErrorKind, ModeError, RequestError};
pub use observer::{AssessmentObserver, NoopObserver, TestSelection};
