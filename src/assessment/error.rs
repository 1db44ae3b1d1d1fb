//! Assessment error taxonomy.

use crate::estimators::{Mode, SuiteError};
use crate::preparation::PrepareError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification every assessment error falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caused by the caller's input. Never retried.
    InvalidInput,
    /// Allocation failed while preparing data or invoking the suite.
    ResourceExhausted,
    /// Error or exception reported by the estimator suite.
    Foreign,
}

impl ErrorKind {
    /// Stable label for metrics and response bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::Foreign => "foreign",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// Estimation is deterministic, so only resource exhaustion qualifies.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ResourceExhausted)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a request is rejected before any work is done.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("sample data is empty")]
    EmptyData,
    #[error("invalid word size {0} (must be 0-8, 0 to auto-detect)")]
    InvalidWordSize(u32),
    #[error("at least one of IID or Non-IID must be selected")]
    NoModeSelected,
    #[error("malformed request parameters: {0}")]
    MalformedQuery(String),
}

impl RequestError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RequestError::EmptyData => "empty_data",
            RequestError::InvalidWordSize(_) => "invalid_word_size",
            RequestError::NoModeSelected => "no_mode_selected",
            RequestError::MalformedQuery(_) => "malformed_query",
        }
    }
}

/// Failure inside one mode's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error(transparent)]
    Preparation(#[from] PrepareError),
    #[error(transparent)]
    Suite(#[from] SuiteError),
}

impl ModeError {
    /// Classifies the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModeError::Preparation(PrepareError::Allocation { .. }) => ErrorKind::ResourceExhausted,
            ModeError::Preparation(_) => ErrorKind::InvalidInput,
            ModeError::Suite(SuiteError::OutOfMemory { .. }) => ErrorKind::ResourceExhausted,
            ModeError::Suite(_) => ErrorKind::Foreign,
        }
    }
}

/// Error returned by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssessmentError {
    #[error("request rejected: {0}")]
    Rejected(#[from] RequestError),
    #[error("{mode} assessment failed: {source}")]
    Failed {
        /// Mode whose pipeline failed.
        mode: Mode,
        #[source]
        source: ModeError,
    },
}

impl AssessmentError {
    pub(crate) fn failed(mode: Mode, source: impl Into<ModeError>) -> Self {
        AssessmentError::Failed {
            mode,
            source: source.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssessmentError::Rejected(_) => ErrorKind::InvalidInput,
            AssessmentError::Failed { source, .. } => source.kind(),
        }
    }

    /// Mode that failed, if the request got past validation.
    pub fn mode(&self) -> Option<Mode> {
        match self {
            AssessmentError::Rejected(_) => None,
            AssessmentError::Failed { mode, .. } => Some(*mode),
        }
    }

    /// Foreign error code, when the suite reported one.
    pub fn foreign_code(&self) -> Option<i32> {
        match self {
            AssessmentError::Failed {
                source: ModeError::Suite(e),
                ..
            } => e.code(),
            _ => None,
        }
    }
}
