//! Prometheus metrics for assessment workloads.
//!
//! [`MetricsRegistry`] implements [`AssessmentObserver`](crate::assessment::AssessmentObserver)
//! and is attached to a coordinator at construction time.
//!
//! # Metrics Exposed
//!
//! - `entropy_requests_total{test_type}` - Validated assessment requests
//! - `entropy_duration_seconds{test_type}` - Assessment duration
//! - `entropy_errors_total{test_type,error_type}` - Failed assessments by error kind
//! - `entropy_data_size_bytes{test_type}` - Sample buffer size
//! - `entropy_min_entropy_value{test_type}` - Combined min-entropy
//! - `entropy_rejected_total{reason}` - Requests rejected by validation
//!
//! `test_type` is one of `IID`, `Non-IID` or `mixed`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sp800_90b_assess::assessment::AssessmentCoordinator;
//! use sp800_90b_assess::estimators::MockSuite;
//! use sp800_90b_assess::metrics::MetricsRegistry;
//!
//! let registry = Arc::new(MetricsRegistry::new().expect("Failed to create registry"));
//! let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()))
//!     .with_observer(registry.clone());
//!
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
