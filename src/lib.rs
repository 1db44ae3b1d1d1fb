//! NIST SP 800-90B Min-Entropy Assessment
//!
//! Estimates the min-entropy of raw samples from a noise source in the IID
//! and Non-IID tracks of SP 800-90B. The estimator algorithms themselves are
//! an external capability behind the [`EstimatorSuite`] trait; this crate
//! prepares the samples, invokes the suite safely and combines the outcomes.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! bytes → preparation → estimators (guarded) → assessment → result
//!                                                   ↓
//!                                    observer (metrics), report, server
//! ```
//!
//! # Design Principles
//!
//! - **Conservative**: every figure is a minimum across estimators, never an average
//! - **Bitstring from raw values**: the binary expansion never sees alphabet compaction
//! - **Nothing leaks across the boundary**: panics and foreign errors become typed errors
//! - **No hidden state**: each assessment is independent and deterministic
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sp800_90b_assess::{AssessmentCoordinator, AssessmentRequest, MockSuite};
//!
//! let coordinator = AssessmentCoordinator::new(Arc::new(MockSuite::new()));
//!
//! let samples: Vec<u8> = (0..10_000u32).map(|i| (i * 7919 % 251) as u8).collect();
//! let result = coordinator
//!     .assess(&AssessmentRequest {
//!         data: &samples,
//!         word_size: 0,
//!         run_iid: true,
//!         run_non_iid: true,
//!     })
//!     .unwrap();
//!
//! println!("min-entropy: {:.4} bits per {}-bit sample", result.min_entropy, result.word_size);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod assessment;
pub mod config;
pub mod estimators;
pub mod metrics;
pub mod preparation;
pub mod report;
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types at crate root
pub use assessment::{
    AssessmentCoordinator, AssessmentError, AssessmentRequest, AssessmentResult, ErrorKind,
    ModeResult,
};
pub use config::FileConfig;
pub use estimators::{EstimatorOutcome, EstimatorSuite, MockSuite, Mode, NativeSuite};
pub use metrics::MetricsRegistry;
pub use preparation::{prepare, PreparedSamples, WordSize};
pub use report::AssessmentReport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
