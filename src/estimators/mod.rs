//! Estimator suite abstraction and call boundary.
//!
//! The SP 800-90B estimator algorithms are not implemented here. They are
//! consumed through the [`EstimatorSuite`] trait, with two implementations:
//!
//! - [`NativeSuite`] binds a shared library exporting the C ABI in
//!   `include/ea_estimators.h`
//! - [`MockSuite`] is a deterministic fake for tests and dry runs
//!
//! All calls are expected to go through [`invoke`], which catches panics and
//! normalises estimates. Foreign-allocated results are owned by
//! [`ForeignBox`] so they are released on every exit path.

mod guard;
mod mock;
mod native;
mod suite;

pub use guard::{invoke, ForeignBox};
pub use mock::{MockCall, MockSuite};
pub use native::{LibraryError, NativeSuite, RawOutcome, RawResult, ABI_VERSION, MAX_OUTCOMES};
pub use suite::{
    Estimator, EstimatorOutcome, EstimatorSuite, Mode, Representation, SuiteError, SuiteRequest,
    CODE_EXCEPTION, CODE_INVALID_INPUT,
};
