//! Call boundary around the estimator suite.
//!
//! Every call into a suite goes through [`invoke`], which turns panics into
//! typed errors and normalises estimates. [`ForeignBox`] owns memory the
//! foreign side allocated and releases it on every exit path.

#![allow(unsafe_code)]

use super::suite::{EstimatorOutcome, EstimatorSuite, SuiteError, SuiteRequest, CODE_EXCEPTION};
use std::any::Any;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;

/// Runs `suite` on `request`, never letting a panic escape.
///
/// Estimates that are negative or not finite are reported as absent.
pub fn invoke(
    suite: &dyn EstimatorSuite,
    request: &SuiteRequest<'_>,
) -> Result<Vec<EstimatorOutcome>, SuiteError> {
    let outcomes = panic::catch_unwind(AssertUnwindSafe(|| suite.run(request))).map_err(
        |payload| SuiteError::Exception {
            code: CODE_EXCEPTION,
            message: panic_message(payload.as_ref()),
        },
    )??;

    Ok(outcomes
        .into_iter()
        .map(|mut outcome| {
            outcome.entropy_estimate = outcome.valid_estimate();
            outcome
        })
        .collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic in estimator suite".to_string()
    }
}

/// Owning handle for a value allocated on the foreign side.
///
/// The release function runs exactly once, when the handle drops.
pub struct ForeignBox<T> {
    ptr: NonNull<T>,
    release: unsafe extern "C" fn(*mut T),
}

impl<T> ForeignBox<T> {
    /// Takes ownership of `ptr`. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a valid, initialised `T` that nothing
    /// else frees, and `release` must accept it exactly once.
    pub unsafe fn from_raw(ptr: *mut T, release: unsafe extern "C" fn(*mut T)) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, release })
    }
}

impl<T> Deref for ForeignBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: valid for the lifetime of the handle per `from_raw`.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> Drop for ForeignBox<T> {
    fn drop(&mut self) {
        // SAFETY: ownership was transferred in `from_raw`; drop runs once.
        unsafe { (self.release)(self.ptr.as_ptr()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{Mode, Representation};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked {
        released: &'static AtomicUsize,
        value: i32,
    }

    unsafe extern "C" fn release_tracked(ptr: *mut Tracked) {
        let tracked = Box::from_raw(ptr);
        tracked.released.fetch_add(1, Ordering::SeqCst);
    }

    fn allocate(released: &'static AtomicUsize, value: i32) -> ForeignBox<Tracked> {
        let raw = Box::into_raw(Box::new(Tracked { released, value }));
        unsafe { ForeignBox::from_raw(raw, release_tracked) }.unwrap()
    }

    struct StaticSuite(Result<Vec<EstimatorOutcome>, SuiteError>);

    impl EstimatorSuite for StaticSuite {
        fn name(&self) -> &str {
            "static"
        }

        fn run(&self, _: &SuiteRequest<'_>) -> Result<Vec<EstimatorOutcome>, SuiteError> {
            self.0.clone()
        }
    }

    struct PanickingSuite;

    impl EstimatorSuite for PanickingSuite {
        fn name(&self) -> &str {
            "panicking"
        }

        fn run(&self, _: &SuiteRequest<'_>) -> Result<Vec<EstimatorOutcome>, SuiteError> {
            panic!("estimator blew up")
        }
    }

    fn request(symbols: &[u8]) -> SuiteRequest<'_> {
        SuiteRequest {
            mode: Mode::NonIid,
            representation: Representation::Literal,
            symbols,
            alphabet_size: 2,
        }
    }

    #[test]
    fn test_panic_becomes_exception() {
        let err = invoke(&PanickingSuite, &request(&[0, 1])).unwrap_err();
        assert_eq!(
            err,
            SuiteError::Exception {
                code: CODE_EXCEPTION,
                message: "estimator blew up".to_string(),
            }
        );
    }

    #[test]
    fn test_error_passes_through_verbatim() {
        let suite = StaticSuite(Err(SuiteError::from_code(-1, "raw foreign text")));
        let err = invoke(&suite, &request(&[0, 1])).unwrap_err();
        assert_eq!(err, SuiteError::from_code(-1, "raw foreign text"));
    }

    #[test]
    fn test_invalid_estimates_cleared() {
        let suite = StaticSuite(Ok(vec![
            EstimatorOutcome::estimate("a", 0.7),
            EstimatorOutcome::estimate("b", f64::NAN),
            EstimatorOutcome::estimate("c", -0.1),
        ]));
        let outcomes = invoke(&suite, &request(&[0, 1])).unwrap();
        assert_eq!(outcomes[0].entropy_estimate, Some(0.7));
        assert_eq!(outcomes[1].entropy_estimate, None);
        assert_eq!(outcomes[2].entropy_estimate, None);
    }

    #[test]
    fn test_null_pointer_rejected() {
        let handle = unsafe { ForeignBox::<Tracked>::from_raw(std::ptr::null_mut(), release_tracked) };
        assert!(handle.is_none());
    }

    #[test]
    fn test_released_on_normal_exit() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        {
            let handle = allocate(&RELEASED, 42);
            assert_eq!(handle.value, 42);
        }
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_released_on_error_exit() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        fn convert(handle: ForeignBox<Tracked>) -> Result<i32, SuiteError> {
            if handle.value < 0 {
                return Err(SuiteError::from_code(handle.value, "negative"));
            }
            Ok(handle.value)
        }
        assert!(convert(allocate(&RELEASED, -1)).is_err());
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_released_on_panic() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        let result = panic::catch_unwind(|| {
            let _handle = allocate(&RELEASED, 7);
            panic!("conversion failed");
        });
        assert!(result.is_err());
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    }
}
