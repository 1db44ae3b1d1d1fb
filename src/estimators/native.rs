//! Binding to a native estimator library.
//!
//! The library is loaded at runtime and must export the C ABI described in
//! `include/ea_estimators.h`.

#![allow(unsafe_code)]

use super::guard::ForeignBox;
use super::suite::{
    EstimatorOutcome, EstimatorSuite, Mode, Representation, SuiteError, SuiteRequest,
    CODE_INVALID_INPUT,
};
use libloading::Library;
use std::ffi::CStr;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// ABI revision this crate speaks.
pub const ABI_VERSION: u32 = 1;
/// Capacity of the outcome array in a result.
pub const MAX_OUTCOMES: usize = 16;

const NAME_LEN: usize = 64;
const MESSAGE_LEN: usize = 512;

/// One outcome as laid out by the native library.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawOutcome {
    /// NUL-terminated procedure name.
    pub name: [u8; NAME_LEN],
    /// Estimate in bits per sample; negative means none.
    pub entropy_estimate: f64,
    /// Nonzero when the procedure passed.
    pub passed: u8,
}

/// Result structure returned by `ea_run_estimators`.
#[repr(C)]
pub struct RawResult {
    /// 0 on success, negative on failure.
    pub error_code: c_int,
    /// NUL-terminated description of the failure.
    pub error_message: [u8; MESSAGE_LEN],
    /// Number of populated entries in `outcomes`.
    pub outcome_count: usize,
    /// Outcomes in execution order.
    pub outcomes: [RawOutcome; MAX_OUTCOMES],
}

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type RunFn = unsafe extern "C" fn(
    mode: c_int,
    representation: c_int,
    symbols: *const u8,
    len: usize,
    alphabet_size: c_int,
    verbose: c_int,
) -> *mut RawResult;
type FreeFn = unsafe extern "C" fn(*mut RawResult);

/// Errors that can occur while loading a native estimator library.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to load estimator library {path}: {source}")]
    Open {
        path: PathBuf,
        source: libloading::Error,
    },
    #[error("estimator library is missing symbol {name}: {source}")]
    MissingSymbol {
        name: &'static str,
        source: libloading::Error,
    },
    #[error("estimator library ABI version {found} is not supported (expected {expected})")]
    AbiMismatch { expected: u32, found: u32 },
}

/// Estimator suite backed by a dynamically loaded native library.
pub struct NativeSuite {
    path: PathBuf,
    verbose: u8,
    run: RunFn,
    free: FreeFn,
    // Keeps `run` and `free` valid; must outlive every call.
    _library: Library,
}

impl NativeSuite {
    /// Loads the library at `path` and checks its ABI version.
    ///
    /// `verbose` is forwarded to the library and clamped to 0-3.
    pub fn load(path: impl AsRef<Path>, verbose: u8) -> Result<Self, LibraryError> {
        let path = path.as_ref();

        // SAFETY: runs the library's initialisers; the path is operator-supplied.
        let library = unsafe { Library::new(path) }.map_err(|source| LibraryError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the symbol types match the declarations in ea_estimators.h.
        let (version, run, free) = unsafe {
            let version: AbiVersionFn = *library
                .get::<AbiVersionFn>(b"ea_abi_version\0")
                .map_err(|source| LibraryError::MissingSymbol {
                    name: "ea_abi_version",
                    source,
                })?;
            let run: RunFn = *library.get::<RunFn>(b"ea_run_estimators\0").map_err(|source| {
                LibraryError::MissingSymbol {
                    name: "ea_run_estimators",
                    source,
                }
            })?;
            let free: FreeFn = *library.get::<FreeFn>(b"ea_free_result\0").map_err(|source| {
                LibraryError::MissingSymbol {
                    name: "ea_free_result",
                    source,
                }
            })?;
            (version(), run, free)
        };

        if version != ABI_VERSION {
            return Err(LibraryError::AbiMismatch {
                expected: ABI_VERSION,
                found: version,
            });
        }

        tracing::info!(
            path = %path.display(),
            abi_version = version,
            "Loaded native estimator library"
        );

        Ok(Self {
            path: path.to_path_buf(),
            verbose: verbose.min(3),
            run,
            free,
            _library: library,
        })
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for NativeSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSuite")
            .field("path", &self.path)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl EstimatorSuite for NativeSuite {
    fn name(&self) -> &str {
        "native"
    }

    fn run(&self, request: &SuiteRequest<'_>) -> Result<Vec<EstimatorOutcome>, SuiteError> {
        let alphabet_size = c_int::try_from(request.alphabet_size).map_err(|_| {
            SuiteError::from_code(
                CODE_INVALID_INPUT,
                format!("alphabet size {} out of range", request.alphabet_size),
            )
        })?;

        // SAFETY: `symbols` is borrowed for the duration of the call and the
        // library does not retain it.
        let raw = unsafe {
            (self.run)(
                mode_code(request.mode),
                representation_code(request.representation),
                request.symbols.as_ptr(),
                request.symbols.len(),
                alphabet_size,
                c_int::from(self.verbose),
            )
        };

        // SAFETY: a non-null result belongs to us until `ea_free_result`.
        let result = unsafe { ForeignBox::from_raw(raw, self.free) }.ok_or_else(|| {
            SuiteError::OutOfMemory {
                what: "estimator result".to_string(),
            }
        })?;

        convert(&result)
    }
}

fn mode_code(mode: Mode) -> c_int {
    match mode {
        Mode::Iid => 0,
        Mode::NonIid => 1,
    }
}

fn representation_code(representation: Representation) -> c_int {
    match representation {
        Representation::Literal => 0,
        Representation::Bitstring => 1,
    }
}

fn convert(raw: &RawResult) -> Result<Vec<EstimatorOutcome>, SuiteError> {
    if raw.error_code != 0 {
        return Err(SuiteError::from_code(
            raw.error_code,
            c_text(&raw.error_message),
        ));
    }

    let count = raw.outcome_count.min(MAX_OUTCOMES);
    Ok(raw.outcomes[..count]
        .iter()
        .map(|o| EstimatorOutcome {
            name: c_text(&o.name),
            entropy_estimate: (o.entropy_estimate >= 0.0).then_some(o.entropy_estimate),
            passed: o.passed != 0,
        })
        .collect())
}

fn c_text(bytes: &[u8]) -> String {
    match CStr::from_bytes_until_nul(bytes) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed<const N: usize>(text: &str) -> [u8; N] {
        let mut buf = [0u8; N];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        buf
    }

    fn empty_outcome() -> RawOutcome {
        RawOutcome {
            name: [0; NAME_LEN],
            entropy_estimate: -1.0,
            passed: 0,
        }
    }

    fn result(code: c_int, message: &str) -> RawResult {
        RawResult {
            error_code: code,
            error_message: fixed(message),
            outcome_count: 0,
            outcomes: [empty_outcome(); MAX_OUTCOMES],
        }
    }

    #[test]
    fn test_convert_outcomes() {
        let mut raw = result(0, "");
        raw.outcome_count = 2;
        raw.outcomes[0] = RawOutcome {
            name: fixed("Most Common Value"),
            entropy_estimate: 0.92,
            passed: 1,
        };
        raw.outcomes[1] = RawOutcome {
            name: fixed("Chi-Square Tests"),
            entropy_estimate: -1.0,
            passed: 0,
        };

        let outcomes = convert(&raw).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], EstimatorOutcome::estimate("Most Common Value", 0.92));
        assert_eq!(outcomes[1], EstimatorOutcome::test("Chi-Square Tests", false));
    }

    #[test]
    fn test_convert_error_codes() {
        let err = convert(&result(-1, "Symbol alphabet consists of 1 symbol.")).unwrap_err();
        assert_eq!(
            err,
            SuiteError::InvalidInput {
                code: -1,
                message: "Symbol alphabet consists of 1 symbol.".to_string(),
            }
        );

        let err = convert(&result(-2, "std::bad_alloc")).unwrap_err();
        assert!(matches!(err, SuiteError::Exception { code: -2, .. }));
    }

    #[test]
    fn test_outcome_count_clamped() {
        let mut raw = result(0, "");
        raw.outcome_count = 1000;
        assert_eq!(convert(&raw).unwrap().len(), MAX_OUTCOMES);
    }

    #[test]
    fn test_unterminated_text() {
        let bytes = [b'a'; 8];
        assert_eq!(c_text(&bytes), "aaaaaaaa");
    }

    #[test]
    fn test_load_missing_library() {
        let err = NativeSuite::load("/nonexistent/libea_estimators.so", 0).unwrap_err();
        assert!(matches!(err, LibraryError::Open { .. }));
    }
}
