//! Conformance check: frame estimators fail like their native estimators
//! when used before `fit`.
//!
//! # Example
//!
//! ```rust
//! use learnframe::conformance::{check_expected_not_fitted_error, CheckerConfig};
//! use learnframe::transformation::StandardScalerDF;
//!
//! let scaler = StandardScalerDF::default();
//! check_expected_not_fitted_error(&scaler, &CheckerConfig::default()).unwrap();
//! ```

use crate::error::{ConformanceError, EstimatorError};
use crate::frame::{Frame, Series};
use crate::native::NativeEstimator;
use crate::registry::{ClassInfo, Namespace};
use crate::wrapper::EstimatorDF;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Whether the native library guarantees a not-fitted error before `fit`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFittedGuarantee {
    #[default]
    Guaranteed,
    /// Legacy native behavior; the check makes no assertion.
    Waived,
}

/// Configuration of the conformance checker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub not_fitted_guarantee: NotFittedGuarantee,
}

impl CheckerConfig {
    /// A configuration under which every check passes without calling anything.
    pub fn waived() -> Self {
        Self {
            not_fitted_guarantee: NotFittedGuarantee::Waived,
        }
    }

    /// Parse a configuration such as `{"not_fitted_guarantee": "waived"}`.
    pub fn from_json(json: &str) -> Result<Self, EstimatorError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Call {
    Predict,
    Transform,
}

/// One column named `"0"` holding 0 to 9.
fn probe_frame() -> Frame {
    Series::from_vec(Some("0"), (0..10).map(f64::from).collect()).to_frame()
}

fn call_native(
    native: &dyn NativeEstimator,
    call: Call,
    x: &Frame,
) -> Result<(), EstimatorError> {
    match call {
        Call::Predict => {
            let flat: Array1<f64> = x.values().iter().copied().collect();
            native.predict(flat.view().into_dyn()).map(|_| ())
        }
        Call::Transform => native.transform(x.view().into_dyn()).map(|_| ()),
    }
}

/// Check that `estimator`, unfitted, fails with the not-fitted error or
/// exactly the error its native estimator gives.
///
/// Learners are probed with `predict`, transformers with `transform`, on a
/// one-column frame of ten rows. If the frame estimator fails with any other
/// error, the same call is repeated on the native estimator with the raw
/// values, flattened for `predict`.
///
/// # Errors
/// - [`ConformanceError::UnsupportedEstimator`] if the estimator is neither a learner nor a transformer
/// - [`ConformanceError::MissingNotFitted`] if only the native estimator reports not-fitted
/// - [`ConformanceError::ErrorMismatch`] if the two errors differ
/// - [`ConformanceError::NativeSucceeded`] if the native call succeeds
/// - [`ConformanceError::NotWrapped`] if there is no native estimator to compare with
pub fn check_expected_not_fitted_error(
    estimator: &dyn EstimatorDF,
    config: &CheckerConfig,
) -> Result<(), ConformanceError> {
    if config.not_fitted_guarantee == NotFittedGuarantee::Waived {
        return Ok(());
    }

    let name = estimator.class_name();
    let x = probe_frame();

    let (call, result) = if let Some(learner) = estimator.as_learner() {
        (Call::Predict, learner.predict(&x).map(|_| ()))
    } else if let Some(transformer) = estimator.as_transformer() {
        (Call::Transform, transformer.transform(&x).map(|_| ()))
    } else {
        return Err(ConformanceError::UnsupportedEstimator(name.to_string()));
    };

    let wrapper_error = match result {
        Ok(()) => return Ok(()),
        Err(e) if e.is_not_fitted() => return Ok(()),
        Err(e) => e,
    };
    tracing::debug!(estimator = name, error = %wrapper_error, "comparing with native error");

    let native = estimator.native().ok_or_else(|| ConformanceError::NotWrapped {
        estimator: name.to_string(),
        wrapper: format!("{:?}", wrapper_error),
    })?;

    match call_native(native, call, &x) {
        Err(native_error) if native_error.is_not_fitted() => {
            Err(ConformanceError::MissingNotFitted(name.to_string()))
        }
        Err(native_error) => {
            let wrapper = format!("{:?}", wrapper_error);
            let native = format!("{:?}", native_error);
            if wrapper == native {
                Ok(())
            } else {
                Err(ConformanceError::ErrorMismatch {
                    estimator: name.to_string(),
                    wrapper,
                    native,
                })
            }
        }
        Ok(()) => Err(ConformanceError::NativeSucceeded {
            estimator: name.to_string(),
            wrapper: format!("{:?}", wrapper_error),
        }),
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.conformance")
        .with_class(ClassInfo::class::<CheckerConfig>("CheckerConfig"))
        .with_class(ClassInfo::class::<NotFittedGuarantee>("NotFittedGuarantee"))
        .with_function("check_expected_not_fitted_error")
}
