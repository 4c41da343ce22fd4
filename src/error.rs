//! Error types for estimators, the class registry and conformance checks.

use thiserror::Error;

/// Error type for estimator operations, both native and frame-aware.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    /// Prediction or transformation was attempted before `fit`.
    #[error(
        "This {estimator} instance is not fitted yet. Call 'fit' with appropriate arguments \
         before using this estimator."
    )]
    NotFitted { estimator: String },
    /// Shape mismatch between expected and actual array dimensions.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },
    /// Feature dimension mismatch.
    #[error(
        "Feature mismatch: {estimator} expected {expected_features} features, got {got_features}"
    )]
    FeatureMismatch {
        estimator: String,
        expected_features: usize,
        got_features: usize,
    },
    /// A meta-estimator was given a sub-estimator that is not a simple learner.
    #[error("meta-estimators only accept simple regressors and classifiers, but got: {0}")]
    UnsupportedMember(String),
    /// The estimator does not implement the requested operation.
    #[error("{estimator} does not support {operation}")]
    UnsupportedOperation {
        estimator: String,
        operation: &'static str,
    },
    /// The target passed to `fit` does not suit the estimator.
    #[error("Invalid target for {estimator}: expected {expected}")]
    InvalidTarget { estimator: String, expected: String },
    /// Invalid hyperparameter or argument value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// A named column is absent from the input frame.
    #[error("Missing column: {0}")]
    MissingColumn(String),
    /// Numerical computation error (singular system, non-finite values).
    #[error("Numerical error: {0}")]
    Numerical(String),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(String),
}

impl EstimatorError {
    pub(crate) fn not_fitted(estimator: &str) -> Self {
        EstimatorError::NotFitted {
            estimator: estimator.to_string(),
        }
    }

    pub(crate) fn unsupported(estimator: &str, operation: &'static str) -> Self {
        EstimatorError::UnsupportedOperation {
            estimator: estimator.to_string(),
            operation,
        }
    }

    pub(crate) fn invalid_target(estimator: &str, expected: &str) -> Self {
        EstimatorError::InvalidTarget {
            estimator: estimator.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Whether this is the not-fitted error kind.
    pub fn is_not_fitted(&self) -> bool {
        matches!(self, EstimatorError::NotFitted { .. })
    }
}

impl From<std::io::Error> for EstimatorError {
    fn from(err: std::io::Error) -> Self {
        EstimatorError::Io(err.to_string())
    }
}

impl From<bincode::Error> for EstimatorError {
    fn from(err: bincode::Error) -> Self {
        EstimatorError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for EstimatorError {
    fn from(err: csv::Error) -> Self {
        EstimatorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EstimatorError {
    fn from(err: serde_json::Error) -> Self {
        EstimatorError::Serialization(err.to_string())
    }
}

/// Error type for class registry lookups and queries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A class name pattern could not be compiled.
    #[error("invalid class name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    /// No wrapper class wraps the requested native class.
    #[error("there is no class that wraps '{native}' in {namespace}")]
    NotFound { native: String, namespace: String },
    /// Two wrapper classes in one namespace wrap the same native class.
    #[error("'{native}' is wrapped by both {first} and {second} in {namespace}")]
    DuplicateWrapper {
        native: String,
        first: String,
        second: String,
        namespace: String,
    },
}

/// Failure of a conformance check.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConformanceError {
    /// The estimator is neither a learner nor a transformer.
    #[error("estimator of unknown type: {0}")]
    UnsupportedEstimator(String),
    /// The wrapper swallowed a not-fitted error that the native estimator raises.
    #[error("{0} did not return an expected not-fitted error")]
    MissingNotFitted(String),
    /// Wrapper and native estimator raised different errors.
    #[error(
        "{estimator} raised a different error than its native estimator: \
         wrapper: {wrapper} \nnative: {native}"
    )]
    ErrorMismatch {
        estimator: String,
        wrapper: String,
        native: String,
    },
    /// The wrapper raised an error but the native estimator raised none.
    #[error("{estimator} raised {wrapper} but its native estimator raised no error")]
    NativeSucceeded { estimator: String, wrapper: String },
    /// The wrapper raised an error and has no native estimator to compare against.
    #[error("{estimator} raised {wrapper} and has no native estimator to compare against")]
    NotWrapped { estimator: String, wrapper: String },
}
