//! Native estimators over unlabeled `ndarray` arrays.
//!
//! This is the library the frame-aware wrappers delegate to. Native
//! estimators carry their fitted state at runtime: every `predict`,
//! `predict_proba` and `transform` first checks that `fit` has been called
//! and fails with [`EstimatorError::NotFitted`] otherwise, then validates that
//! the input is a 2-D array with the number of features seen during fit.
//!
//! # Core Traits
//!
//! - [`NativeEstimator`]: object-safe interface used by wrappers and meta-estimators
//! - [`NativeType`]: typed companion carrying the class name and an unfitted clone
//!
//! # Available Estimators
//!
//! | Module | Estimators |
//! |--------|------------|
//! | [`linear_model`] | `LinearRegression`, `Ridge`, `RidgeCV`, `ElasticNet`, `LogisticRegression`, `LogisticRegressionCV` |
//! | [`tree`] | `DecisionTreeRegressor`, `DecisionTreeClassifier` |
//! | [`ensemble`] | `RandomForestRegressor`, `RandomForestClassifier`, `VotingRegressor`, `VotingClassifier` |
//! | [`multioutput`] | `MultiOutputRegressor`, `MultiOutputClassifier`, `RegressorChain`, `ClassifierChain` |
//! | [`preprocessing`] | `StandardScaler`, `MinMaxScaler`, `SimpleImputer` |
//! | [`compose`] | `ColumnTransformer` |
//!
//! # Example
//!
//! ```rust
//! use learnframe::native::linear_model::LinearRegression;
//! use learnframe::native::{NativeEstimator, Targets};
//! use ndarray::array;
//!
//! let mut model = LinearRegression::default();
//! let x = array![[0.0], [1.0], [2.0]];
//! let y = Targets::Values(array![1.0, 3.0, 5.0]);
//!
//! // Predicting before fitting is an error
//! assert!(model.predict(x.view().into_dyn()).unwrap_err().is_not_fitted());
//!
//! model.fit(x.view(), Some(&y)).unwrap();
//! let pred = model.predict(x.view().into_dyn()).unwrap();
//! ```

pub mod compose;
pub mod ensemble;
pub mod linear_model;
pub(crate) mod linalg;
pub mod model_selection;
pub mod multioutput;
pub mod preprocessing;
pub mod tree;
pub(crate) mod validation;

use crate::error::EstimatorError;
use crate::registry::{ClassInfo, Namespace};
use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimatorKind {
    Regressor,
    Classifier,
    Transformer,
}

impl EstimatorKind {
    /// Regressors and classifiers are learners.
    pub fn is_learner(self) -> bool {
        matches!(self, EstimatorKind::Regressor | EstimatorKind::Classifier)
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Regressor => f.write_str("regressor"),
            EstimatorKind::Classifier => f.write_str("classifier"),
            EstimatorKind::Transformer => f.write_str("transformer"),
        }
    }
}

/// Targets passed to `fit`, and predictions returned by `predict`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Targets {
    /// One continuous output.
    Values(Array1<f64>),
    /// One categorical output.
    Labels(Array1<String>),
    /// Several continuous outputs, one per column.
    Matrix(Array2<f64>),
    /// Several categorical outputs, one per column.
    LabelMatrix(Array2<String>),
}

impl Targets {
    pub fn n_samples(&self) -> usize {
        match self {
            Targets::Values(v) => v.len(),
            Targets::Labels(v) => v.len(),
            Targets::Matrix(m) => m.nrows(),
            Targets::LabelMatrix(m) => m.nrows(),
        }
    }

    /// Number of outputs (columns); 1 for single-output targets.
    pub fn n_outputs(&self) -> usize {
        match self {
            Targets::Values(_) | Targets::Labels(_) => 1,
            Targets::Matrix(m) => m.ncols(),
            Targets::LabelMatrix(m) => m.ncols(),
        }
    }

    /// Rows at the given positions.
    pub fn take(&self, rows: &[usize]) -> Self {
        match self {
            Targets::Values(v) => Targets::Values(v.select(Axis(0), rows)),
            Targets::Labels(v) => Targets::Labels(v.select(Axis(0), rows)),
            Targets::Matrix(m) => Targets::Matrix(m.select(Axis(0), rows)),
            Targets::LabelMatrix(m) => Targets::LabelMatrix(m.select(Axis(0), rows)),
        }
    }

    /// Describes the variant for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Targets::Values(_) => "continuous values",
            Targets::Labels(_) => "class labels",
            Targets::Matrix(_) => "a matrix of continuous values",
            Targets::LabelMatrix(_) => "a matrix of class labels",
        }
    }
}

/// Object-safe interface of every native estimator.
///
/// Inputs to `fit` are 2-D; inputs to `predict`, `predict_proba` and
/// `transform` are dynamic-dimensional so that callers handing over a
/// flattened array receive the library's own shape error.
pub trait NativeEstimator: fmt::Debug + Send + Sync {
    /// Class name, e.g. `"LinearRegression"`.
    fn name(&self) -> &'static str;

    fn kind(&self) -> EstimatorKind;

    fn is_fitted(&self) -> bool;

    /// Number of features seen during fit.
    fn n_features_in(&self) -> Option<usize>;

    /// Fit the estimator. Transformers accept `None` as the target.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError>;

    fn predict(&self, _x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        Err(EstimatorError::unsupported(self.name(), "predict"))
    }

    /// Class probabilities, one column per entry of [`classes`](Self::classes).
    fn predict_proba(&self, _x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        Err(EstimatorError::unsupported(self.name(), "predict_proba"))
    }

    fn transform(&self, _x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        Err(EstimatorError::unsupported(self.name(), "transform"))
    }

    /// Sorted class labels seen during fit (classifiers only).
    fn classes(&self) -> Option<&[String]> {
        None
    }

    /// Output feature names of a transformer given its input feature names.
    ///
    /// The default suits transformers that map each input column to one
    /// output column.
    fn feature_names_out(&self, input_features: &[String]) -> Result<Vec<String>, EstimatorError> {
        if !self.is_fitted() {
            return Err(EstimatorError::not_fitted(self.name()));
        }
        Ok(input_features.to_vec())
    }

    /// A fresh, unfitted estimator with the same hyperparameters.
    fn clone_unfitted(&self) -> Box<dyn NativeEstimator>;

    fn box_clone(&self) -> Box<dyn NativeEstimator>;
}

impl Clone for Box<dyn NativeEstimator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Typed companion of [`NativeEstimator`].
pub trait NativeType: NativeEstimator + Clone + 'static {
    /// Class name reported by [`NativeEstimator::name`].
    const NAME: &'static str;

    /// A fresh, unfitted estimator with the same hyperparameters.
    fn unfitted(&self) -> Self;

    /// An unfitted estimator about to be fitted on columns with these names.
    ///
    /// Estimators that select their inputs by column name resolve the names
    /// to positions here; everything else ignores the names.
    fn unfitted_for_columns(&self, _columns: &[String]) -> Result<Self, EstimatorError> {
        Ok(self.unfitted())
    }
}

/// Named sub-estimators of a native meta-estimator.
pub type NamedEstimators = Vec<(String, Box<dyn NativeEstimator>)>;

/// Box an estimator under a member name.
pub fn named<N: NativeEstimator + 'static>(
    name: impl Into<String>,
    estimator: N,
) -> (String, Box<dyn NativeEstimator>) {
    (name.into(), Box::new(estimator))
}

/// Native classes, registered without wrapped classes.
pub fn namespace() -> Namespace {
    Namespace::new("learnframe.native")
        .with_class(ClassInfo::native::<linear_model::LinearRegression>())
        .with_class(ClassInfo::native::<linear_model::Ridge>())
        .with_class(ClassInfo::native::<linear_model::RidgeCV>())
        .with_class(ClassInfo::native::<linear_model::ElasticNet>())
        .with_class(ClassInfo::native::<linear_model::LogisticRegression>())
        .with_class(ClassInfo::native::<linear_model::LogisticRegressionCV>())
        .with_class(ClassInfo::native::<tree::DecisionTreeRegressor>())
        .with_class(ClassInfo::native::<tree::DecisionTreeClassifier>())
        .with_class(ClassInfo::native::<ensemble::RandomForestRegressor>())
        .with_class(ClassInfo::native::<ensemble::RandomForestClassifier>())
        .with_class(ClassInfo::native::<ensemble::VotingRegressor>())
        .with_class(ClassInfo::native::<ensemble::VotingClassifier>())
        .with_class(ClassInfo::native::<multioutput::MultiOutputRegressor>())
        .with_class(ClassInfo::native::<multioutput::MultiOutputClassifier>())
        .with_class(ClassInfo::native::<multioutput::RegressorChain>())
        .with_class(ClassInfo::native::<multioutput::ClassifierChain>())
        .with_class(ClassInfo::native::<preprocessing::StandardScaler>())
        .with_class(ClassInfo::native::<preprocessing::MinMaxScaler>())
        .with_class(ClassInfo::native::<preprocessing::SimpleImputer>())
        .with_class(ClassInfo::native::<compose::ColumnTransformer>())
        .with_class(ClassInfo::class::<model_selection::KFold>("KFold"))
        .with_class(ClassInfo::class::<model_selection::StratifiedKFold>("StratifiedKFold"))
        .with_function("named")
}
