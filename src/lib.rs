//! # learnframe
//!
//! Frame-aware estimators: wrappers around a native estimator library whose
//! inputs and outputs carry column names and row indices instead of unlabeled
//! arrays.
//!
//! ## Core Design Principles
//!
//! - **Labels In, Labels Out**: learners predict `Series` aligned to the input
//!   index and named after the target; transformers return frames with named
//!   output columns.
//! - **Delegation**: every `…DF` wrapper holds exactly one native estimator and
//!   fails exactly the way it does, including the not-fitted error before `fit`.
//! - **Simple Members Only**: voting, chain and multi-output meta-estimators
//!   accept simple frame learners and reject pipelines at construction.
//! - **Explicit Discovery**: every module lists its classes in a
//!   [`Namespace`](registry::Namespace); the registry maps native classes to
//!   their wrappers from those lists.
//!
//! ## Quick Start
//!
//! ```rust
//! use learnframe::datasets::{make_regression, SyntheticConfig};
//! use learnframe::regression::RidgeDF;
//! use learnframe::wrapper::{EstimatorDF, LearnerDF};
//!
//! let (x, y) = make_regression(&SyntheticConfig::default()).unwrap();
//!
//! let mut model = RidgeDF::default();
//! model.fit(&x, Some(&y.into())).unwrap();
//!
//! let prediction = model.predict(&x).unwrap();
//! let series = prediction.as_values().unwrap();
//! assert_eq!(series.name(), Some("target"));
//! assert_eq!(series.index(), x.index());
//! ```
//!
//! ## Module Structure
//!
//! - `frame`: `Frame`, `Series` and row `Index`
//! - `native`: the native estimators over `ndarray` arrays
//! - `wrapper`: estimator traits and the generic learner/transformer wrappers
//! - `regression`, `classification`, `transformation`: the concrete `…DF` classes
//! - `pipeline`, `stacking`: composite frame estimators
//! - `registry`: namespaces, class discovery and wrapper lookup
//! - `conformance`: the not-fitted conformance check
//! - `datasets`: seeded synthetic data
//! - `serialization`: bincode persistence

/// Classifiers on labeled frames.
pub mod classification;

/// Checks that wrappers fail like their native estimators.
pub mod conformance;

/// Seeded synthetic datasets.
pub mod datasets;

pub mod error;

/// Labeled tables and series.
pub mod frame;

/// The native estimator library.
pub mod native;

/// Sequential and learner pipelines.
pub mod pipeline;

/// Class discovery over explicit namespaces.
pub mod registry;

/// Regressors on labeled frames.
pub mod regression;

/// Model persistence.
pub mod serialization;

/// Stacked generalization over frame learners.
pub mod stacking;

/// Transformers on labeled frames.
pub mod transformation;

/// Estimator traits and generic wrappers.
pub mod wrapper;

pub use error::{ConformanceError, EstimatorError, RegistryError};
pub use frame::{Frame, Index, Series};
pub use wrapper::{EstimatorDF, LearnerDF, Prediction, Target, TransformerDF};

use registry::{ClassInfo, Namespace};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate root and its re-exports.
pub fn namespace() -> Namespace {
    Namespace::new("learnframe")
        .with_class(ClassInfo::class::<Frame>("Frame"))
        .with_class(ClassInfo::class::<Series>("Series"))
        .with_class(ClassInfo::class::<Index>("Index"))
        .with_class(ClassInfo::class::<Target>("Target"))
        .with_class(ClassInfo::class::<EstimatorError>("EstimatorError"))
        .with_class(ClassInfo::class::<RegistryError>("RegistryError"))
        .with_class(ClassInfo::class::<ConformanceError>("ConformanceError"))
        .with_constant("VERSION")
}
