//! Frame-aware estimator traits and the generic wrappers over native estimators.
//!
//! A frame estimator takes a [`Frame`] and a [`Target`] and returns labeled
//! results: predictions keep the row index of the input and carry the target
//! names seen during `fit`, transformations carry output column names.
//!
//! # Core Traits
//!
//! - [`EstimatorDF`]: base of every frame estimator
//! - [`LearnerDF`]: regressors and classifiers (`predict`, `predict_proba`)
//! - [`TransformerDF`]: transformers (`transform`, `fit_transform`)
//! - [`Wrapper`]: capability of classes that delegate to exactly one native class
//!
//! The concrete wrapper classes are aliases of [`LearnerWrapperDF`] and
//! [`TransformerWrapperDF`] over a native estimator, declared in
//! [`regression`](crate::regression), [`classification`](crate::classification)
//! and [`transformation`](crate::transformation).

mod learner;
mod target;
mod transformer;

pub use learner::LearnerWrapperDF;
pub use target::{Prediction, Target, TargetShape};
pub use transformer::TransformerWrapperDF;

use crate::error::EstimatorError;
use crate::frame::Frame;
use crate::native::{EstimatorKind, NativeEstimator, NativeType};
use crate::registry::{ClassInfo, Namespace, NativeClass};
use std::fmt;

/// Base trait of every frame-aware estimator.
pub trait EstimatorDF: fmt::Debug + Send + Sync {
    /// Class name, e.g. `"RandomForestClassifierDF"`.
    fn class_name(&self) -> &'static str;

    fn kind(&self) -> EstimatorKind;

    fn is_fitted(&self) -> bool;

    /// Whether this estimator is built from other frame estimators
    /// (pipelines, stacking). Composites cannot be members of the
    /// meta-estimators that delegate to a native implementation.
    fn is_composite(&self) -> bool {
        false
    }

    /// Column names seen during fit, in fit order.
    fn feature_names_in(&self) -> Option<&[String]>;

    fn fit(&mut self, x: &Frame, y: Option<&Target>) -> Result<(), EstimatorError>;

    /// The native estimator this one delegates to, if any.
    fn native(&self) -> Option<&dyn NativeEstimator> {
        None
    }

    fn as_learner(&self) -> Option<&dyn LearnerDF> {
        None
    }

    fn as_transformer(&self) -> Option<&dyn TransformerDF> {
        None
    }

    /// A fresh, unfitted estimator with the same parameters.
    fn clone_unfitted(&self) -> Box<dyn EstimatorDF>;

    fn box_clone(&self) -> Box<dyn EstimatorDF>;
}

impl Clone for Box<dyn EstimatorDF> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A regressor or classifier.
pub trait LearnerDF: EstimatorDF {
    /// Predictions labeled with the input's row index and the target names.
    fn predict(&self, x: &Frame) -> Result<Prediction, EstimatorError>;

    /// Class probabilities with one column per class label.
    fn predict_proba(&self, _x: &Frame) -> Result<Frame, EstimatorError> {
        Err(EstimatorError::unsupported(self.class_name(), "predict_proba"))
    }

    /// Sorted class labels seen during fit (classifiers only).
    fn classes(&self) -> Option<&[String]> {
        None
    }
}

/// A transformer.
pub trait TransformerDF: EstimatorDF {
    fn transform(&self, x: &Frame) -> Result<Frame, EstimatorError>;

    /// Output column names of a fitted transformer.
    fn feature_names_out(&self) -> Result<Vec<String>, EstimatorError>;

    fn fit_transform(&mut self, x: &Frame, y: Option<&Target>) -> Result<Frame, EstimatorError> {
        self.fit(x, y)?;
        self.transform(x)
    }
}

/// Capability of a frame estimator that delegates to one native class.
///
/// Class discovery uses this trait to tell wrapper classes apart from other
/// classes and to map native classes to their wrappers.
pub trait Wrapper: 'static {
    /// Class name of the wrapper.
    const NAME: &'static str;

    type Native: NativeType;

    /// The native class this wrapper delegates to.
    fn wrapped_class() -> NativeClass {
        NativeClass::of::<Self::Native>()
    }

    /// The configured native estimator.
    fn native_estimator(&self) -> &Self::Native;
}

/// Declares a wrapper class as an alias of a generic wrapper over a native class.
macro_rules! df_wrapper {
    ($(#[$meta:meta])* $name:ident = $wrapper:ident<$native:ty>) => {
        $(#[$meta])*
        pub type $name = $crate::wrapper::$wrapper<$native>;

        impl $crate::wrapper::Wrapper for $crate::wrapper::$wrapper<$native> {
            const NAME: &'static str = stringify!($name);
            type Native = $native;

            fn native_estimator(&self) -> &$native {
                self.delegate()
            }
        }
    };
}

pub(crate) use df_wrapper;

/// Learner role of a composite estimator, fixed at the type level.
pub trait LearnerRole: fmt::Debug + Clone + Send + Sync + 'static {
    const KIND: EstimatorKind;
}

/// Marker for composites that regress.
#[derive(Clone, Copy, Debug)]
pub enum Regression {}

/// Marker for composites that classify.
#[derive(Clone, Copy, Debug)]
pub enum Classification {}

impl LearnerRole for Regression {
    const KIND: EstimatorKind = EstimatorKind::Regressor;
}

impl LearnerRole for Classification {
    const KIND: EstimatorKind = EstimatorKind::Classifier;
}

/// Box a frame estimator, e.g. for a pipeline step.
pub trait IntoEstimatorBox {
    fn boxed(self) -> Box<dyn EstimatorDF>;
}

impl<E: EstimatorDF + 'static> IntoEstimatorBox for E {
    fn boxed(self) -> Box<dyn EstimatorDF> {
        Box::new(self)
    }
}

/// A candidate member of a meta-estimator.
///
/// Meta-estimators that delegate to a native implementation accept simple
/// learners only: frame learners with a native delegate, or native
/// regressors and classifiers handed over directly.
#[derive(Clone, Debug)]
pub enum SubEstimator {
    Frame(Box<dyn EstimatorDF>),
    Native(Box<dyn NativeEstimator>),
}

impl SubEstimator {
    pub fn frame<E: EstimatorDF + 'static>(estimator: E) -> Self {
        SubEstimator::Frame(Box::new(estimator))
    }

    pub fn native<N: NativeEstimator + 'static>(estimator: N) -> Self {
        SubEstimator::Native(Box::new(estimator))
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            SubEstimator::Frame(e) => e.class_name(),
            SubEstimator::Native(n) => n.name(),
        }
    }
}

impl From<Box<dyn EstimatorDF>> for SubEstimator {
    fn from(estimator: Box<dyn EstimatorDF>) -> Self {
        SubEstimator::Frame(estimator)
    }
}

impl From<Box<dyn NativeEstimator>> for SubEstimator {
    fn from(estimator: Box<dyn NativeEstimator>) -> Self {
        SubEstimator::Native(estimator)
    }
}

/// The native estimator behind a simple frame learner.
///
/// # Errors
/// Returns [`EstimatorError::UnsupportedMember`] naming the class of anything
/// else: composites, transformers (frame or native) and frame estimators
/// without a native delegate.
pub(crate) fn ensure_simple_learner(
    member: &SubEstimator,
) -> Result<Box<dyn NativeEstimator>, EstimatorError> {
    let unsupported = || EstimatorError::UnsupportedMember(member.class_name().to_string());
    match member {
        SubEstimator::Native(native) if native.kind().is_learner() => {
            Ok(native.clone_unfitted())
        }
        SubEstimator::Native(_) => Err(unsupported()),
        SubEstimator::Frame(estimator) => {
            if estimator.is_composite() || !estimator.kind().is_learner() {
                return Err(unsupported());
            }
            estimator
                .native()
                .map(|native| native.clone_unfitted())
                .ok_or_else(unsupported)
        }
    }
}

/// Resolve named members, failing on the first one that is not a simple learner.
pub(crate) fn ensure_simple_learners<S: Into<String>>(
    members: Vec<(S, SubEstimator)>,
) -> Result<Vec<(String, Box<dyn NativeEstimator>)>, EstimatorError> {
    members
        .into_iter()
        .map(|(name, member)| Ok((name.into(), ensure_simple_learner(&member)?)))
        .collect()
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.wrapper")
        .with_class(ClassInfo::class::<SubEstimator>("SubEstimator"))
        .with_class(ClassInfo::class::<Target>("Target"))
        .with_class(ClassInfo::class::<TargetShape>("TargetShape"))
        .with_class(ClassInfo::class::<Regression>("Regression"))
        .with_class(ClassInfo::class::<Classification>("Classification"))
}
