use crate::error::EstimatorError;
use crate::frame::Frame;
use crate::native::{EstimatorKind, NativeEstimator, NativeType};
use crate::wrapper::{EstimatorDF, LearnerDF, Prediction, Target, TargetShape, Wrapper};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FittedLearner<N> {
    native: N,
    feature_names_in: Vec<String>,
    target: TargetShape,
}

/// Frame-aware regressor or classifier delegating to a native learner.
///
/// `fit` fits an unfitted copy of the configured native estimator on the
/// frame's values and records the column names and target names. `predict`
/// reorders the input columns to the fitted order before delegating and
/// labels the result with the input's row index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerWrapperDF<N> {
    native: N,
    fitted: Option<FittedLearner<N>>,
}

impl<N: NativeType> LearnerWrapperDF<N> {
    pub fn new(native: N) -> Self {
        Self {
            native,
            fitted: None,
        }
    }

    /// The configured (unfitted) native estimator.
    pub fn delegate(&self) -> &N {
        &self.native
    }

    /// The native estimator fitted by the last successful `fit`.
    pub fn fitted_native(&self) -> Option<&N> {
        self.fitted.as_ref().map(|f| &f.native)
    }

    pub fn into_delegate(self) -> N {
        self.native
    }

    /// Target names recorded at fit.
    pub fn target_shape(&self) -> Option<&TargetShape> {
        self.fitted.as_ref().map(|f| &f.target)
    }
}

impl<N: NativeType + Default> Default for LearnerWrapperDF<N> {
    fn default() -> Self {
        Self::new(N::default())
    }
}

impl<N> LearnerWrapperDF<N>
where
    Self: Wrapper<Native = N>,
    N: NativeType,
{
    fn fitted_state(&self) -> Result<&FittedLearner<N>, EstimatorError> {
        self.fitted
            .as_ref()
            .ok_or_else(|| EstimatorError::not_fitted(<Self as Wrapper>::NAME))
    }
}

impl<N> EstimatorDF for LearnerWrapperDF<N>
where
    Self: Wrapper<Native = N>,
    N: NativeType,
{
    fn class_name(&self) -> &'static str {
        <Self as Wrapper>::NAME
    }

    fn kind(&self) -> EstimatorKind {
        self.native.kind()
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.feature_names_in.as_slice())
    }

    fn fit(&mut self, x: &Frame, y: Option<&Target>) -> Result<(), EstimatorError> {
        let y = y.ok_or_else(|| {
            EstimatorError::invalid_target(self.class_name(), "a target for fitting")
        })?;
        if y.n_samples() != x.n_rows() {
            return Err(EstimatorError::InvalidShape {
                expected: format!("{} target rows", x.n_rows()),
                got: format!("{} target rows", y.n_samples()),
            });
        }

        self.fitted = None;
        let mut native = self.native.unfitted_for_columns(x.columns())?;
        native.fit(x.view(), Some(&y.to_native()))?;
        tracing::debug!(
            estimator = self.class_name(),
            n_samples = x.n_rows(),
            n_features = x.n_cols(),
            "fitted"
        );

        self.fitted = Some(FittedLearner {
            native,
            feature_names_in: x.columns().to_vec(),
            target: y.shape(),
        });
        Ok(())
    }

    fn native(&self) -> Option<&dyn NativeEstimator> {
        match &self.fitted {
            Some(fitted) => Some(&fitted.native),
            None => Some(&self.native),
        }
    }

    fn as_learner(&self) -> Option<&dyn LearnerDF> {
        Some(self)
    }

    fn clone_unfitted(&self) -> Box<dyn EstimatorDF> {
        Box::new(Self::new(self.native.unfitted()))
    }

    fn box_clone(&self) -> Box<dyn EstimatorDF> {
        Box::new(self.clone())
    }
}

impl<N> LearnerDF for LearnerWrapperDF<N>
where
    Self: Wrapper<Native = N>,
    N: NativeType,
{
    fn predict(&self, x: &Frame) -> Result<Prediction, EstimatorError> {
        let fitted = self.fitted_state()?;
        let x_fit = x.select(&fitted.feature_names_in)?;
        let y = fitted.native.predict(x_fit.view().into_dyn())?;
        Prediction::from_native(y, x.index(), &fitted.target)
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        let fitted = self.fitted_state()?;
        let x_fit = x.select(&fitted.feature_names_in)?;
        let proba = fitted.native.predict_proba(x_fit.view().into_dyn())?;
        let classes = fitted
            .native
            .classes()
            .ok_or_else(|| EstimatorError::unsupported(self.class_name(), "predict_proba"))?;
        Frame::new(classes.iter().cloned(), proba)?.with_index(x.index().clone())
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().and_then(|f| f.native.classes())
    }
}
