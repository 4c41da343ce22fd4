use crate::error::EstimatorError;
use crate::frame::Frame;
use crate::native::{EstimatorKind, NativeEstimator, NativeType};
use crate::wrapper::{EstimatorDF, Target, TransformerDF, Wrapper};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FittedTransformer<N> {
    native: N,
    feature_names_in: Vec<String>,
    feature_names_out: Vec<String>,
}

/// Frame-aware transformer delegating to a native transformer.
///
/// Output columns are named by the native estimator's `feature_names_out`
/// and the output keeps the input's row index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformerWrapperDF<N> {
    native: N,
    fitted: Option<FittedTransformer<N>>,
}

impl<N: NativeType> TransformerWrapperDF<N> {
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

    pub fn fitted_native(&self) -> Option<&N> {
        self.fitted.as_ref().map(|f| &f.native)
    }

    pub fn into_delegate(self) -> N {
        self.native
    }
}

impl<N: NativeType + Default> Default for TransformerWrapperDF<N> {
    fn default() -> Self {
        Self::new(N::default())
    }
}

impl<N> EstimatorDF for TransformerWrapperDF<N>
where
    Self: Wrapper<Native = N>,
    N: NativeType,
{
    fn class_name(&self) -> &'static str {
        <Self as Wrapper>::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Transformer
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.feature_names_in.as_slice())
    }

    fn fit(&mut self, x: &Frame, y: Option<&Target>) -> Result<(), EstimatorError> {
        self.fitted = None;
        let mut native = self.native.unfitted_for_columns(x.columns())?;
        let y = y.map(Target::to_native);
        native.fit(x.view(), y.as_ref())?;
        let feature_names_out = native.feature_names_out(x.columns())?;
        tracing::debug!(
            estimator = self.class_name(),
            n_features_in = x.n_cols(),
            n_features_out = feature_names_out.len(),
            "fitted"
        );

        self.fitted = Some(FittedTransformer {
            native,
            feature_names_in: x.columns().to_vec(),
            feature_names_out,
        });
        Ok(())
    }

    fn native(&self) -> Option<&dyn NativeEstimator> {
        match &self.fitted {
            Some(fitted) => Some(&fitted.native),
            None => Some(&self.native),
        }
    }

    fn as_transformer(&self) -> Option<&dyn TransformerDF> {
        Some(self)
    }

    fn clone_unfitted(&self) -> Box<dyn EstimatorDF> {
        Box::new(Self::new(self.native.unfitted()))
    }

    fn box_clone(&self) -> Box<dyn EstimatorDF> {
        Box::new(self.clone())
    }
}

impl<N> TransformerDF for TransformerWrapperDF<N>
where
    Self: Wrapper<Native = N>,
    N: NativeType,
{
    fn transform(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| EstimatorError::not_fitted(self.class_name()))?;
        let x_fit = x.select(&fitted.feature_names_in)?;
        let values = fitted.native.transform(x_fit.view().into_dyn())?;
        Frame::new(fitted.feature_names_out.iter().cloned(), values)?
            .with_index(x.index().clone())
    }

    fn feature_names_out(&self) -> Result<Vec<String>, EstimatorError> {
        self.fitted
            .as_ref()
            .map(|f| f.feature_names_out.clone())
            .ok_or_else(|| EstimatorError::not_fitted(self.class_name()))
    }
}

#[cfg(test)]
mod tests {
    use crate::frame::{Frame, Index};
    use crate::transformation::{SimpleImputerDF, StandardScalerDF};
    use crate::wrapper::{EstimatorDF, TransformerDF};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn create_test_frame() -> Frame {
        Frame::new(["a", "b"], array![[1.0, 10.0], [2.0, f64::NAN], [3.0, 30.0]])
            .unwrap()
            .with_index(Index::new(["x", "y", "z"]))
            .unwrap()
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScalerDF::default();
        let err = scaler.transform(&create_test_frame()).unwrap_err();
        assert!(err.is_not_fitted());
        assert!(scaler.feature_names_out().unwrap_err().is_not_fitted());
    }

    #[test]
    fn test_fit_transform_keeps_labels() {
        let x = create_test_frame();
        let mut imputer = SimpleImputerDF::default();
        let out = imputer.fit_transform(&x, None).unwrap();

        assert_eq!(out.columns(), &["a", "b"]);
        assert_eq!(out.index(), x.index());
        assert_abs_diff_eq!(out.values()[[1, 1]], 20.0, epsilon = 1e-12);
        assert_eq!(imputer.feature_names_in().unwrap(), &["a", "b"]);
    }

    #[test]
    fn test_transform_selects_fitted_columns() {
        let x = Frame::new(["a", "b"], array![[1.0, 5.0], [3.0, 5.0]]).unwrap();
        let mut scaler = StandardScalerDF::default();
        scaler.fit(&x, None).unwrap();

        let reordered = x.select(&["b", "a"]).unwrap();
        let out = scaler.transform(&reordered).unwrap();
        assert_eq!(out.columns(), &["a", "b"]);
        assert_abs_diff_eq!(out.values()[[0, 0]], -1.0, epsilon = 1e-12);
    }
}
