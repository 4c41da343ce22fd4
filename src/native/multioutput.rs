//! Multi-output meta-estimators.
//!
//! [`MultiOutputRegressor`] and [`MultiOutputClassifier`] fit one clone of the
//! base estimator per target column. The chains fit them in sequence, each
//! link seeing the input features plus the targets of the earlier links
//! (true values at fit, predictions at predict). Class labels enter a
//! [`ClassifierChain`] as their position among the sorted classes of that
//! output.

use crate::error::EstimatorError;
use crate::native::validation::{check_fit_input, check_is_fitted, check_predict_input};
use crate::native::{EstimatorKind, NativeEstimator, NativeType, Targets};
use ndarray::{concatenate, Array1, Array2, ArrayView2, ArrayViewD, Axis};

fn check_base(name: &str, base: &dyn NativeEstimator, kind: EstimatorKind) -> Result<(), EstimatorError> {
    if base.kind() != kind {
        return Err(EstimatorError::InvalidParameter(format!(
            "{} requires a {} as base estimator, got {} ({})",
            name,
            kind,
            base.name(),
            base.kind()
        )));
    }
    Ok(())
}

fn matrix_target<'a>(name: &str, y: Option<&'a Targets>) -> Result<&'a Array2<f64>, EstimatorError> {
    match y {
        Some(Targets::Matrix(m)) => Ok(m),
        _ => Err(EstimatorError::invalid_target(
            name,
            "a matrix of continuous values with one column per output",
        )),
    }
}

fn label_matrix_target<'a>(
    name: &str,
    y: Option<&'a Targets>,
) -> Result<&'a Array2<String>, EstimatorError> {
    match y {
        Some(Targets::LabelMatrix(m)) => Ok(m),
        _ => Err(EstimatorError::invalid_target(
            name,
            "a matrix of class labels with one column per output",
        )),
    }
}

/// Fitted per-output estimators plus the input width.
#[derive(Clone, Debug)]
struct FittedOutputs {
    estimators: Vec<Box<dyn NativeEstimator>>,
    n_features: usize,
}

fn predict_column(estimator: &dyn NativeEstimator, x: &ArrayView2<'_, f64>) -> Result<Targets, EstimatorError> {
    estimator.predict(x.view().into_dyn())
}

/// Fits one regressor per target column.
#[derive(Clone, Debug)]
pub struct MultiOutputRegressor {
    estimator: Box<dyn NativeEstimator>,
    fitted: Option<FittedOutputs>,
}

impl MultiOutputRegressor {
    pub fn new(estimator: Box<dyn NativeEstimator>) -> Self {
        Self {
            estimator,
            fitted: None,
        }
    }

    pub fn estimator(&self) -> &dyn NativeEstimator {
        self.estimator.as_ref()
    }

    /// One fitted estimator per output.
    pub fn estimators(&self) -> Option<&[Box<dyn NativeEstimator>]> {
        self.fitted.as_ref().map(|f| f.estimators.as_slice())
    }
}

impl NativeType for MultiOutputRegressor {
    const NAME: &'static str = "MultiOutputRegressor";

    fn unfitted(&self) -> Self {
        Self::new(self.estimator.clone())
    }
}

impl NativeEstimator for MultiOutputRegressor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Regressor
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_base(Self::NAME, self.estimator.as_ref(), EstimatorKind::Regressor)?;
        check_fit_input(Self::NAME, &x, y)?;
        let y = matrix_target(Self::NAME, y)?;

        let estimators = y
            .columns()
            .into_iter()
            .map(|column| {
                let mut estimator = self.estimator.clone_unfitted();
                estimator.fit(x.view(), Some(&Targets::Values(column.to_owned())))?;
                Ok(estimator)
            })
            .collect::<Result<Vec<_>, EstimatorError>>()?;

        tracing::debug!(estimator = Self::NAME, n_outputs = estimators.len(), "fitted");
        self.fitted = Some(FittedOutputs {
            estimators,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;
        let mut out = Array2::zeros((x.nrows(), fitted.estimators.len()));
        for (j, estimator) in fitted.estimators.iter().enumerate() {
            match predict_column(estimator.as_ref(), &x)? {
                Targets::Values(v) => out.column_mut(j).assign(&v),
                other => {
                    return Err(EstimatorError::invalid_target(Self::NAME, other.describe()));
                }
            }
        }
        Ok(Targets::Matrix(out))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Fits one classifier per target column.
#[derive(Clone, Debug)]
pub struct MultiOutputClassifier {
    estimator: Box<dyn NativeEstimator>,
    fitted: Option<FittedOutputs>,
}

impl MultiOutputClassifier {
    pub fn new(estimator: Box<dyn NativeEstimator>) -> Self {
        Self {
            estimator,
            fitted: None,
        }
    }

    pub fn estimator(&self) -> &dyn NativeEstimator {
        self.estimator.as_ref()
    }

    pub fn estimators(&self) -> Option<&[Box<dyn NativeEstimator>]> {
        self.fitted.as_ref().map(|f| f.estimators.as_slice())
    }

    /// Sorted class labels of each output.
    pub fn classes_per_output(&self) -> Option<Vec<Vec<String>>> {
        self.fitted.as_ref().map(|f| {
            f.estimators
                .iter()
                .map(|e| e.classes().map(<[String]>::to_vec).unwrap_or_default())
                .collect()
        })
    }
}

impl NativeType for MultiOutputClassifier {
    const NAME: &'static str = "MultiOutputClassifier";

    fn unfitted(&self) -> Self {
        Self::new(self.estimator.clone())
    }
}

impl NativeEstimator for MultiOutputClassifier {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Classifier
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_base(Self::NAME, self.estimator.as_ref(), EstimatorKind::Classifier)?;
        check_fit_input(Self::NAME, &x, y)?;
        let y = label_matrix_target(Self::NAME, y)?;

        let estimators = y
            .columns()
            .into_iter()
            .map(|column| {
                let mut estimator = self.estimator.clone_unfitted();
                estimator.fit(x.view(), Some(&Targets::Labels(column.to_owned())))?;
                Ok(estimator)
            })
            .collect::<Result<Vec<_>, EstimatorError>>()?;

        tracing::debug!(estimator = Self::NAME, n_outputs = estimators.len(), "fitted");
        self.fitted = Some(FittedOutputs {
            estimators,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;
        let mut out = Array2::from_elem((x.nrows(), fitted.estimators.len()), String::new());
        for (j, estimator) in fitted.estimators.iter().enumerate() {
            match predict_column(estimator.as_ref(), &x)? {
                Targets::Labels(v) => out.column_mut(j).assign(&v),
                other => {
                    return Err(EstimatorError::invalid_target(Self::NAME, other.describe()));
                }
            }
        }
        Ok(Targets::LabelMatrix(out))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Resolve a chain order against the number of outputs.
fn chain_order(name: &str, order: &Option<Vec<usize>>, n_outputs: usize) -> Result<Vec<usize>, EstimatorError> {
    match order {
        None => Ok((0..n_outputs).collect()),
        Some(order) => {
            let mut sorted = order.clone();
            sorted.sort_unstable();
            if sorted != (0..n_outputs).collect::<Vec<_>>() {
                return Err(EstimatorError::InvalidParameter(format!(
                    "{}: order must be a permutation of 0..{}, got {:?}",
                    name, n_outputs, order
                )));
            }
            Ok(order.clone())
        }
    }
}

/// Input features extended with one column.
fn extend_features(x: &Array2<f64>, column: &Array1<f64>) -> Result<Array2<f64>, EstimatorError> {
    concatenate(Axis(1), &[x.view(), column.view().insert_axis(Axis(1))]).map_err(|e| {
        EstimatorError::InvalidShape {
            expected: format!("{} rows", x.nrows()),
            got: e.to_string(),
        }
    })
}

#[derive(Clone, Debug)]
struct FittedChain {
    /// Links in chain order: (output column, estimator).
    links: Vec<(usize, Box<dyn NativeEstimator>)>,
    n_features: usize,
}

/// Regressors arranged in a chain.
#[derive(Clone, Debug)]
pub struct RegressorChain {
    base_estimator: Box<dyn NativeEstimator>,
    order: Option<Vec<usize>>,
    fitted: Option<FittedChain>,
}

impl RegressorChain {
    pub fn new(base_estimator: Box<dyn NativeEstimator>) -> Self {
        Self {
            base_estimator,
            order: None,
            fitted: None,
        }
    }

    /// Fit outputs in the given order instead of column order.
    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn base_estimator(&self) -> &dyn NativeEstimator {
        self.base_estimator.as_ref()
    }
}

impl NativeType for RegressorChain {
    const NAME: &'static str = "RegressorChain";

    fn unfitted(&self) -> Self {
        Self {
            base_estimator: self.base_estimator.clone(),
            order: self.order.clone(),
            fitted: None,
        }
    }
}

impl NativeEstimator for RegressorChain {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Regressor
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_base(Self::NAME, self.base_estimator.as_ref(), EstimatorKind::Regressor)?;
        check_fit_input(Self::NAME, &x, y)?;
        let y = matrix_target(Self::NAME, y)?;
        let order = chain_order(Self::NAME, &self.order, y.ncols())?;

        let mut features = x.to_owned();
        let mut links = Vec::with_capacity(order.len());
        for output in order {
            let target = y.column(output).to_owned();
            let mut estimator = self.base_estimator.clone_unfitted();
            estimator.fit(features.view(), Some(&Targets::Values(target.clone())))?;
            features = extend_features(&features, &target)?;
            links.push((output, estimator));
        }

        tracing::debug!(estimator = Self::NAME, n_links = links.len(), "fitted");
        self.fitted = Some(FittedChain {
            links,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;

        let mut features = x.to_owned();
        let mut out = Array2::zeros((x.nrows(), fitted.links.len()));
        for (output, estimator) in &fitted.links {
            let Targets::Values(pred) = predict_column(estimator.as_ref(), &features.view())? else {
                return Err(EstimatorError::invalid_target(Self::NAME, "continuous values"));
            };
            out.column_mut(*output).assign(&pred);
            features = extend_features(&features, &pred)?;
        }
        Ok(Targets::Matrix(out))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

#[derive(Clone, Debug)]
struct FittedClassifierChain {
    chain: FittedChain,
    /// Sorted classes of each output, in column order.
    classes: Vec<Vec<String>>,
}

/// Classifiers arranged in a chain.
#[derive(Clone, Debug)]
pub struct ClassifierChain {
    base_estimator: Box<dyn NativeEstimator>,
    order: Option<Vec<usize>>,
    fitted: Option<FittedClassifierChain>,
}

impl ClassifierChain {
    pub fn new(base_estimator: Box<dyn NativeEstimator>) -> Self {
        Self {
            base_estimator,
            order: None,
            fitted: None,
        }
    }

    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn base_estimator(&self) -> &dyn NativeEstimator {
        self.base_estimator.as_ref()
    }

    pub fn classes_per_output(&self) -> Option<&[Vec<String>]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }
}

/// Position of each label among the sorted classes, as a feature column.
fn class_positions(classes: &[String], labels: &Array1<String>) -> Array1<f64> {
    labels
        .iter()
        .map(|l| classes.binary_search(l).map_or(-1.0, |i| i as f64))
        .collect()
}

impl NativeType for ClassifierChain {
    const NAME: &'static str = "ClassifierChain";

    fn unfitted(&self) -> Self {
        Self {
            base_estimator: self.base_estimator.clone(),
            order: self.order.clone(),
            fitted: None,
        }
    }
}

impl NativeEstimator for ClassifierChain {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Classifier
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.chain.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_base(Self::NAME, self.base_estimator.as_ref(), EstimatorKind::Classifier)?;
        check_fit_input(Self::NAME, &x, y)?;
        let y = label_matrix_target(Self::NAME, y)?;
        let order = chain_order(Self::NAME, &self.order, y.ncols())?;

        let mut classes = vec![Vec::new(); y.ncols()];
        let mut features = x.to_owned();
        let mut links = Vec::with_capacity(order.len());
        for output in order {
            let labels = y.column(output).to_owned();
            let mut estimator = self.base_estimator.clone_unfitted();
            estimator.fit(features.view(), Some(&Targets::Labels(labels.clone())))?;
            let output_classes = estimator.classes().map(<[String]>::to_vec).unwrap_or_default();
            features = extend_features(&features, &class_positions(&output_classes, &labels))?;
            classes[output] = output_classes;
            links.push((output, estimator));
        }

        tracing::debug!(estimator = Self::NAME, n_links = links.len(), "fitted");
        self.fitted = Some(FittedClassifierChain {
            chain: FittedChain {
                links,
                n_features: x.ncols(),
            },
            classes,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;

        let mut features = x.to_owned();
        let mut out = Array2::from_elem((x.nrows(), fitted.chain.links.len()), String::new());
        for (output, estimator) in &fitted.chain.links {
            let Targets::Labels(pred) = predict_column(estimator.as_ref(), &features.view())? else {
                return Err(EstimatorError::invalid_target(Self::NAME, "class labels"));
            };
            let positions = class_positions(&fitted.classes[*output], &pred);
            out.column_mut(*output).assign(&pred);
            features = extend_features(&features, &positions)?;
        }
        Ok(Targets::LabelMatrix(out))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::linear_model::{LinearRegression, LogisticRegression};
    use crate::native::preprocessing::StandardScaler;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn two_outputs() -> (Array2<f64>, Array2<f64>) {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        // y0 = 2x + 1, y1 = -x
        let y = Array2::from_shape_fn((5, 2), |(i, j)| {
            if j == 0 {
                2.0 * i as f64 + 1.0
            } else {
                -(i as f64)
            }
        });
        (x, y)
    }

    #[test]
    fn test_multi_output_regressor() {
        let (x, y) = two_outputs();
        let mut model = MultiOutputRegressor::new(Box::new(LinearRegression::default()));
        model.fit(x.view(), Some(&Targets::Matrix(y.clone()))).unwrap();
        assert_eq!(model.estimators().unwrap().len(), 2);

        let Targets::Matrix(pred) = model.predict(x.view().into_dyn()).unwrap() else {
            panic!("expected a matrix");
        };
        for (p, t) in pred.iter().zip(y.iter()) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_multi_output_requires_matrix_target() {
        let (x, _) = two_outputs();
        let mut model = MultiOutputRegressor::new(Box::new(LinearRegression::default()));
        let y = Targets::Values(array![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(matches!(
            model.fit(x.view(), Some(&y)),
            Err(EstimatorError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_multi_output_rejects_transformer_base() {
        let (x, y) = two_outputs();
        let mut model = MultiOutputRegressor::new(Box::new(StandardScaler::default()));
        assert!(matches!(
            model.fit(x.view(), Some(&Targets::Matrix(y))),
            Err(EstimatorError::InvalidParameter(_))
        ));
    }

    fn label_outputs() -> (Array2<f64>, Array2<String>) {
        let x = array![[0.0], [0.2], [0.4], [3.0], [3.2], [3.4]];
        let y = Array2::from_shape_fn((6, 2), |(i, j)| match (i < 3, j) {
            (true, 0) => "small".to_string(),
            (false, 0) => "large".to_string(),
            (true, _) => "n".to_string(),
            (false, _) => "y".to_string(),
        });
        (x, y)
    }

    #[test]
    fn test_multi_output_classifier() {
        let (x, y) = label_outputs();
        let mut model = MultiOutputClassifier::new(Box::new(LogisticRegression::default()));
        model.fit(x.view(), Some(&Targets::LabelMatrix(y.clone()))).unwrap();
        assert_eq!(
            model.classes_per_output().unwrap()[0],
            vec!["large".to_string(), "small".to_string()]
        );
        assert_eq!(
            model.predict(x.view().into_dyn()).unwrap(),
            Targets::LabelMatrix(y)
        );
    }

    #[test]
    fn test_regressor_chain_with_order() {
        let (x, y) = two_outputs();
        let mut chain = RegressorChain::new(Box::new(LinearRegression::default())).with_order(vec![1, 0]);
        chain.fit(x.view(), Some(&Targets::Matrix(y.clone()))).unwrap();
        let Targets::Matrix(pred) = chain.predict(x.view().into_dyn()).unwrap() else {
            panic!("expected a matrix");
        };
        for (p, t) in pred.iter().zip(y.iter()) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_chain_rejects_bad_order() {
        let (x, y) = two_outputs();
        let mut chain = RegressorChain::new(Box::new(LinearRegression::default())).with_order(vec![0, 0]);
        assert!(matches!(
            chain.fit(x.view(), Some(&Targets::Matrix(y))),
            Err(EstimatorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_classifier_chain() {
        let (x, y) = label_outputs();
        let mut chain = ClassifierChain::new(Box::new(LogisticRegression::default()));
        chain.fit(x.view(), Some(&Targets::LabelMatrix(y.clone()))).unwrap();
        assert_eq!(chain.classes_per_output().unwrap()[1], vec!["n".to_string(), "y".to_string()]);
        assert_eq!(
            chain.predict(x.view().into_dyn()).unwrap(),
            Targets::LabelMatrix(y)
        );
    }

    #[test]
    fn test_chain_not_fitted() {
        let chain = ClassifierChain::new(Box::new(LogisticRegression::default()));
        let x = array![1.0, 2.0];
        assert!(chain.predict(x.view().into_dyn()).unwrap_err().is_not_fitted());
    }
}
