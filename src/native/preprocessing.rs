//! Scalers and imputers.
//!
//! - [`StandardScaler`]: `z = (x - u) / s` with the population standard deviation
//! - [`MinMaxScaler`]: maps each feature to `feature_range`
//! - [`SimpleImputer`]: replaces NaN with a per-column statistic
//!
//! Constant features keep a scale of 1 so that transforming them never
//! divides by zero.

use crate::error::EstimatorError;
use crate::native::validation::{check_fit_input, check_is_fitted, check_predict_input};
use crate::native::{EstimatorKind, NativeEstimator, NativeType, Targets};
use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerConfig {
    /// If true, center the data before scaling.
    pub with_mean: bool,
    /// If true, scale the data to unit variance.
    pub with_std: bool,
}

impl Default for StandardScalerConfig {
    fn default() -> Self {
        Self {
            with_mean: true,
            with_std: true,
        }
    }
}

/// Parameters of a fitted StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerParams {
    /// Mean of each feature (zeros if `with_mean` is false).
    pub mean: Array1<f64>,
    /// Scale of each feature (ones if `with_std` is false).
    pub scale: Array1<f64>,
    pub n_features: usize,
}

/// Standardizes features by removing the mean and scaling to unit variance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    config: StandardScalerConfig,
    fitted: Option<StandardScalerParams>,
}

impl StandardScaler {
    pub fn new(config: StandardScalerConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Set whether to center data by mean.
    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.config.with_mean = with_mean;
        self
    }

    /// Set whether to scale data to unit variance.
    pub fn with_std(mut self, with_std: bool) -> Self {
        self.config.with_std = with_std;
        self
    }

    pub fn config(&self) -> &StandardScalerConfig {
        &self.config
    }

    pub fn params(&self) -> Option<&StandardScalerParams> {
        self.fitted.as_ref()
    }

    /// Undo the scaling.
    pub fn inverse_transform(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let params = check_is_fitted(Self::NAME, &self.fitted)?;
        Ok(&x * &params.scale + &params.mean)
    }
}

impl NativeType for StandardScaler {
    const NAME: &'static str = "StandardScaler";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for StandardScaler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Transformer
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.fitted.as_ref().map(|p| p.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_fit_input(Self::NAME, &x, y)?;
        let cols = x.ncols();

        let mean = if self.config.with_mean {
            x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols))
        } else {
            Array1::zeros(cols)
        };
        let scale = if self.config.with_std {
            // Population std (ddof=0); constant features keep a scale of 1.
            x.std_axis(Axis(0), 0.0)
                .mapv(|s| if s == 0.0 { 1.0 } else { s })
        } else {
            Array1::ones(cols)
        };

        tracing::debug!(estimator = Self::NAME, n_features = cols, "fitted");
        self.fitted = Some(StandardScalerParams {
            mean,
            scale,
            n_features: cols,
        });
        Ok(())
    }

    fn transform(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let params = check_is_fitted(Self::NAME, &self.fitted)?;
        Ok((&x - &params.mean) / &params.scale)
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Configuration for MinMaxScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScalerConfig {
    /// Desired range of transformed data.
    pub feature_range: (f64, f64),
}

impl Default for MinMaxScalerConfig {
    fn default() -> Self {
        Self {
            feature_range: (0.0, 1.0),
        }
    }
}

/// Parameters of a fitted MinMaxScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScalerParams {
    pub data_min: Array1<f64>,
    pub data_max: Array1<f64>,
    /// Per-feature multiplier: `(max_range - min_range) / (data_max - data_min)`.
    pub scale: Array1<f64>,
    /// Per-feature offset: `min_range - data_min * scale`.
    pub min: Array1<f64>,
    pub n_features: usize,
}

/// Scales each feature to a given range.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    config: MinMaxScalerConfig,
    fitted: Option<MinMaxScalerParams>,
}

impl MinMaxScaler {
    pub fn new(config: MinMaxScalerConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn with_feature_range(mut self, min: f64, max: f64) -> Self {
        self.config.feature_range = (min, max);
        self
    }

    pub fn params(&self) -> Option<&MinMaxScalerParams> {
        self.fitted.as_ref()
    }
}

impl NativeType for MinMaxScaler {
    const NAME: &'static str = "MinMaxScaler";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for MinMaxScaler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Transformer
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.fitted.as_ref().map(|p| p.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_fit_input(Self::NAME, &x, y)?;
        let (range_min, range_max) = self.config.feature_range;
        if range_min >= range_max {
            return Err(EstimatorError::InvalidParameter(format!(
                "Minimum of desired feature range must be smaller than maximum, got ({}, {})",
                range_min, range_max
            )));
        }

        let data_min = x.fold_axis(Axis(0), f64::INFINITY, |&m, &v| m.min(v));
        let data_max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |&m, &v| m.max(v));
        let scale: Array1<f64> = data_min
            .iter()
            .zip(data_max.iter())
            .map(|(&lo, &hi)| {
                let range = hi - lo;
                if range == 0.0 {
                    1.0
                } else {
                    (range_max - range_min) / range
                }
            })
            .collect();
        let min = range_min - &data_min * &scale;

        self.fitted = Some(MinMaxScalerParams {
            data_min,
            data_max,
            scale,
            min,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn transform(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let params = check_is_fitted(Self::NAME, &self.fitted)?;
        Ok(&x * &params.scale + &params.min)
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Strategy for imputing missing values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace missing values with the mean of each column.
    #[default]
    Mean,
    /// Replace missing values with the median of each column.
    Median,
    /// Replace missing values with the most frequent value of each column.
    MostFrequent,
    /// Replace missing values with a constant value.
    Constant(f64),
}

/// Completes missing values (NaN) column by column.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
    statistics: Option<Array1<f64>>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            statistics: None,
        }
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    /// Fill value of each feature.
    pub fn statistics(&self) -> Option<&Array1<f64>> {
        self.statistics.as_ref()
    }
}

/// Fill value per column, ignoring NaN; all-missing columns get 0 unless
/// the strategy is a constant.
fn compute_statistics(x: &ArrayView2<'_, f64>, strategy: &ImputeStrategy) -> Array1<f64> {
    x.columns()
        .into_iter()
        .map(|column| {
            if let ImputeStrategy::Constant(value) = strategy {
                return *value;
            }
            let present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if present.is_empty() {
                return 0.0;
            }
            match strategy {
                ImputeStrategy::Mean => present.iter().sum::<f64>() / present.len() as f64,
                ImputeStrategy::Median => {
                    let mut sorted = present;
                    sorted.sort_by(f64::total_cmp);
                    let n = sorted.len();
                    if n % 2 == 0 {
                        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
                    } else {
                        sorted[n / 2]
                    }
                }
                ImputeStrategy::MostFrequent => {
                    let mut counts: HashMap<u64, usize> = HashMap::new();
                    for &v in &present {
                        *counts.entry(v.to_bits()).or_insert(0) += 1;
                    }
                    // Smallest value among the most frequent, for determinism.
                    counts
                        .into_iter()
                        .map(|(bits, count)| (count, f64::from_bits(bits)))
                        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.total_cmp(&a.1)))
                        .map(|(_, v)| v)
                        .unwrap_or(0.0)
                }
                ImputeStrategy::Constant(value) => *value,
            }
        })
        .collect()
}

impl NativeType for SimpleImputer {
    const NAME: &'static str = "SimpleImputer";

    fn unfitted(&self) -> Self {
        Self::new(self.strategy.clone())
    }
}

impl NativeEstimator for SimpleImputer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Transformer
    }

    fn is_fitted(&self) -> bool {
        self.statistics.is_some()
    }

    fn n_features_in(&self) -> Option<usize> {
        self.statistics.as_ref().map(Array1::len)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_fit_input(Self::NAME, &x, y)?;
        let statistics = compute_statistics(&x, &self.strategy);
        tracing::debug!(
            estimator = Self::NAME,
            strategy = ?self.strategy,
            n_features = x.ncols(),
            "fitted"
        );
        self.statistics = Some(statistics);
        Ok(())
    }

    fn transform(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.statistics, self.n_features_in(), x)?;
        let stats = check_is_fitted(Self::NAME, &self.statistics)?;
        let mut out = x.to_owned();
        for (mut column, &fill) in out.columns_mut().into_iter().zip(stats.iter()) {
            column.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        }
        Ok(out)
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
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn create_test_data() -> Array2<f64> {
        array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]
    }

    #[test]
    fn test_standard_scaler_basic() {
        let mut scaler = StandardScaler::default();
        let data = create_test_data();
        scaler.fit(data.view(), None).unwrap();

        let params = scaler.params().unwrap();
        assert_abs_diff_eq!(params.mean[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(params.mean[1], 20.0, epsilon = 1e-12);

        let scaled = scaler.transform(data.view().into_dyn()).unwrap();
        let col_mean = scaled.mean_axis(Axis(0)).unwrap();
        assert_abs_diff_eq!(col_mean[0], 0.0, epsilon = 1e-12);
        let col_std = scaled.std_axis(Axis(0), 0.0);
        assert_abs_diff_eq!(col_std[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_standard_scaler_constant_feature() {
        let mut scaler = StandardScaler::default();
        let data = array![[5.0], [5.0], [5.0]];
        scaler.fit(data.view(), None).unwrap();
        let scaled = scaler.transform(data.view().into_dyn()).unwrap();
        assert!(scaled.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_standard_scaler_without_mean() {
        let mut scaler = StandardScaler::default().with_mean(false);
        let data = create_test_data();
        scaler.fit(data.view(), None).unwrap();
        let restored = scaler
            .inverse_transform(scaler.transform(data.view().into_dyn()).unwrap().view().into_dyn())
            .unwrap();
        assert_abs_diff_eq!(restored[[2, 1]], 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_standard_scaler_not_fitted() {
        let scaler = StandardScaler::default();
        let data = create_test_data();
        let err = scaler.transform(data.view().into_dyn()).unwrap_err();
        assert!(err.is_not_fitted());
    }

    #[test]
    fn test_standard_scaler_feature_mismatch() {
        let mut scaler = StandardScaler::default();
        scaler.fit(create_test_data().view(), None).unwrap();
        let wrong = array![[1.0, 2.0, 3.0]];
        let err = scaler.transform(wrong.view().into_dyn()).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::FeatureMismatch {
                expected_features: 2,
                got_features: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_standard_scaler_empty_data() {
        let mut scaler = StandardScaler::default();
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            scaler.fit(empty.view(), None),
            Err(EstimatorError::EmptyData(_))
        ));
    }

    #[test]
    fn test_minmax_scaler_default_range() {
        let mut scaler = MinMaxScaler::default();
        let data = create_test_data();
        scaler.fit(data.view(), None).unwrap();
        let scaled = scaler.transform(data.view().into_dyn()).unwrap();
        assert_abs_diff_eq!(scaled[[0, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[[1, 1]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[[2, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_minmax_scaler_custom_range() {
        let mut scaler = MinMaxScaler::default().with_feature_range(-1.0, 1.0);
        let data = create_test_data();
        scaler.fit(data.view(), None).unwrap();
        let scaled = scaler.transform(data.view().into_dyn()).unwrap();
        assert_abs_diff_eq!(scaled[[0, 1]], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[[2, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_minmax_scaler_invalid_range() {
        let mut scaler = MinMaxScaler::default().with_feature_range(1.0, 0.0);
        assert!(matches!(
            scaler.fit(create_test_data().view(), None),
            Err(EstimatorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_imputer_mean() {
        let data = array![[1.0, f64::NAN], [f64::NAN, 4.0], [3.0, 6.0]];
        let mut imputer = SimpleImputer::new(ImputeStrategy::Mean);
        imputer.fit(data.view(), None).unwrap();
        let out = imputer.transform(data.view().into_dyn()).unwrap();
        assert_abs_diff_eq!(out[[1, 0]], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[[0, 1]], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_imputer_median_and_most_frequent() {
        let data = array![[1.0], [2.0], [2.0], [9.0], [f64::NAN]];

        let mut median = SimpleImputer::new(ImputeStrategy::Median);
        median.fit(data.view(), None).unwrap();
        assert_eq!(median.statistics().unwrap()[0], 2.0);

        let mut frequent = SimpleImputer::new(ImputeStrategy::MostFrequent);
        frequent.fit(data.view(), None).unwrap();
        assert_eq!(frequent.statistics().unwrap()[0], 2.0);
    }

    #[test]
    fn test_imputer_constant_and_all_missing() {
        let data = array![[f64::NAN, f64::NAN], [f64::NAN, 1.0]];
        let mut imputer = SimpleImputer::new(ImputeStrategy::Constant(-1.0));
        imputer.fit(data.view(), None).unwrap();
        let out = imputer.transform(data.view().into_dyn()).unwrap();
        assert_eq!(out, array![[-1.0, -1.0], [-1.0, 1.0]]);

        assert_eq!(imputer.statistics().unwrap(), &array![-1.0, -1.0]);

        let mut mean = SimpleImputer::default();
        mean.fit(data.view(), None).unwrap();
        assert_eq!(mean.statistics().unwrap()[0], 0.0);
    }

    #[test]
    fn test_transformers_reject_1d_input() {
        let mut scaler = MinMaxScaler::default();
        scaler.fit(create_test_data().view(), None).unwrap();
        let flat = array![1.0, 2.0];
        let err = scaler.transform(flat.view().into_dyn()).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidShape { .. }));
    }

    #[test]
    fn test_unfitted_clone_drops_state() {
        let mut scaler = StandardScaler::default().with_std(false);
        scaler.fit(create_test_data().view(), None).unwrap();
        let fresh = scaler.unfitted();
        assert!(!fresh.is_fitted());
        assert!(!fresh.config().with_std);
    }
}
