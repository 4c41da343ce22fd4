//! Linear models.
//!
//! Regressors solve (regularized) least squares on centered data; the
//! classifiers fit a multinomial logistic model with Newton steps.

use crate::error::EstimatorError;
use crate::native::linalg::{inverse, solve_vec};
use crate::native::model_selection::StratifiedKFold;
use crate::native::validation::{
    argmax_rows, check_finite, check_fit_input, check_is_fitted, check_predict_input,
    encode_labels, labels_target, values_target,
};
use crate::native::{EstimatorKind, NativeEstimator, NativeType, Targets};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};

/// Fitted coefficients of a single-output linear regressor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub coef: Array1<f64>,
    pub intercept: f64,
}

impl LinearParams {
    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn decision(&self, x: &ArrayView2<'_, f64>) -> Array1<f64> {
        x.dot(&self.coef) + self.intercept
    }
}

/// Centered copies of `x` and `y` with the means that were removed.
struct Centered {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Array1<f64>,
    y_mean: f64,
}

fn center(x: &ArrayView2<'_, f64>, y: &ArrayView1<'_, f64>, fit_intercept: bool) -> Centered {
    if !fit_intercept {
        return Centered {
            x: x.to_owned(),
            y: y.to_owned(),
            x_mean: Array1::zeros(x.ncols()),
            y_mean: 0.0,
        };
    }
    let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    Centered {
        x: x - &x_mean,
        y: y - y_mean,
        x_mean,
        y_mean,
    }
}

impl Centered {
    fn into_params(self, coef: Array1<f64>) -> LinearParams {
        let intercept = self.y_mean - self.x_mean.dot(&coef);
        LinearParams { coef, intercept }
    }
}

/// Solve `(XᵀX + alpha·I) w = Xᵀy`.
fn ridge_solve(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>, EstimatorError> {
    let mut gram = x.t().dot(x);
    gram.diag_mut().mapv_inplace(|d| d + alpha);
    solve_vec(&gram, &x.t().dot(y))
}

fn regression_predict(
    name: &str,
    params: Option<&LinearParams>,
    x: ArrayViewD<'_, f64>,
) -> Result<Targets, EstimatorError> {
    let x = check_predict_input(name, &params, params.map(LinearParams::n_features), x)?;
    let params = check_is_fitted(name, &params)?;
    Ok(Targets::Values(params.decision(&x)))
}

/// Validated regression inputs for `fit`.
fn regression_inputs<'a>(
    name: &str,
    x: &ArrayView2<'_, f64>,
    y: Option<&'a Targets>,
) -> Result<ArrayView1<'a, f64>, EstimatorError> {
    check_fit_input(name, x, y)?;
    check_finite(name, x)?;
    values_target(name, y)
}

/// Ordinary least squares.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearRegression {
    fit_intercept: bool,
    fitted: Option<LinearParams>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinearRegression {
    pub fn new(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            fitted: None,
        }
    }

    pub fn params(&self) -> Option<&LinearParams> {
        self.fitted.as_ref()
    }
}

impl NativeType for LinearRegression {
    const NAME: &'static str = "LinearRegression";

    fn unfitted(&self) -> Self {
        Self::new(self.fit_intercept)
    }
}

impl NativeEstimator for LinearRegression {
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
        self.fitted.as_ref().map(LinearParams::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        let y = regression_inputs(Self::NAME, &x, y)?;
        let data = center(&x, &y, self.fit_intercept);

        let coef = match ridge_solve(&data.x, &data.y, 0.0) {
            Ok(coef) => coef,
            Err(EstimatorError::Numerical(_)) => {
                // Rank-deficient design: fall back to a minimal ridge.
                let trace: f64 = data.x.iter().map(|v| v * v).sum();
                let jitter = 1e-10 * trace.max(1.0);
                tracing::debug!(estimator = Self::NAME, jitter, "singular design matrix");
                ridge_solve(&data.x, &data.y, jitter)?
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(estimator = Self::NAME, n_samples = x.nrows(), "fitted");
        self.fitted = Some(data.into_params(coef));
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        regression_predict(Self::NAME, self.fitted.as_ref(), x)
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Configuration for Ridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    /// L2 regularization strength.
    pub alpha: f64,
    pub fit_intercept: bool,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
        }
    }
}

/// Least squares with an L2 penalty.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ridge {
    config: RidgeConfig,
    fitted: Option<LinearParams>,
}

impl Ridge {
    pub fn new(config: RidgeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    pub fn config(&self) -> &RidgeConfig {
        &self.config
    }

    pub fn params(&self) -> Option<&LinearParams> {
        self.fitted.as_ref()
    }
}

impl NativeType for Ridge {
    const NAME: &'static str = "Ridge";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for Ridge {
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
        self.fitted.as_ref().map(LinearParams::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        if self.config.alpha < 0.0 {
            return Err(EstimatorError::InvalidParameter(format!(
                "alpha must be non-negative, got {}",
                self.config.alpha
            )));
        }
        let y = regression_inputs(Self::NAME, &x, y)?;
        let data = center(&x, &y, self.config.fit_intercept);
        let coef = ridge_solve(&data.x, &data.y, self.config.alpha)?;
        self.fitted = Some(data.into_params(coef));
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        regression_predict(Self::NAME, self.fitted.as_ref(), x)
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Configuration for RidgeCV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RidgeCVConfig {
    /// Candidate regularization strengths.
    pub alphas: Vec<f64>,
    pub fit_intercept: bool,
}

impl Default for RidgeCVConfig {
    fn default() -> Self {
        Self {
            alphas: vec![0.1, 1.0, 10.0],
            fit_intercept: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct RidgeCVFit {
    params: LinearParams,
    alpha: f64,
}

/// Ridge with the penalty chosen by efficient leave-one-out cross-validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RidgeCV {
    config: RidgeCVConfig,
    fitted: Option<RidgeCVFit>,
}

impl RidgeCV {
    pub fn new(config: RidgeCVConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn with_alphas(mut self, alphas: Vec<f64>) -> Self {
        self.config.alphas = alphas;
        self
    }

    /// The selected penalty.
    pub fn alpha(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.alpha)
    }

    pub fn params(&self) -> Option<&LinearParams> {
        self.fitted.as_ref().map(|f| &f.params)
    }

    /// Mean squared leave-one-out error for one alpha, from the hat diagonal.
    fn loo_error(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<f64, EstimatorError> {
        let mut gram = x.t().dot(x);
        gram.diag_mut().mapv_inplace(|d| d + alpha);
        let gram_inv = inverse(&gram)?;
        let coef = gram_inv.dot(&x.t().dot(y));
        let hat_diag = (x.dot(&gram_inv) * x).sum_axis(Axis(1));
        let residuals = y - &x.dot(&coef);
        let n = y.len() as f64;
        Ok(residuals
            .iter()
            .zip(hat_diag.iter())
            .map(|(r, h)| {
                let loo = r / (1.0 - h).max(1e-12);
                loo * loo
            })
            .sum::<f64>()
            / n)
    }
}

impl NativeType for RidgeCV {
    const NAME: &'static str = "RidgeCV";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for RidgeCV {
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
        self.params().map(LinearParams::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        if self.config.alphas.is_empty() || self.config.alphas.iter().any(|&a| a <= 0.0) {
            return Err(EstimatorError::InvalidParameter(
                "alphas must be a non-empty list of positive values".to_string(),
            ));
        }
        let y = regression_inputs(Self::NAME, &x, y)?;
        let data = center(&x, &y, self.config.fit_intercept);

        let mut best: Option<(f64, f64)> = None;
        for &alpha in &self.config.alphas {
            let error = Self::loo_error(&data.x, &data.y, alpha)?;
            if best.map_or(true, |(_, e)| error < e) {
                best = Some((alpha, error));
            }
        }
        let (alpha, error) = best.unwrap_or((self.config.alphas[0], f64::NAN));
        tracing::debug!(estimator = Self::NAME, alpha, loo_mse = error, "selected alpha");

        let coef = ridge_solve(&data.x, &data.y, alpha)?;
        self.fitted = Some(RidgeCVFit {
            params: data.into_params(coef),
            alpha,
        });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        regression_predict(Self::NAME, self.params(), x)
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Configuration for ElasticNet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetConfig {
    /// Overall penalty strength.
    pub alpha: f64,
    /// Mix between L1 (1.0) and L2 (0.0).
    pub l1_ratio: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    /// Stop when the largest coefficient update falls below this.
    pub tol: f64,
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
            fit_intercept: true,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

/// Linear regression with combined L1 and L2 priors, fitted by coordinate descent.
///
/// Minimizes `1/(2n)·‖y - Xw‖² + alpha·l1_ratio·‖w‖₁ + alpha·(1 - l1_ratio)/2·‖w‖²`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElasticNet {
    config: ElasticNetConfig,
    fitted: Option<LinearParams>,
    n_iter: Option<usize>,
}

impl ElasticNet {
    pub fn new(config: ElasticNetConfig) -> Self {
        Self {
            config,
            fitted: None,
            n_iter: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.config.l1_ratio = l1_ratio;
        self
    }

    pub fn params(&self) -> Option<&LinearParams> {
        self.fitted.as_ref()
    }

    /// Coordinate descent passes used by the last fit.
    pub fn n_iter(&self) -> Option<usize> {
        self.n_iter
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl NativeType for ElasticNet {
    const NAME: &'static str = "ElasticNet";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for ElasticNet {
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
        self.fitted.as_ref().map(LinearParams::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        let cfg = &self.config;
        if !(0.0..=1.0).contains(&cfg.l1_ratio) || cfg.alpha < 0.0 {
            return Err(EstimatorError::InvalidParameter(format!(
                "ElasticNet requires alpha >= 0 and 0 <= l1_ratio <= 1, got alpha={} l1_ratio={}",
                cfg.alpha, cfg.l1_ratio
            )));
        }
        let y = regression_inputs(Self::NAME, &x, y)?;
        let data = center(&x, &y, cfg.fit_intercept);
        let n = data.x.nrows() as f64;
        let p = data.x.ncols();

        let l1 = cfg.alpha * cfg.l1_ratio;
        let l2 = cfg.alpha * (1.0 - cfg.l1_ratio);
        let col_sq: Vec<f64> = data
            .x
            .columns()
            .into_iter()
            .map(|c| c.dot(&c) / n)
            .collect();

        let mut coef = Array1::<f64>::zeros(p);
        let mut residual = data.y.clone();
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..cfg.max_iter {
            iterations = iter + 1;
            let mut max_update = 0.0f64;
            let mut max_coef = 0.0f64;
            for j in 0..p {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let column = data.x.column(j);
                let old = coef[j];
                let rho = column.dot(&residual) / n + col_sq[j] * old;
                let new = soft_threshold(rho, l1) / (col_sq[j] + l2);
                if new != old {
                    residual.scaled_add(old - new, &column);
                    coef[j] = new;
                }
                max_update = max_update.max((new - old).abs());
                max_coef = max_coef.max(new.abs());
            }
            if max_update <= cfg.tol * max_coef.max(1e-12) || max_coef == 0.0 {
                converged = true;
                break;
            }
        }
        if !converged {
            tracing::warn!(
                estimator = Self::NAME,
                max_iter = cfg.max_iter,
                "coordinate descent did not converge; consider increasing max_iter"
            );
        }

        self.n_iter = Some(iterations);
        self.fitted = Some(data.into_params(coef));
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        regression_predict(Self::NAME, self.fitted.as_ref(), x)
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Configuration for LogisticRegression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionConfig {
    /// Inverse of regularization strength.
    pub c: f64,
    pub fit_intercept: bool,
    pub max_iter: usize,
    /// Stop when the gradient norm falls below this.
    pub tol: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            fit_intercept: true,
            max_iter: 100,
            tol: 1e-6,
        }
    }
}

/// Fitted multinomial logistic model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub classes: Vec<String>,
    /// One column per class.
    pub coef: Array2<f64>,
    pub intercept: Array1<f64>,
}

impl LogisticParams {
    fn n_features(&self) -> usize {
        self.coef.nrows()
    }

    fn proba(&self, x: &ArrayView2<'_, f64>) -> Array2<f64> {
        softmax(x.dot(&self.coef) + &self.intercept)
    }
}

fn softmax(mut scores: Array2<f64>) -> Array2<f64> {
    for mut row in scores.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    scores
}

/// Penalized multinomial negative log-likelihood.
fn logistic_objective(
    design: &Array2<f64>,
    onehot: &Array2<f64>,
    weights: &Array2<f64>,
    penalty: &Array1<f64>,
) -> f64 {
    let proba = softmax(design.dot(weights));
    let nll: f64 = proba
        .iter()
        .zip(onehot.iter())
        .filter(|&(_, &t)| t > 0.0)
        .map(|(&p, _)| -p.max(1e-300).ln())
        .sum();
    let reg: f64 = weights
        .rows()
        .into_iter()
        .zip(penalty.iter())
        .map(|(row, &lambda)| 0.5 * lambda * row.dot(&row))
        .sum();
    nll + reg
}

/// Newton's method with backtracking on the multinomial logistic loss.
///
/// Returns the fitted parameters and whether the gradient tolerance was met.
fn fit_logistic(
    x: &ArrayView2<'_, f64>,
    codes: &[usize],
    classes: Vec<String>,
    config: &LogisticRegressionConfig,
) -> Result<(LogisticParams, bool), EstimatorError> {
    let (n, p) = x.dim();
    let k = classes.len();
    let d = p + 1;

    // Append a bias column; its penalty is a tiny ridge keeping the
    // over-parameterized softmax Hessian invertible.
    let mut design = Array2::<f64>::zeros((n, d));
    design.slice_mut(s![.., ..p]).assign(x);
    if config.fit_intercept {
        design.column_mut(p).fill(1.0);
    }
    let mut penalty = Array1::from_elem(d, 1.0 / config.c);
    penalty[p] = 1e-6;

    let mut onehot = Array2::<f64>::zeros((n, k));
    for (i, &code) in codes.iter().enumerate() {
        onehot[[i, code]] = 1.0;
    }

    let mut weights = Array2::<f64>::zeros((d, k));
    let mut objective = logistic_objective(&design, &onehot, &weights, &penalty);
    let mut converged = false;

    for _ in 0..config.max_iter {
        let proba = softmax(design.dot(&weights));
        let mut grad = design.t().dot(&(&proba - &onehot));
        grad += &(&weights * &penalty.view().insert_axis(Axis(1)));

        let grad_norm = grad.iter().fold(0.0f64, |m, g| m.max(g.abs()));
        if grad_norm < config.tol {
            converged = true;
            break;
        }

        // Hessian in class-major block layout: block (a, b) is d × d.
        let mut hessian = Array2::<f64>::zeros((d * k, d * k));
        for a in 0..k {
            for b in a..k {
                let w: Array1<f64> = proba
                    .column(a)
                    .iter()
                    .zip(proba.column(b).iter())
                    .map(|(&pa, &pb)| if a == b { pa * (1.0 - pa) } else { -pa * pb })
                    .collect();
                let weighted = &design * &w.view().insert_axis(Axis(1));
                let mut block = design.t().dot(&weighted);
                if a == b {
                    for (i, &lambda) in penalty.iter().enumerate() {
                        block[[i, i]] += lambda;
                    }
                }
                hessian
                    .slice_mut(s![a * d..(a + 1) * d, b * d..(b + 1) * d])
                    .assign(&block);
                if a != b {
                    hessian
                        .slice_mut(s![b * d..(b + 1) * d, a * d..(a + 1) * d])
                        .assign(&block.t());
                }
            }
        }

        let flat_grad: Array1<f64> = (0..k)
            .flat_map(|a| grad.column(a).to_vec())
            .collect();
        let step = solve_vec(&hessian, &flat_grad)?;
        let mut direction = Array2::<f64>::zeros((d, k));
        for a in 0..k {
            direction
                .column_mut(a)
                .assign(&step.slice(s![a * d..(a + 1) * d]));
        }

        let mut t = 1.0;
        let mut improved = false;
        for _ in 0..30 {
            let candidate = &weights - &(&direction * t);
            let value = logistic_objective(&design, &onehot, &candidate, &penalty);
            if value <= objective {
                weights = candidate;
                objective = value;
                improved = true;
                break;
            }
            t *= 0.5;
        }
        if !improved {
            // No descent along the Newton direction: at numerical optimum.
            converged = true;
            break;
        }
    }

    let coef = weights.slice(s![..p, ..]).to_owned();
    let intercept = weights.row(p).to_owned();
    Ok((
        LogisticParams {
            classes,
            coef,
            intercept,
        },
        converged,
    ))
}

fn classification_inputs(
    name: &str,
    x: &ArrayView2<'_, f64>,
    y: Option<&Targets>,
) -> Result<(Vec<String>, Vec<usize>), EstimatorError> {
    check_fit_input(name, x, y)?;
    check_finite(name, x)?;
    let labels = labels_target(name, y)?;
    let (classes, codes) = encode_labels(labels);
    if classes.len() < 2 {
        return Err(EstimatorError::InvalidParameter(format!(
            "{} needs samples of at least 2 classes in the data, but the data contains only one class: {:?}",
            name,
            classes.first().map(String::as_str).unwrap_or("")
        )));
    }
    Ok((classes, codes))
}

fn logistic_proba(
    name: &str,
    fitted: Option<&LogisticParams>,
    x: ArrayViewD<'_, f64>,
) -> Result<Array2<f64>, EstimatorError> {
    let x = check_predict_input(name, &fitted, fitted.map(LogisticParams::n_features), x)?;
    let params = check_is_fitted(name, &fitted)?;
    Ok(params.proba(&x))
}

fn logistic_predict(
    name: &str,
    fitted: Option<&LogisticParams>,
    x: ArrayViewD<'_, f64>,
) -> Result<Targets, EstimatorError> {
    let proba = logistic_proba(name, fitted, x)?;
    let params = check_is_fitted(name, &fitted)?;
    Ok(Targets::Labels(
        argmax_rows(&proba)
            .into_iter()
            .map(|i| params.classes[i].clone())
            .collect(),
    ))
}

/// Multinomial logistic regression with an L2 penalty.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    fitted: Option<LogisticParams>,
}

impl LogisticRegression {
    pub fn new(config: LogisticRegressionConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn params(&self) -> Option<&LogisticParams> {
        self.fitted.as_ref()
    }
}

impl NativeType for LogisticRegression {
    const NAME: &'static str = "LogisticRegression";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for LogisticRegression {
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
        self.fitted.as_ref().map(LogisticParams::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        if self.config.c <= 0.0 {
            return Err(EstimatorError::InvalidParameter(format!(
                "Penalty term must be positive; got (C={})",
                self.config.c
            )));
        }
        let (classes, codes) = classification_inputs(Self::NAME, &x, y)?;
        let (params, converged) = fit_logistic(&x, &codes, classes, &self.config)?;
        if !converged {
            tracing::warn!(
                estimator = Self::NAME,
                max_iter = self.config.max_iter,
                "Newton solver failed to converge; increase max_iter or scale the data"
            );
        }
        self.fitted = Some(params);
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        logistic_predict(Self::NAME, self.fitted.as_ref(), x)
    }

    fn predict_proba(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        logistic_proba(Self::NAME, self.fitted.as_ref(), x)
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|p| p.classes.as_slice())
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// `n` values evenly spaced on a log10 scale from `10^start` to `10^stop`.
pub fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![10f64.powf(start)];
    }
    (0..n)
        .map(|i| 10f64.powf(start + (stop - start) * i as f64 / (n - 1) as f64))
        .collect()
}

/// Configuration for LogisticRegressionCV.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionCVConfig {
    /// Candidate inverse regularization strengths.
    pub cs: Vec<f64>,
    /// Number of stratified folds.
    pub cv: usize,
    /// Solver settings shared by every candidate.
    pub base: LogisticRegressionConfig,
}

impl Default for LogisticRegressionCVConfig {
    fn default() -> Self {
        Self {
            cs: logspace(-4.0, 4.0, 10),
            cv: 5,
            base: LogisticRegressionConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct LogisticCVFit {
    params: LogisticParams,
    c: f64,
}

/// Logistic regression with `C` chosen by stratified k-fold accuracy.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogisticRegressionCV {
    config: LogisticRegressionCVConfig,
    fitted: Option<LogisticCVFit>,
}

impl LogisticRegressionCV {
    pub fn new(config: LogisticRegressionCVConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn with_cs(mut self, cs: Vec<f64>) -> Self {
        self.config.cs = cs;
        self
    }

    pub fn with_cv(mut self, cv: usize) -> Self {
        self.config.cv = cv;
        self
    }

    /// The selected inverse regularization strength.
    pub fn c(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.c)
    }

    fn cv_accuracy(
        &self,
        x: &ArrayView2<'_, f64>,
        codes: &[usize],
        classes: &[String],
        c: f64,
    ) -> Result<f64, EstimatorError> {
        let config = LogisticRegressionConfig {
            c,
            ..self.config.base.clone()
        };
        let folds = StratifiedKFold::new(self.config.cv).split(codes)?;
        let mut correct = 0usize;
        let mut total = 0usize;
        for (train, test) in folds {
            let x_train = x.select(Axis(0), &train);
            let train_codes: Vec<usize> = train.iter().map(|&i| codes[i]).collect();
            // Keep the full class list so codes stay aligned across folds.
            let (params, _) = fit_logistic(&x_train.view(), &train_codes, classes.to_vec(), &config)?;
            let proba = params.proba(&x.select(Axis(0), &test).view());
            correct += argmax_rows(&proba)
                .into_iter()
                .zip(test.iter())
                .filter(|&(pred, &i)| pred == codes[i])
                .count();
            total += test.len();
        }
        Ok(correct as f64 / total.max(1) as f64)
    }
}

impl NativeType for LogisticRegressionCV {
    const NAME: &'static str = "LogisticRegressionCV";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for LogisticRegressionCV {
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
        self.fitted.as_ref().map(|f| f.params.n_features())
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        if self.config.cs.is_empty() || self.config.cs.iter().any(|&c| c <= 0.0) {
            return Err(EstimatorError::InvalidParameter(
                "Cs must be a non-empty list of positive values".to_string(),
            ));
        }
        let (classes, codes) = classification_inputs(Self::NAME, &x, y)?;

        let mut best: Option<(f64, f64)> = None;
        for &c in &self.config.cs {
            let accuracy = self.cv_accuracy(&x, &codes, &classes, c)?;
            if best.map_or(true, |(_, a)| accuracy > a) {
                best = Some((c, accuracy));
            }
        }
        let (c, accuracy) = best.unwrap_or((self.config.cs[0], 0.0));
        tracing::debug!(estimator = Self::NAME, c, accuracy, "selected C");

        let config = LogisticRegressionConfig {
            c,
            ..self.config.base.clone()
        };
        let (params, converged) = fit_logistic(&x, &codes, classes, &config)?;
        if !converged {
            tracing::warn!(estimator = Self::NAME, c, "Newton solver failed to converge");
        }
        self.fitted = Some(LogisticCVFit { params, c });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        logistic_predict(Self::NAME, self.fitted.as_ref().map(|f| &f.params), x)
    }

    fn predict_proba(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        logistic_proba(Self::NAME, self.fitted.as_ref().map(|f| &f.params), x)
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.params.classes.as_slice())
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

    fn linear_data() -> (Array2<f64>, Targets) {
        // y = 2·x0 - x1 + 3
        let x = array![
            [0.0, 1.0],
            [1.0, 0.0],
            [2.0, 1.0],
            [3.0, 5.0],
            [4.0, 2.0],
            [5.0, 3.0]
        ];
        let y = x.map_axis(Axis(1), |r| 2.0 * r[0] - r[1] + 3.0);
        (x, Targets::Values(y))
    }

    fn labeled_data() -> (Array2<f64>, Targets) {
        let x = array![
            [0.0, 0.1],
            [0.2, 0.0],
            [0.1, 0.3],
            [0.3, 0.2],
            [0.2, 0.2],
            [3.0, 3.1],
            [3.2, 2.9],
            [2.9, 3.0],
            [3.1, 3.3],
            [3.0, 2.8]
        ];
        let labels = (0..10)
            .map(|i| if i < 5 { "low" } else { "high" }.to_string())
            .collect();
        (x, Targets::Labels(labels))
    }

    #[test]
    fn test_linear_regression_recovers_coefficients() {
        let (x, y) = linear_data();
        let mut model = LinearRegression::default();
        model.fit(x.view(), Some(&y)).unwrap();
        let params = model.params().unwrap();
        assert_abs_diff_eq!(params.coef[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(params.coef[1], -1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(params.intercept, 3.0, epsilon = 1e-8);
    }

    #[test]
    fn test_linear_regression_collinear_features() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let y = Targets::Values(array![1.0, 2.0, 3.0]);
        let mut model = LinearRegression::default();
        model.fit(x.view(), Some(&y)).unwrap();
        let Targets::Values(pred) = model.predict(x.view().into_dyn()).unwrap() else {
            panic!("expected values");
        };
        assert_abs_diff_eq!(pred[2], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_predict_checks_fitted_before_shape() {
        let model = LinearRegression::default();
        let flat = array![0.0, 1.0, 2.0];
        assert!(model.predict(flat.view().into_dyn()).unwrap_err().is_not_fitted());
    }

    #[test]
    fn test_predict_rejects_1d_after_fit() {
        let (x, y) = linear_data();
        let mut model = Ridge::default();
        model.fit(x.view(), Some(&y)).unwrap();
        let flat = array![0.0, 1.0];
        assert!(matches!(
            model.predict(flat.view().into_dyn()),
            Err(EstimatorError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_regressor_rejects_labels() {
        let (x, y) = labeled_data();
        let mut model = LinearRegression::default();
        assert!(matches!(
            model.fit(x.view(), Some(&y)),
            Err(EstimatorError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let (x, y) = linear_data();
        let mut weak = Ridge::default().with_alpha(0.01);
        let mut strong = Ridge::default().with_alpha(100.0);
        weak.fit(x.view(), Some(&y)).unwrap();
        strong.fit(x.view(), Some(&y)).unwrap();
        let norm = |m: &Ridge| m.params().map(|p| p.coef.dot(&p.coef)).unwrap();
        assert!(norm(&strong) < norm(&weak));
    }

    #[test]
    fn test_ridge_cv_selects_alpha() {
        let (x, y) = linear_data();
        let mut model = RidgeCV::default();
        assert_eq!(model.alpha(), None);
        model.fit(x.view(), Some(&y)).unwrap();
        // Noise-free data favors the weakest penalty.
        assert_eq!(model.alpha(), Some(0.1));
    }

    #[test]
    fn test_elastic_net_sparsity() {
        let (x, y) = linear_data();
        let mut model = ElasticNet::default().with_alpha(1000.0);
        model.fit(x.view(), Some(&y)).unwrap();
        let params = model.params().unwrap();
        assert!(params.coef.iter().all(|&c| c == 0.0));

        let mut light = ElasticNet::default().with_alpha(1e-4).with_l1_ratio(1.0);
        light.fit(x.view(), Some(&y)).unwrap();
        assert_abs_diff_eq!(light.params().unwrap().coef[0], 2.0, epsilon = 1e-2);
        assert!(light.n_iter().unwrap() >= 1);
    }

    #[test]
    fn test_logistic_regression_separates_classes() {
        let (x, y) = labeled_data();
        let mut model = LogisticRegression::default();
        model.fit(x.view(), Some(&y)).unwrap();
        assert_eq!(
            model.classes().unwrap(),
            &["high".to_string(), "low".to_string()]
        );

        let proba = model.predict_proba(x.view().into_dyn()).unwrap();
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-10);
        }
        assert_eq!(model.predict(x.view().into_dyn()).unwrap(), y);
    }

    #[test]
    fn test_logistic_regression_single_class() {
        let x = array![[0.0], [1.0]];
        let y = Targets::Labels(array!["a".to_string(), "a".to_string()]);
        let mut model = LogisticRegression::default();
        assert!(matches!(
            model.fit(x.view(), Some(&y)),
            Err(EstimatorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_logistic_regression_cv() {
        let (x, y) = labeled_data();
        let mut model = LogisticRegressionCV::default().with_cs(vec![0.01, 1.0]);
        model.fit(x.view(), Some(&y)).unwrap();
        assert!(model.c().is_some());
        assert_eq!(model.predict(x.view().into_dyn()).unwrap(), y);
    }

    #[test]
    fn test_logspace() {
        let values = logspace(-1.0, 1.0, 3);
        assert_abs_diff_eq!(values[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(values[2], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unfitted_keeps_hyperparameters() {
        let (x, y) = linear_data();
        let mut model = Ridge::default().with_alpha(5.0);
        model.fit(x.view(), Some(&y)).unwrap();
        let fresh = model.unfitted();
        assert!(!fresh.is_fitted());
        assert_eq!(fresh.config.alpha, 5.0);
    }
}
