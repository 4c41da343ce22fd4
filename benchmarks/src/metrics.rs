//! Scores of predictions against ground truth.

use serde::Serialize;

/// Error and fit scores of a regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
}

impl RegressionMetrics {
    /// Score `y_pred` against `y_true`.
    ///
    /// R² is 1 when the truth is constant and predicted exactly, 0 when it
    /// is constant and missed. Empty inputs score 0 everywhere.
    ///
    /// # Panics
    /// If the slices differ in length.
    pub fn score(y_true: &[f64], y_pred: &[f64]) -> Self {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
        if y_true.is_empty() {
            return Self {
                mse: 0.0,
                rmse: 0.0,
                mae: 0.0,
                r_squared: 0.0,
            };
        }

        let n = y_true.len() as f64;
        let residuals = || y_true.iter().zip(y_pred).map(|(t, p)| t - p);
        let ss_res: f64 = residuals().map(|r| r * r).sum();
        let mae = residuals().map(f64::abs).sum::<f64>() / n;

        let mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        let r_squared = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        let mse = ss_res / n;
        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r_squared,
        }
    }
}

/// Share of labels predicted exactly.
///
/// # Panics
/// If the slices differ in length.
pub fn accuracy(y_true: &[String], y_pred: &[String]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_regression() {
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let m = RegressionMetrics::score(&y, &y);
        assert!(m.mse.abs() < 1e-12);
        assert!((m.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_regression() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![2.0, 3.0, 4.0, 5.0];
        let m = RegressionMetrics::score(&y_true, &y_pred);
        assert!((m.mse - 1.0).abs() < 1e-12);
        assert!((m.mae - 1.0).abs() < 1e-12);
        // ss_tot = 5, ss_res = 4
        assert!((m.r_squared - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_constant_truth() {
        let y = vec![2.0; 4];
        assert_eq!(RegressionMetrics::score(&y, &y).r_squared, 1.0);
        assert_eq!(RegressionMetrics::score(&y, &[2.0, 2.0, 2.0, 3.0]).r_squared, 0.0);
    }

    #[test]
    fn test_accuracy() {
        let labels = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let y_true = labels(&["a", "b", "b", "a"]);
        let y_pred = labels(&["a", "b", "a", "a"]);
        assert_eq!(accuracy(&y_true, &y_pred), 0.75);
    }
}
