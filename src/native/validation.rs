//! Input and state validation shared by native estimators.

use crate::error::EstimatorError;
use crate::native::Targets;
use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewD, Ix2};

/// Borrow the fitted state or fail with the not-fitted error.
pub(crate) fn check_is_fitted<'a, T>(
    name: &str,
    state: &'a Option<T>,
) -> Result<&'a T, EstimatorError> {
    state.as_ref().ok_or_else(|| EstimatorError::not_fitted(name))
}

/// Require a 2-D input array.
pub(crate) fn check_2d(x: ArrayViewD<'_, f64>) -> Result<ArrayView2<'_, f64>, EstimatorError> {
    let ndim = x.ndim();
    x.into_dimensionality::<Ix2>()
        .map_err(|_| EstimatorError::InvalidShape {
            expected: "2D array".to_string(),
            got: format!("{}D array", ndim),
        })
}

pub(crate) fn check_n_features(
    name: &str,
    expected: usize,
    got: usize,
) -> Result<(), EstimatorError> {
    if expected != got {
        return Err(EstimatorError::FeatureMismatch {
            estimator: name.to_string(),
            expected_features: expected,
            got_features: got,
        });
    }
    Ok(())
}

/// Validation for predict-like calls: fitted state, dimensionality, width.
pub(crate) fn check_predict_input<'a, T>(
    name: &str,
    state: &Option<T>,
    n_features: Option<usize>,
    x: ArrayViewD<'a, f64>,
) -> Result<ArrayView2<'a, f64>, EstimatorError> {
    check_is_fitted(name, state)?;
    let x = check_2d(x)?;
    if let Some(expected) = n_features {
        check_n_features(name, expected, x.ncols())?;
    }
    Ok(x)
}

/// Validation for `fit`: non-empty input whose rows match the target.
pub(crate) fn check_fit_input(
    name: &str,
    x: &ArrayView2<'_, f64>,
    y: Option<&Targets>,
) -> Result<(), EstimatorError> {
    if x.nrows() == 0 {
        return Err(EstimatorError::EmptyData(format!(
            "Cannot fit {} on empty data",
            name
        )));
    }
    if let Some(y) = y {
        if y.n_samples() != x.nrows() {
            return Err(EstimatorError::InvalidShape {
                expected: format!("{} target rows", x.nrows()),
                got: format!("{} target rows", y.n_samples()),
            });
        }
    }
    Ok(())
}

/// Reject NaN and infinite values (estimators other than imputers).
pub(crate) fn check_finite(name: &str, x: &ArrayView2<'_, f64>) -> Result<(), EstimatorError> {
    if x.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::Numerical(format!(
            "Input to {} contains NaN or infinity",
            name
        )));
    }
    Ok(())
}

pub(crate) fn values_target<'a>(
    name: &str,
    y: Option<&'a Targets>,
) -> Result<ArrayView1<'a, f64>, EstimatorError> {
    match y {
        Some(Targets::Values(v)) => Ok(v.view()),
        _ => Err(EstimatorError::invalid_target(name, "continuous values")),
    }
}

pub(crate) fn labels_target<'a>(
    name: &str,
    y: Option<&'a Targets>,
) -> Result<&'a Array1<String>, EstimatorError> {
    match y {
        Some(Targets::Labels(v)) => Ok(v),
        _ => Err(EstimatorError::invalid_target(name, "class labels")),
    }
}

/// Sorted distinct labels and the position of each sample's label among them.
pub(crate) fn encode_labels(labels: &Array1<String>) -> (Vec<String>, Vec<usize>) {
    let mut classes: Vec<String> = labels.iter().cloned().collect();
    classes.sort();
    classes.dedup();
    let codes = labels
        .iter()
        .map(|l| classes.binary_search(l).unwrap_or(0))
        .collect();
    (classes, codes)
}

/// Position of the maximum of each row, first one on ties.
pub(crate) fn argmax_rows(values: &ndarray::Array2<f64>) -> Vec<usize> {
    values
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(best, best_v), (i, &v)| {
                    if v > best_v {
                        (i, v)
                    } else {
                        (best, best_v)
                    }
                })
                .0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_check_2d_rejects_1d() {
        let x = array![1.0, 2.0, 3.0];
        let err = check_2d(x.view().into_dyn()).unwrap_err();
        assert_eq!(
            err,
            EstimatorError::InvalidShape {
                expected: "2D array".to_string(),
                got: "1D array".to_string()
            }
        );
    }

    #[test]
    fn test_predict_input_checks_fitted_first() {
        let state: Option<()> = None;
        let x = array![1.0, 2.0];
        let err = check_predict_input("Model", &state, None, x.view().into_dyn()).unwrap_err();
        assert!(err.is_not_fitted());
    }

    #[test]
    fn test_predict_input_feature_mismatch() {
        let state = Some(());
        let x = array![[1.0, 2.0]];
        let err = check_predict_input("Model", &state, Some(3), x.view().into_dyn()).unwrap_err();
        assert!(matches!(err, EstimatorError::FeatureMismatch { .. }));
    }

    #[test]
    fn test_encode_labels_sorted() {
        let labels = array!["b".to_string(), "a".to_string(), "b".to_string()];
        let (classes, codes) = encode_labels(&labels);
        assert_eq!(classes, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(codes, vec![1, 0, 1]);
    }

    #[test]
    fn test_argmax_rows_first_on_ties() {
        let values = array![[0.5, 0.5], [0.1, 0.9]];
        assert_eq!(argmax_rows(&values), vec![0, 1]);
    }

    #[test]
    fn test_check_fit_input_row_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = Targets::Values(array![1.0]);
        assert!(check_fit_input("Model", &x.view(), Some(&y)).is_err());
    }
}
