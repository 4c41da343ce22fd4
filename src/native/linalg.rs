//! Dense linear solves for the linear models.

use crate::error::EstimatorError;
use ndarray::{Array1, Array2, Axis};

/// Solve `a · x = b` for square `a` by Gaussian elimination with partial pivoting.
pub(crate) fn solve(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>, EstimatorError> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return Err(EstimatorError::InvalidShape {
            expected: format!("square system of size {}", n),
            got: format!("{:?} and {:?}", a.dim(), b.dim()),
        });
    }

    let mut a = a.clone();
    let mut b = b.clone();
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);

    for k in 0..n {
        let pivot = (k..n)
            .max_by(|&i, &j| a[[i, k]].abs().total_cmp(&a[[j, k]].abs()))
            .unwrap_or(k);
        if a[[pivot, k]].abs() <= 1e-13 * scale {
            return Err(EstimatorError::Numerical(
                "singular matrix in linear solve".to_string(),
            ));
        }
        if pivot != k {
            for col in 0..n {
                a.swap([k, col], [pivot, col]);
            }
            for col in 0..b.ncols() {
                b.swap([k, col], [pivot, col]);
            }
        }

        for i in (k + 1)..n {
            let factor = a[[i, k]] / a[[k, k]];
            if factor == 0.0 {
                continue;
            }
            for col in k..n {
                a[[i, col]] -= factor * a[[k, col]];
            }
            for col in 0..b.ncols() {
                b[[i, col]] -= factor * b[[k, col]];
            }
        }
    }

    let mut x = Array2::zeros(b.dim());
    for col in 0..b.ncols() {
        for i in (0..n).rev() {
            let mut sum = b[[i, col]];
            for j in (i + 1)..n {
                sum -= a[[i, j]] * x[[j, col]];
            }
            x[[i, col]] = sum / a[[i, i]];
        }
    }
    Ok(x)
}

pub(crate) fn solve_vec(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, EstimatorError> {
    let rhs = b.clone().insert_axis(Axis(1));
    Ok(solve(a, &rhs)?.column(0).to_owned())
}

/// Inverse of a square matrix.
pub(crate) fn inverse(a: &Array2<f64>) -> Result<Array2<f64>, EstimatorError> {
    solve(a, &Array2::eye(a.nrows()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_solve_vec() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let x = solve_vec(&a, &b).unwrap();
        assert_abs_diff_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![2.0, 3.0];
        let x = solve_vec(&a, &b).unwrap();
        assert_abs_diff_eq!(x[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            inverse(&a),
            Err(EstimatorError::Numerical(_))
        ));
    }

    #[test]
    fn test_inverse() {
        let a = array![[4.0, 7.0], [2.0, 6.0]];
        let inv = inverse(&a).unwrap();
        let id = a.dot(&inv);
        assert_abs_diff_eq!(id[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(id[[0, 1]], 0.0, epsilon = 1e-12);
    }
}
