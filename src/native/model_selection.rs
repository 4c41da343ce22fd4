//! Cross-validation splitters.
//!
//! Both splitters are deterministic: folds are contiguous for [`KFold`] and
//! class-balanced for [`StratifiedKFold`], without shuffling.

use crate::error::EstimatorError;
use serde::{Deserialize, Serialize};

/// Train and test row positions of one fold.
pub type Fold = (Vec<usize>, Vec<usize>);

/// K contiguous folds; the first `n % k` folds get one extra sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
}

impl Default for KFold {
    fn default() -> Self {
        Self { n_splits: 5 }
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Split `n_samples` rows into folds.
    ///
    /// # Errors
    /// Returns [`EstimatorError::InvalidParameter`] if `n_splits < 2` or
    /// `n_splits > n_samples`.
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>, EstimatorError> {
        check_splits(self.n_splits, n_samples)?;

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            let test: Vec<usize> = (start..start + size).collect();
            let train: Vec<usize> = (0..start).chain(start + size..n_samples).collect();
            folds.push((train, test));
            start += size;
        }
        Ok(folds)
    }
}

/// K folds preserving the class proportions of the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self { n_splits: 5 }
    }
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Split rows given each row's class code.
    ///
    /// Rows of each class are dealt to folds in turn, so every fold receives
    /// a near-equal share of every class.
    pub fn split(&self, codes: &[usize]) -> Result<Vec<Fold>, EstimatorError> {
        check_splits(self.n_splits, codes.len())?;

        let n_classes = codes.iter().copied().max().map_or(0, |m| m + 1);
        let mut seen = vec![0usize; n_classes];
        let mut assignment = Vec::with_capacity(codes.len());
        for &code in codes {
            assignment.push(seen[code] % self.n_splits);
            seen[code] += 1;
        }
        if let Some(smallest) = seen.iter().copied().filter(|&c| c > 0).min() {
            if smallest < self.n_splits {
                tracing::warn!(
                    smallest_class = smallest,
                    n_splits = self.n_splits,
                    "the least populated class has fewer members than n_splits"
                );
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..codes.len()).partition(|&i| assignment[i] == fold);
                (train, test)
            })
            .collect())
    }
}

fn check_splits(n_splits: usize, n_samples: usize) -> Result<(), EstimatorError> {
    if n_splits < 2 {
        return Err(EstimatorError::InvalidParameter(format!(
            "cross-validation requires at least 2 splits, got {}",
            n_splits
        )));
    }
    if n_splits > n_samples {
        return Err(EstimatorError::InvalidParameter(format!(
            "cannot have n_splits={} greater than the number of samples: n_samples={}",
            n_splits, n_samples
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kfold_sizes() {
        let folds = KFold::new(3).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[1].1, vec![4, 5, 6]);
        assert_eq!(folds[1].0.len(), 7);
    }

    #[test]
    fn test_kfold_covers_every_row_once() {
        let folds = KFold::new(4).split(9).unwrap();
        let mut all: Vec<usize> = folds.into_iter().flat_map(|(_, test)| test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_kfold_invalid() {
        assert!(KFold::new(1).split(10).is_err());
        assert!(KFold::new(5).split(3).is_err());
    }

    #[test]
    fn test_stratified_each_fold_has_every_class() {
        // Sorted by class, as many real datasets are.
        let codes: Vec<usize> = (0..30).map(|i| i / 10).collect();
        let folds = StratifiedKFold::new(5).split(&codes).unwrap();
        for (train, test) in &folds {
            assert_eq!(test.len(), 6);
            assert_eq!(train.len(), 24);
            for class in 0..3 {
                assert_eq!(test.iter().filter(|&&i| codes[i] == class).count(), 2);
            }
        }
    }
}
