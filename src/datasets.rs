//! Seeded synthetic datasets with named features.
//!
//! Features are named `x0`, `x1`, ... and the target series is named
//! `target`. The same config always produces the same data.

use crate::error::EstimatorError;
use crate::frame::{Frame, Series};
use crate::registry::{ClassInfo, Namespace};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{StandardNormal, Uniform};
use serde::{Deserialize, Serialize};

/// Shape and randomness of a synthetic dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub n_samples: usize,
    pub n_features: usize,
    /// Standard deviation of the Gaussian noise added to regression targets.
    pub noise: f64,
    /// Number of classes (classification only).
    pub n_classes: usize,
    /// Distance between neighbouring class centroids (classification only).
    pub class_sep: f64,
    pub random_state: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_samples: 100,
            n_features: 4,
            noise: 0.1,
            n_classes: 3,
            class_sep: 2.0,
            random_state: 0,
        }
    }
}

impl SyntheticConfig {
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    pub fn with_n_features(mut self, n_features: usize) -> Self {
        self.n_features = n_features;
        self
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_class_sep(mut self, class_sep: f64) -> Self {
        self.class_sep = class_sep;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<(), EstimatorError> {
        if self.n_samples == 0 || self.n_features == 0 {
            return Err(EstimatorError::EmptyData(format!(
                "cannot generate {} samples with {} features",
                self.n_samples, self.n_features
            )));
        }
        if self.noise.is_nan() || self.noise < 0.0 {
            return Err(EstimatorError::InvalidParameter(format!(
                "noise must be non-negative, got {}",
                self.noise
            )));
        }
        Ok(())
    }
}

fn feature_names(n_features: usize) -> Vec<String> {
    (0..n_features).map(|j| format!("x{}", j)).collect()
}

fn standard_normal(rng: &mut StdRng, n_samples: usize, n_features: usize) -> Array2<f64> {
    Array2::from_shape_simple_fn((n_samples, n_features), || rng.sample(StandardNormal))
}

/// Gaussian features and a linear target with coefficients drawn from
/// `[1, 10)` plus Gaussian noise.
///
/// # Errors
/// Returns [`EstimatorError::EmptyData`] for zero samples or features and
/// [`EstimatorError::InvalidParameter`] for negative noise.
pub fn make_regression(config: &SyntheticConfig) -> Result<(Frame, Series), EstimatorError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.random_state);

    let coef: Array1<f64> = (0..config.n_features)
        .map(|_| rng.sample(Uniform::new(1.0, 10.0)))
        .collect();
    let x = standard_normal(&mut rng, config.n_samples, config.n_features);
    let mut y = x.dot(&coef);
    if config.noise > 0.0 {
        y.mapv_inplace(|v| v + config.noise * rng.sample::<f64, _>(StandardNormal));
    }

    tracing::debug!(
        n_samples = config.n_samples,
        n_features = config.n_features,
        "generated regression data"
    );
    let x = Frame::new(feature_names(config.n_features), x)?;
    Ok((x, Series::new(Some("target"), y)))
}

/// Gaussian blobs around one centroid per class, labelled `class_0`,
/// `class_1`, ...
///
/// Rows cycle through the classes, so every class has `n_samples /
/// n_classes` rows give or take one.
///
/// # Errors
/// Returns [`EstimatorError::EmptyData`] for zero samples or features and
/// [`EstimatorError::InvalidParameter`] for fewer than two classes.
pub fn make_classification(
    config: &SyntheticConfig,
) -> Result<(Frame, Series<String>), EstimatorError> {
    config.validate()?;
    if config.n_classes < 2 {
        return Err(EstimatorError::InvalidParameter(format!(
            "n_classes must be at least 2, got {}",
            config.n_classes
        )));
    }
    let mut rng = StdRng::seed_from_u64(config.random_state);

    // Neighbouring classes are shifted by class_sep in every coordinate.
    let centroid = |class: usize, feature: usize| {
        config.class_sep * ((class + feature) % config.n_classes) as f64
    };
    let mut x = standard_normal(&mut rng, config.n_samples, config.n_features);
    let mut labels = Vec::with_capacity(config.n_samples);
    for (i, mut row) in x.rows_mut().into_iter().enumerate() {
        let class = i % config.n_classes;
        for (j, v) in row.iter_mut().enumerate() {
            *v += centroid(class, j);
        }
        labels.push(format!("class_{}", class));
    }

    tracing::debug!(
        n_samples = config.n_samples,
        n_classes = config.n_classes,
        "generated classification data"
    );
    let x = Frame::new(feature_names(config.n_features), x)?;
    Ok((x, Series::from_vec(Some("target"), labels)))
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.datasets")
        .with_class(ClassInfo::class::<SyntheticConfig>("SyntheticConfig"))
        .with_function("make_regression")
        .with_function("make_classification")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_regression_is_seeded() {
        let config = SyntheticConfig::default().with_n_samples(20).with_random_state(7);
        let (x1, y1) = make_regression(&config).unwrap();
        let (x2, y2) = make_regression(&config).unwrap();
        assert_eq!(x1, x2);
        assert_eq!(y1, y2);
        assert_eq!(x1.columns(), &["x0", "x1", "x2", "x3"]);
        assert_eq!(y1.name(), Some("target"));
        assert_eq!(y1.len(), 20);

        let (x3, _) = make_regression(&config.with_random_state(8)).unwrap();
        assert_ne!(x1, x3);
    }

    #[test]
    fn test_make_regression_without_noise_is_linear() {
        let config = SyntheticConfig::default().with_noise(0.0).with_n_features(1);
        let (x, y) = make_regression(&config).unwrap();
        let slope = y.values()[0] / x.values()[[0, 0]];
        for (xi, yi) in x.values().column(0).iter().zip(y.values()) {
            assert!((xi * slope - yi).abs() < 1e-9);
        }
    }

    #[test]
    fn test_make_classification_balanced_labels() {
        let config = SyntheticConfig::default().with_n_samples(10).with_n_classes(3);
        let (x, y) = make_classification(&config).unwrap();
        assert_eq!(x.shape(), (10, 4));
        let count = |label: &str| y.values().iter().filter(|l| *l == label).count();
        assert_eq!(count("class_0"), 4);
        assert_eq!(count("class_1"), 3);
        assert_eq!(count("class_2"), 3);
    }

    #[test]
    fn test_invalid_configs() {
        let empty = SyntheticConfig::default().with_n_samples(0);
        assert!(matches!(make_regression(&empty), Err(EstimatorError::EmptyData(_))));

        let noisy = SyntheticConfig::default().with_noise(-1.0);
        assert!(matches!(
            make_regression(&noisy),
            Err(EstimatorError::InvalidParameter(_))
        ));

        let single = SyntheticConfig::default().with_n_classes(1);
        assert!(matches!(
            make_classification(&single),
            Err(EstimatorError::InvalidParameter(_))
        ));
    }
}
