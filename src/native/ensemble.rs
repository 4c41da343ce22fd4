//! Forests of randomized trees and voting ensembles.

use crate::error::EstimatorError;
use crate::native::tree::{
    classification_inputs, labels_from_proba, regression_inputs, Criterion, MaxFeatures, Tree,
    TreeConfig,
};
use crate::native::validation::{
    check_fit_input, check_is_fitted, check_predict_input, encode_labels, labels_target,
};
use crate::native::{EstimatorKind, NamedEstimators, NativeEstimator, NativeType, Targets};
use ndarray::{Array1, Array2, ArrayView2, ArrayViewD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration for the random forests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub n_estimators: usize,
    /// Whether each tree sees a bootstrap sample instead of all rows.
    pub bootstrap: bool,
    /// Growth limits of every tree; its `random_state` is ignored.
    pub tree: TreeConfig,
    pub random_state: Option<u64>,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            bootstrap: true,
            tree: TreeConfig::default(),
            random_state: None,
        }
    }
}

impl RandomForestConfig {
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.tree.max_features = max_features;
        self
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.tree.max_depth = Some(max_depth);
        self
    }

    /// Grow the trees, each with its own seed drawn from the forest seed.
    fn grow(
        &self,
        name: &str,
        x: &ArrayView2<'_, f64>,
        criterion: Criterion<'_>,
    ) -> Result<Vec<Tree>, EstimatorError> {
        if self.n_estimators == 0 {
            return Err(EstimatorError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        self.tree.validate()?;

        let mut forest_rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let n = x.nrows();
        let trees: Vec<Tree> = (0..self.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(forest_rng.gen());
                let samples = if self.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                Tree::grow(x, samples, criterion, &self.tree, &mut rng)
            })
            .collect();

        tracing::debug!(
            estimator = name,
            n_estimators = self.n_estimators,
            n_samples = n,
            "grew forest"
        );
        Ok(trees)
    }
}

/// Average of leaf values over the trees of a forest.
fn forest_average(trees: &[Tree], x: &ArrayView2<'_, f64>, width: usize) -> Array2<f64> {
    let mut sum = Array2::zeros((x.nrows(), width));
    for tree in trees {
        sum += &tree.predict_values(x, width);
    }
    sum / trees.len() as f64
}

/// A forest of regression trees.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    config: RandomForestConfig,
    fitted: Option<Vec<Tree>>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(RandomForestConfig::default())
    }
}

impl RandomForestRegressor {
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Apply builder-style changes to the configuration.
    pub fn configure(mut self, f: impl FnOnce(RandomForestConfig) -> RandomForestConfig) -> Self {
        self.config = f(self.config);
        self
    }

    pub fn trees(&self) -> Option<&[Tree]> {
        self.fitted.as_deref()
    }
}

impl NativeType for RandomForestRegressor {
    const NAME: &'static str = "RandomForestRegressor";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for RandomForestRegressor {
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
        self.fitted
            .as_ref()
            .and_then(|trees| trees.first())
            .map(Tree::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        let y = regression_inputs(Self::NAME, &x, y)?;
        let trees = self
            .config
            .grow(Self::NAME, &x, Criterion::SquaredError(&y))?;
        self.fitted = Some(trees);
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let trees = check_is_fitted(Self::NAME, &self.fitted)?;
        let mean = forest_average(trees, &x, 1);
        Ok(Targets::Values(mean.column(0).to_owned()))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ClassifierForest {
    trees: Vec<Tree>,
    classes: Vec<String>,
}

/// A forest of classification trees; probabilities are averaged over trees.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    config: RandomForestConfig,
    fitted: Option<ClassifierForest>,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(RandomForestConfig::default().with_max_features(MaxFeatures::Sqrt))
    }
}

impl RandomForestClassifier {
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Apply builder-style changes to the configuration.
    pub fn configure(mut self, f: impl FnOnce(RandomForestConfig) -> RandomForestConfig) -> Self {
        self.config = f(self.config);
        self
    }

    pub fn trees(&self) -> Option<&[Tree]> {
        self.fitted.as_ref().map(|f| f.trees.as_slice())
    }
}

impl NativeType for RandomForestClassifier {
    const NAME: &'static str = "RandomForestClassifier";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for RandomForestClassifier {
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
        self.trees().and_then(|t| t.first()).map(Tree::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        let (classes, codes) = classification_inputs(Self::NAME, &x, y)?;
        let trees = self.config.grow(
            Self::NAME,
            &x,
            Criterion::Gini {
                codes: &codes,
                n_classes: classes.len(),
            },
        )?;
        self.fitted = Some(ClassifierForest { trees, classes });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let proba = self.predict_proba(x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;
        Ok(labels_from_proba(&fitted.classes, &proba))
    }

    fn predict_proba(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;
        Ok(forest_average(&fitted.trees, &x, fitted.classes.len()))
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Check member names and roles of a voting ensemble before fitting.
fn check_members(
    name: &str,
    estimators: &NamedEstimators,
    kind: EstimatorKind,
    weights: Option<&[f64]>,
) -> Result<(), EstimatorError> {
    if estimators.is_empty() {
        return Err(EstimatorError::InvalidParameter(format!(
            "{} requires at least one estimator",
            name
        )));
    }
    let mut seen = HashSet::new();
    for (member, estimator) in estimators {
        if !seen.insert(member.as_str()) {
            return Err(EstimatorError::InvalidParameter(format!(
                "Names provided are not unique: '{}' appears more than once",
                member
            )));
        }
        if estimator.kind() != kind {
            return Err(EstimatorError::InvalidParameter(format!(
                "{} expects {} members, but '{}' is a {}",
                name,
                kind,
                member,
                estimator.kind()
            )));
        }
    }
    if let Some(weights) = weights {
        if weights.len() != estimators.len() {
            return Err(EstimatorError::InvalidParameter(format!(
                "Number of estimators and weights must be equal; got {} weights, {} estimators",
                weights.len(),
                estimators.len()
            )));
        }
    }
    Ok(())
}

/// Fit unfitted clones of every member on the same data.
fn fit_members(
    estimators: &NamedEstimators,
    x: &ArrayView2<'_, f64>,
    y: Option<&Targets>,
) -> Result<NamedEstimators, EstimatorError> {
    estimators
        .iter()
        .map(|(member, estimator)| {
            let mut fitted = estimator.clone_unfitted();
            fitted.fit(x.view(), y)?;
            Ok((member.clone(), fitted))
        })
        .collect()
}

fn member_weights(weights: &Option<Vec<f64>>, n: usize) -> Vec<f64> {
    weights.clone().unwrap_or_else(|| vec![1.0; n])
}

/// Voting rule of a [`VotingClassifier`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voting {
    /// Majority of predicted labels.
    #[default]
    Hard,
    /// Argmax of the averaged class probabilities.
    Soft,
}

#[derive(Clone, Debug)]
struct FittedVoting {
    estimators: NamedEstimators,
    classes: Vec<String>,
    n_features: usize,
}

/// Combines classifiers by majority or probability vote.
#[derive(Clone, Debug)]
pub struct VotingClassifier {
    estimators: NamedEstimators,
    voting: Voting,
    weights: Option<Vec<f64>>,
    fitted: Option<FittedVoting>,
}

impl VotingClassifier {
    pub fn new(estimators: NamedEstimators) -> Self {
        Self {
            estimators,
            voting: Voting::default(),
            weights: None,
            fitted: None,
        }
    }

    pub fn with_voting(mut self, voting: Voting) -> Self {
        self.voting = voting;
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn voting(&self) -> Voting {
        self.voting
    }

    /// The members as given, unfitted.
    pub fn estimators(&self) -> &NamedEstimators {
        &self.estimators
    }

    /// The fitted members.
    pub fn fitted_estimators(&self) -> Option<&NamedEstimators> {
        self.fitted.as_ref().map(|f| &f.estimators)
    }

    fn weighted_proba(
        &self,
        fitted: &FittedVoting,
        x: &ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>, EstimatorError> {
        let weights = member_weights(&self.weights, fitted.estimators.len());
        let total: f64 = weights.iter().sum();
        let mut sum = Array2::zeros((x.nrows(), fitted.classes.len()));
        for ((_, estimator), w) in fitted.estimators.iter().zip(&weights) {
            sum.scaled_add(*w, &estimator.predict_proba(x.view().into_dyn())?);
        }
        Ok(sum / total)
    }
}

impl NativeType for VotingClassifier {
    const NAME: &'static str = "VotingClassifier";

    fn unfitted(&self) -> Self {
        Self {
            estimators: self.estimators.clone(),
            voting: self.voting,
            weights: self.weights.clone(),
            fitted: None,
        }
    }
}

impl NativeEstimator for VotingClassifier {
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
        check_members(
            Self::NAME,
            &self.estimators,
            EstimatorKind::Classifier,
            self.weights.as_deref(),
        )?;
        check_fit_input(Self::NAME, &x, y)?;
        let (classes, _) = encode_labels(labels_target(Self::NAME, y)?);
        let estimators = fit_members(&self.estimators, &x, y)?;
        tracing::debug!(
            estimator = Self::NAME,
            members = estimators.len(),
            voting = ?self.voting,
            "fitted"
        );
        self.fitted = Some(FittedVoting {
            estimators,
            classes,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;

        let scores = match self.voting {
            Voting::Soft => self.weighted_proba(fitted, &x)?,
            Voting::Hard => {
                let weights = member_weights(&self.weights, fitted.estimators.len());
                let mut votes = Array2::zeros((x.nrows(), fitted.classes.len()));
                for ((_, estimator), w) in fitted.estimators.iter().zip(&weights) {
                    let Targets::Labels(labels) = estimator.predict(x.view().into_dyn())? else {
                        return Err(EstimatorError::invalid_target(Self::NAME, "class labels"));
                    };
                    for (row, label) in labels.iter().enumerate() {
                        if let Ok(class) = fitted.classes.binary_search(label) {
                            votes[[row, class]] += w;
                        }
                    }
                }
                votes
            }
        };
        Ok(labels_from_proba(&fitted.classes, &scores))
    }

    fn predict_proba(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;
        if self.voting == Voting::Hard {
            return Err(EstimatorError::InvalidParameter(
                "predict_proba is not available when voting='hard'".to_string(),
            ));
        }
        self.weighted_proba(fitted, &x)
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

/// Averages the predictions of regressors.
#[derive(Clone, Debug)]
pub struct VotingRegressor {
    estimators: NamedEstimators,
    weights: Option<Vec<f64>>,
    fitted: Option<(NamedEstimators, usize)>,
}

impl VotingRegressor {
    pub fn new(estimators: NamedEstimators) -> Self {
        Self {
            estimators,
            weights: None,
            fitted: None,
        }
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn estimators(&self) -> &NamedEstimators {
        &self.estimators
    }

    pub fn fitted_estimators(&self) -> Option<&NamedEstimators> {
        self.fitted.as_ref().map(|(e, _)| e)
    }
}

impl NativeType for VotingRegressor {
    const NAME: &'static str = "VotingRegressor";

    fn unfitted(&self) -> Self {
        Self {
            estimators: self.estimators.clone(),
            weights: self.weights.clone(),
            fitted: None,
        }
    }
}

impl NativeEstimator for VotingRegressor {
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
        self.fitted.as_ref().map(|(_, n)| *n)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_members(
            Self::NAME,
            &self.estimators,
            EstimatorKind::Regressor,
            self.weights.as_deref(),
        )?;
        check_fit_input(Self::NAME, &x, y)?;
        let estimators = fit_members(&self.estimators, &x, y)?;
        tracing::debug!(estimator = Self::NAME, members = estimators.len(), "fitted");
        self.fitted = Some((estimators, x.ncols()));
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let (estimators, _) = check_is_fitted(Self::NAME, &self.fitted)?;
        let weights = member_weights(&self.weights, estimators.len());
        let total: f64 = weights.iter().sum();

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for ((_, estimator), w) in estimators.iter().zip(&weights) {
            let Targets::Values(pred) = estimator.predict(x.view().into_dyn())? else {
                return Err(EstimatorError::invalid_target(Self::NAME, "continuous values"));
            };
            sum.scaled_add(*w, &pred);
        }
        Ok(Targets::Values(sum / total))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}
