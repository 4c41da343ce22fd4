//! CART decision trees.
//!
//! Trees are grown greedily: each node takes the threshold split that most
//! reduces the squared error (regression) or the Gini impurity
//! (classification). Nodes live in a flat arena; a split refers to its
//! children by position.

use crate::error::EstimatorError;
use crate::native::validation::{
    argmax_rows, check_finite, check_fit_input, check_is_fitted, check_predict_input,
    encode_labels, labels_target, values_target,
};
use crate::native::{EstimatorKind, NativeEstimator, NativeType, Targets};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Number of features considered at each split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    pub(crate) fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2() as usize,
            MaxFeatures::Count(c) => c,
            MaxFeatures::Fraction(f) => (f * n_features as f64) as usize,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Growth limits shared by trees and forests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Seed for feature sampling; `None` draws from entropy.
    pub random_state: Option<u64>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            random_state: None,
        }
    }
}

impl TreeConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), EstimatorError> {
        if self.min_samples_split < 2 {
            return Err(EstimatorError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(EstimatorError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(EstimatorError::InvalidParameter(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn rng(&self) -> StdRng {
        match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// What a tree predicts and how it scores splits.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Criterion<'a> {
    /// Squared error against continuous targets.
    SquaredError(&'a [f64]),
    /// Gini impurity against class codes in `0..n_classes`.
    Gini { codes: &'a [usize], n_classes: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node {
    /// Mean target (regression) or class proportions (classification).
    Leaf { value: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl Tree {
    /// Grow a tree on the rows `samples` of `x`.
    pub(crate) fn grow(
        x: &ArrayView2<'_, f64>,
        samples: Vec<usize>,
        criterion: Criterion<'_>,
        config: &TreeConfig,
        rng: &mut StdRng,
    ) -> Tree {
        let mut builder = Builder {
            x,
            criterion,
            config,
            n_try: config.max_features.resolve(x.ncols()),
            rng,
            nodes: Vec::new(),
        };
        builder.build(samples, 0);
        Tree {
            nodes: builder.nodes,
            n_features: x.ncols(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Leaf value reached by one row.
    pub(crate) fn leaf_value(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Leaf values for every row, one row of output per input row.
    pub(crate) fn predict_values(&self, x: &ArrayView2<'_, f64>, width: usize) -> Array2<f64> {
        let mut out = Array2::zeros((x.nrows(), width));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (j, v) in self.leaf_value(row).iter().enumerate() {
                out[[i, j]] = *v;
            }
        }
        out
    }
}

struct Builder<'a, 'x> {
    x: &'a ArrayView2<'x, f64>,
    criterion: Criterion<'a>,
    config: &'a TreeConfig,
    n_try: usize,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl Builder<'_, '_> {
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        let (value, impurity) = self.node_stats(&samples);
        self.nodes.push(Node::Leaf { value });

        let n = samples.len();
        let depth_reached = self.config.max_depth.map_or(false, |d| depth >= d);
        if depth_reached
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
            || impurity <= 1e-12
        {
            return id;
        }

        let Some(split) = self.best_split(&samples) else {
            return id;
        };
        if split.impurity >= impurity - 1e-12 {
            return id;
        }

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);
        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Leaf value and total impurity (SSE, or n·gini) of a node.
    fn node_stats(&self, samples: &[usize]) -> (Vec<f64>, f64) {
        let n = samples.len() as f64;
        match self.criterion {
            Criterion::SquaredError(y) => {
                let sum: f64 = samples.iter().map(|&i| y[i]).sum();
                let sum_sq: f64 = samples.iter().map(|&i| y[i] * y[i]).sum();
                (vec![sum / n], (sum_sq - sum * sum / n).max(0.0))
            }
            Criterion::Gini { codes, n_classes } => {
                let mut counts = vec![0.0; n_classes];
                for &i in samples {
                    counts[codes[i]] += 1.0;
                }
                let impurity = gini_total(&counts, n);
                (counts.iter().map(|c| c / n).collect(), impurity)
            }
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let p = self.x.ncols();
        if self.n_try >= p {
            (0..p).collect()
        } else {
            rand::seq::index::sample(&mut *self.rng, p, self.n_try).into_vec()
        }
    }

    fn best_split(&mut self, samples: &[usize]) -> Option<Split> {
        let min_leaf = self.config.min_samples_leaf;
        let mut best: Option<Split> = None;

        for feature in self.candidate_features() {
            let mut order = samples.to_vec();
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let mut sweep = Sweep::new(self.criterion, &order);

            for pos in 0..order.len() - 1 {
                sweep.move_left(order[pos]);
                let here = self.x[[order[pos], feature]];
                let next = self.x[[order[pos + 1], feature]];
                if here == next || pos + 1 < min_leaf || order.len() - pos - 1 < min_leaf {
                    continue;
                }
                let impurity = sweep.impurity();
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(Split {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini_total(counts: &[f64], n: f64) -> f64 {
    if n == 0.0 {
        return 0.0;
    }
    n * (1.0 - counts.iter().map(|c| (c / n) * (c / n)).sum::<f64>())
}

/// Running statistics of the left and right halves while sweeping a sorted feature.
enum Sweep<'a> {
    SquaredError {
        y: &'a [f64],
        left: (f64, f64, f64),
        right: (f64, f64, f64),
    },
    Gini {
        codes: &'a [usize],
        left: Vec<f64>,
        right: Vec<f64>,
        n_left: f64,
        n_right: f64,
    },
}

impl<'a> Sweep<'a> {
    fn new(criterion: Criterion<'a>, samples: &[usize]) -> Self {
        match criterion {
            Criterion::SquaredError(y) => {
                let mut right = (0.0, 0.0, 0.0);
                for &i in samples {
                    right.0 += 1.0;
                    right.1 += y[i];
                    right.2 += y[i] * y[i];
                }
                Sweep::SquaredError {
                    y,
                    left: (0.0, 0.0, 0.0),
                    right,
                }
            }
            Criterion::Gini { codes, n_classes } => {
                let mut right = vec![0.0; n_classes];
                for &i in samples {
                    right[codes[i]] += 1.0;
                }
                Sweep::Gini {
                    codes,
                    left: vec![0.0; n_classes],
                    right,
                    n_left: 0.0,
                    n_right: samples.len() as f64,
                }
            }
        }
    }

    fn move_left(&mut self, sample: usize) {
        match self {
            Sweep::SquaredError { y, left, right } => {
                let v = y[sample];
                left.0 += 1.0;
                left.1 += v;
                left.2 += v * v;
                right.0 -= 1.0;
                right.1 -= v;
                right.2 -= v * v;
            }
            Sweep::Gini {
                codes,
                left,
                right,
                n_left,
                n_right,
            } => {
                left[codes[sample]] += 1.0;
                right[codes[sample]] -= 1.0;
                *n_left += 1.0;
                *n_right -= 1.0;
            }
        }
    }

    /// Total impurity of the two halves.
    fn impurity(&self) -> f64 {
        match self {
            Sweep::SquaredError { left, right, .. } => {
                let sse = |(n, s, sq): (f64, f64, f64)| {
                    if n == 0.0 {
                        0.0
                    } else {
                        (sq - s * s / n).max(0.0)
                    }
                };
                sse(*left) + sse(*right)
            }
            Sweep::Gini {
                left,
                right,
                n_left,
                n_right,
                ..
            } => gini_total(left, *n_left) + gini_total(right, *n_right),
        }
    }
}

/// Validated inputs of a regression tree or forest.
pub(crate) fn regression_inputs(
    name: &str,
    x: &ArrayView2<'_, f64>,
    y: Option<&Targets>,
) -> Result<Vec<f64>, EstimatorError> {
    check_fit_input(name, x, y)?;
    check_finite(name, x)?;
    Ok(values_target(name, y)?.to_vec())
}

/// Validated inputs of a classification tree or forest: classes and codes.
pub(crate) fn classification_inputs(
    name: &str,
    x: &ArrayView2<'_, f64>,
    y: Option<&Targets>,
) -> Result<(Vec<String>, Vec<usize>), EstimatorError> {
    check_fit_input(name, x, y)?;
    check_finite(name, x)?;
    Ok(encode_labels(labels_target(name, y)?))
}

pub(crate) fn labels_from_proba(classes: &[String], proba: &Array2<f64>) -> Targets {
    Targets::Labels(
        argmax_rows(proba)
            .into_iter()
            .map(|i| classes[i].clone())
            .collect(),
    )
}

/// A regression tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    config: TreeConfig,
    fitted: Option<Tree>,
}

impl DecisionTreeRegressor {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.fitted.as_ref()
    }
}

impl NativeType for DecisionTreeRegressor {
    const NAME: &'static str = "DecisionTreeRegressor";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for DecisionTreeRegressor {
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
        self.fitted.as_ref().map(Tree::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        self.config.validate()?;
        let y = regression_inputs(Self::NAME, &x, y)?;
        let mut rng = self.config.rng();
        let tree = Tree::grow(
            &x,
            (0..x.nrows()).collect(),
            Criterion::SquaredError(&y),
            &self.config,
            &mut rng,
        );
        tracing::debug!(estimator = Self::NAME, depth = tree.depth(), "fitted");
        self.fitted = Some(tree);
        Ok(())
    }

    fn predict(&self, x: ArrayViewD<'_, f64>) -> Result<Targets, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let tree = check_is_fitted(Self::NAME, &self.fitted)?;
        let values: Array1<f64> = x.rows().into_iter().map(|r| tree.leaf_value(r)[0]).collect();
        Ok(Targets::Values(values))
    }

    fn clone_unfitted(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.unfitted())
    }

    fn box_clone(&self) -> Box<dyn NativeEstimator> {
        Box::new(self.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ClassifierTree {
    tree: Tree,
    classes: Vec<String>,
}

/// A classification tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    config: TreeConfig,
    fitted: Option<ClassifierTree>,
}

impl DecisionTreeClassifier {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.fitted.as_ref().map(|f| &f.tree)
    }
}

impl NativeType for DecisionTreeClassifier {
    const NAME: &'static str = "DecisionTreeClassifier";

    fn unfitted(&self) -> Self {
        Self::new(self.config.clone())
    }
}

impl NativeEstimator for DecisionTreeClassifier {
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
        self.tree().map(Tree::n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        self.config.validate()?;
        let (classes, codes) = classification_inputs(Self::NAME, &x, y)?;
        let mut rng = self.config.rng();
        let tree = Tree::grow(
            &x,
            (0..x.nrows()).collect(),
            Criterion::Gini {
                codes: &codes,
                n_classes: classes.len(),
            },
            &self.config,
            &mut rng,
        );
        tracing::debug!(estimator = Self::NAME, depth = tree.depth(), "fitted");
        self.fitted = Some(ClassifierTree { tree, classes });
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
        Ok(fitted.tree.predict_values(&x, fitted.classes.len()))
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
