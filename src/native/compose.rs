//! ColumnTransformer: different transformers on different column subsets.
//!
//! Each step selects columns, applies a transformer (or passes them through
//! or drops them), and the step outputs are concatenated side by side in
//! step order. Columns no step selects are handled by the remainder.

use crate::error::EstimatorError;
use crate::native::validation::{check_fit_input, check_is_fitted, check_predict_input};
use crate::native::{EstimatorKind, NativeEstimator, NativeType, Targets};
use ndarray::{concatenate, Array2, ArrayView2, ArrayViewD, Axis};
use std::ops::Range;

/// Specifies which columns a step applies to.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnSelector {
    /// Specific column positions.
    Indices(Vec<usize>),
    /// A range of column positions.
    Range(Range<usize>),
    /// Every column.
    All,
    /// Column names. Arrays have no names, so fitting on an array fails.
    Names(Vec<String>),
}

impl ColumnSelector {
    /// Convenience constructor for name selection.
    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        ColumnSelector::Names(names.into_iter().map(Into::into).collect())
    }

    /// Resolve to column positions of an input with `n_features` columns.
    fn resolve(&self, n_features: usize) -> Result<Vec<usize>, EstimatorError> {
        let columns = match self {
            ColumnSelector::Indices(indices) => indices.clone(),
            ColumnSelector::Range(range) => range.clone().collect(),
            ColumnSelector::All => (0..n_features).collect(),
            ColumnSelector::Names(_) => {
                return Err(EstimatorError::InvalidParameter(
                    "Specifying the columns using strings is only supported for dataframes."
                        .to_string(),
                ))
            }
        };
        if let Some(&bad) = columns.iter().find(|&&c| c >= n_features) {
            return Err(EstimatorError::InvalidParameter(format!(
                "Column index {} out of bounds for input with {} columns",
                bad, n_features
            )));
        }
        Ok(columns)
    }
}

/// What a step does with its columns.
#[derive(Clone, Debug)]
pub enum ColumnAction {
    Transformer(Box<dyn NativeEstimator>),
    Passthrough,
    Drop,
}

impl ColumnAction {
    fn unfitted(&self) -> Self {
        match self {
            ColumnAction::Transformer(t) => ColumnAction::Transformer(t.clone_unfitted()),
            ColumnAction::Passthrough => ColumnAction::Passthrough,
            ColumnAction::Drop => ColumnAction::Drop,
        }
    }
}

/// One step: a name, an action and a column selection.
#[derive(Clone, Debug)]
pub struct ColumnStep {
    pub name: String,
    pub action: ColumnAction,
    pub columns: ColumnSelector,
}

#[derive(Clone, Debug)]
struct FittedStep {
    name: String,
    /// `None` for passthrough.
    transformer: Option<Box<dyn NativeEstimator>>,
    columns: Vec<usize>,
}

#[derive(Clone, Debug)]
struct FittedColumns {
    steps: Vec<FittedStep>,
    n_features: usize,
}

/// Applies transformers to column subsets and concatenates the results.
#[derive(Clone, Debug)]
pub struct ColumnTransformer {
    steps: Vec<ColumnStep>,
    remainder: ColumnAction,
    fitted: Option<FittedColumns>,
}

impl Default for ColumnTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnTransformer {
    /// An empty transformer whose remainder is dropped.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            remainder: ColumnAction::Drop,
            fitted: None,
        }
    }

    /// Add a step.
    pub fn add(
        mut self,
        name: impl Into<String>,
        action: ColumnAction,
        columns: ColumnSelector,
    ) -> Self {
        self.steps.push(ColumnStep {
            name: name.into(),
            action,
            columns,
        });
        self
    }

    /// Add a transformer step.
    pub fn add_transformer<T: NativeEstimator + 'static>(
        self,
        name: impl Into<String>,
        transformer: T,
        columns: ColumnSelector,
    ) -> Self {
        self.add(name, ColumnAction::Transformer(Box::new(transformer)), columns)
    }

    /// Set what happens to the columns no step selects.
    pub fn with_remainder(mut self, remainder: ColumnAction) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn steps(&self) -> &[ColumnStep] {
        &self.steps
    }

    pub fn remainder(&self) -> &ColumnAction {
        &self.remainder
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of the fitted steps with the columns each one reads.
    pub fn step_columns(&self) -> Option<Vec<(&str, &[usize])>> {
        self.fitted.as_ref().map(|f| {
            f.steps
                .iter()
                .map(|s| (s.name.as_str(), s.columns.as_slice()))
                .collect()
        })
    }

    fn fit_step(
        name: &str,
        action: &ColumnAction,
        columns: Vec<usize>,
        x: &ArrayView2<'_, f64>,
    ) -> Result<Option<FittedStep>, EstimatorError> {
        let transformer = match action {
            ColumnAction::Drop => return Ok(None),
            ColumnAction::Passthrough => None,
            ColumnAction::Transformer(t) => {
                if t.kind() != EstimatorKind::Transformer {
                    return Err(EstimatorError::InvalidParameter(format!(
                        "All steps of ColumnTransformer should be transformers, \
                         'passthrough' or 'drop'; '{}' is a {}",
                        name,
                        t.kind()
                    )));
                }
                let mut fitted = t.clone_unfitted();
                fitted.fit(x.select(Axis(1), &columns).view(), None)?;
                Some(fitted)
            }
        };
        Ok(Some(FittedStep {
            name: name.to_string(),
            transformer,
            columns,
        }))
    }
}

impl NativeType for ColumnTransformer {
    const NAME: &'static str = "ColumnTransformer";

    fn unfitted(&self) -> Self {
        Self {
            steps: self
                .steps
                .iter()
                .map(|s| ColumnStep {
                    name: s.name.clone(),
                    action: s.action.unfitted(),
                    columns: s.columns.clone(),
                })
                .collect(),
            remainder: self.remainder.unfitted(),
            fitted: None,
        }
    }

    /// Name selections become position selections.
    fn unfitted_for_columns(&self, columns: &[String]) -> Result<Self, EstimatorError> {
        let mut bound = self.unfitted();
        for step in &mut bound.steps {
            if let ColumnSelector::Names(names) = &step.columns {
                let positions = names
                    .iter()
                    .map(|n| {
                        columns
                            .iter()
                            .position(|c| c == n)
                            .ok_or_else(|| EstimatorError::MissingColumn(n.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                step.columns = ColumnSelector::Indices(positions);
            }
        }
        Ok(bound)
    }
}

impl NativeEstimator for ColumnTransformer {
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
        self.fitted.as_ref().map(|f| f.n_features)
    }

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: Option<&Targets>) -> Result<(), EstimatorError> {
        check_fit_input(Self::NAME, &x, y)?;
        let n_features = x.ncols();

        let mut used = vec![false; n_features];
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        for step in &self.steps {
            let columns = step.columns.resolve(n_features)?;
            for &c in &columns {
                used[c] = true;
            }
            if let Some(fitted) = Self::fit_step(&step.name, &step.action, columns, &x)? {
                steps.push(fitted);
            }
        }

        let rest: Vec<usize> = (0..n_features).filter(|&c| !used[c]).collect();
        if !rest.is_empty() {
            if let Some(fitted) = Self::fit_step("remainder", &self.remainder, rest, &x)? {
                steps.push(fitted);
            }
        }

        tracing::debug!(estimator = Self::NAME, n_steps = steps.len(), n_features, "fitted");
        self.fitted = Some(FittedColumns { steps, n_features });
        Ok(())
    }

    fn transform(&self, x: ArrayViewD<'_, f64>) -> Result<Array2<f64>, EstimatorError> {
        let x = check_predict_input(Self::NAME, &self.fitted, self.n_features_in(), x)?;
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;

        let blocks = fitted
            .steps
            .iter()
            .map(|step| {
                let selected = x.select(Axis(1), &step.columns);
                match &step.transformer {
                    Some(t) => t.transform(selected.view().into_dyn()),
                    None => Ok(selected),
                }
            })
            .collect::<Result<Vec<_>, EstimatorError>>()?;

        if blocks.is_empty() {
            return Ok(Array2::zeros((x.nrows(), 0)));
        }
        let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|b| b.view()).collect();
        concatenate(Axis(1), &views).map_err(|e| EstimatorError::InvalidShape {
            expected: format!("{} rows per step output", x.nrows()),
            got: e.to_string(),
        })
    }

    /// Output names of every step in order, without step-name prefixes.
    fn feature_names_out(&self, input_features: &[String]) -> Result<Vec<String>, EstimatorError> {
        let fitted = check_is_fitted(Self::NAME, &self.fitted)?;
        let mut names = Vec::new();
        for step in &fitted.steps {
            let selected: Vec<String> = step
                .columns
                .iter()
                .map(|&c| {
                    input_features.get(c).cloned().ok_or_else(|| {
                        EstimatorError::InvalidParameter(format!(
                            "input_features has {} names, column {} requested",
                            input_features.len(),
                            c
                        ))
                    })
                })
                .collect::<Result<_, _>>()?;
            match &step.transformer {
                Some(t) => names.extend(t.feature_names_out(&selected)?),
                None => names.extend(selected),
            }
        }
        Ok(names)
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
    use crate::native::linear_model::LinearRegression;
    use crate::native::preprocessing::{ImputeStrategy, MinMaxScaler, SimpleImputer, StandardScaler};
    use ndarray::array;

    fn create_test_data() -> Array2<f64> {
        array![[1.0, 10.0, 100.0], [2.0, 20.0, 200.0], [3.0, 30.0, 300.0]]
    }

    #[test]
    fn test_column_transformer_basic() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new()
            .add_transformer("scale", StandardScaler::default(), ColumnSelector::Indices(vec![0]))
            .add_transformer("minmax", MinMaxScaler::default(), ColumnSelector::Indices(vec![1]));
        ct.fit(data.view(), None).unwrap();

        // The third column falls to the default remainder, which drops it.
        let out = ct.transform(data.view().into_dyn()).unwrap();
        assert_eq!(out.dim(), (3, 2));
        assert_eq!(out[[2, 1]], 1.0);
    }

    #[test]
    fn test_column_transformer_remainder_passthrough() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new()
            .add_transformer("minmax", MinMaxScaler::default(), ColumnSelector::Range(1..2))
            .with_remainder(ColumnAction::Passthrough);
        ct.fit(data.view(), None).unwrap();

        let out = ct.transform(data.view().into_dyn()).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![0.0, 1.0, 100.0]);
        let step_columns = ct.step_columns().unwrap();
        assert_eq!(step_columns[1], ("remainder", &[0usize, 2][..]));
    }

    #[test]
    fn test_column_transformer_feature_names_out() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new()
            .add("keep", ColumnAction::Passthrough, ColumnSelector::Indices(vec![2]))
            .add("gone", ColumnAction::Drop, ColumnSelector::Indices(vec![1]))
            .add_transformer(
                "impute",
                SimpleImputer::new(ImputeStrategy::Median),
                ColumnSelector::Indices(vec![0]),
            );
        ct.fit(data.view(), None).unwrap();
        let inputs: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            ct.feature_names_out(&inputs).unwrap(),
            vec!["c".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_column_transformer_names_need_a_frame() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new().add_transformer(
            "scale",
            StandardScaler::default(),
            ColumnSelector::names(["a"]),
        );
        let err = ct.fit(data.view(), None).unwrap_err();
        assert_eq!(
            err,
            EstimatorError::InvalidParameter(
                "Specifying the columns using strings is only supported for dataframes."
                    .to_string()
            )
        );
    }

    #[test]
    fn test_column_transformer_column_out_of_bounds() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new().add_transformer(
            "scale",
            StandardScaler::default(),
            ColumnSelector::Indices(vec![5]),
        );
        assert!(matches!(
            ct.fit(data.view(), None),
            Err(EstimatorError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_column_transformer_rejects_learner_step() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new().add_transformer(
            "lr",
            LinearRegression::default(),
            ColumnSelector::All,
        );
        assert!(ct.fit(data.view(), None).is_err());
    }

    #[test]
    fn test_column_transformer_feature_mismatch_and_not_fitted() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new().with_remainder(ColumnAction::Passthrough);
        assert!(ct.transform(data.view().into_dyn()).unwrap_err().is_not_fitted());

        ct.fit(data.view(), None).unwrap();
        let narrow = array![[1.0, 2.0]];
        assert!(matches!(
            ct.transform(narrow.view().into_dyn()),
            Err(EstimatorError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_unfitted_clone_resets_steps() {
        let data = create_test_data();
        let mut ct = ColumnTransformer::new().add_transformer(
            "scale",
            StandardScaler::default(),
            ColumnSelector::All,
        );
        ct.fit(data.view(), None).unwrap();
        let fresh = ct.unfitted();
        assert!(!fresh.is_fitted());
        match &fresh.steps()[0].action {
            ColumnAction::Transformer(t) => assert!(!t.is_fitted()),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_names_resolve_against_columns() {
        let data = create_test_data();
        let columns: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let ct = ColumnTransformer::new()
            .add_transformer("scale", StandardScaler::default(), ColumnSelector::names(["c", "a"]));

        let mut bound = ct.unfitted_for_columns(&columns).unwrap();
        assert_eq!(bound.steps()[0].columns, ColumnSelector::Indices(vec![2, 0]));
        bound.fit(data.view(), None).unwrap();
        assert_eq!(bound.transform(data.view().into_dyn()).unwrap().ncols(), 2);

        let missing = ColumnTransformer::new()
            .add("keep", ColumnAction::Passthrough, ColumnSelector::names(["zzz"]))
            .unfitted_for_columns(&columns);
        assert_eq!(missing.unwrap_err(), EstimatorError::MissingColumn("zzz".to_string()));
    }
}
