//! Stacked generalization on labeled frames.
//!
//! A stacking estimator fits its members, then fits a final estimator on
//! the members' out-of-fold predictions. Members may be any frame learner,
//! pipelines included, because the stack never hands them to a native
//! implementation.
//!
//! Meta-feature columns are named after the members: a regressor member
//! contributes one column named after itself, a classifier member one
//! column per class named `{member}_{class}`. For two classes the first
//! class column is left out. With `passthrough`, the original features
//! follow the member columns.

use crate::classification::LogisticRegressionDF;
use crate::error::EstimatorError;
use crate::frame::Frame;
use crate::native::model_selection::{Fold, KFold, StratifiedKFold};
use crate::native::validation::encode_labels;
use crate::native::EstimatorKind;
use crate::registry::{ClassInfo, Namespace};
use crate::regression::RidgeCVDF;
use crate::wrapper::{
    Classification, EstimatorDF, LearnerDF, LearnerRole, Prediction, Regression, Target,
};
use ndarray::{Array2, Axis};
use std::collections::HashSet;
use std::marker::PhantomData;

/// Role-specific parts of a stacking estimator.
pub trait StackingRole: LearnerRole {
    const NAME: &'static str;

    fn default_final_estimator() -> Box<dyn EstimatorDF>;

    /// Cross-validation folds for `y`, with the sorted classes of a
    /// classification target (empty for regression).
    fn folds(y: &Target, cv: usize) -> Result<(Vec<Fold>, Vec<String>), EstimatorError>;

    /// Meta-feature names and values a fitted member contributes for `x`.
    fn member_features(
        name: &str,
        member: &dyn LearnerDF,
        x: &Frame,
        classes: &[String],
    ) -> Result<(Vec<String>, Array2<f64>), EstimatorError>;
}

impl StackingRole for Regression {
    const NAME: &'static str = "StackingRegressorDF";

    fn default_final_estimator() -> Box<dyn EstimatorDF> {
        Box::new(RidgeCVDF::default())
    }

    fn folds(y: &Target, cv: usize) -> Result<(Vec<Fold>, Vec<String>), EstimatorError> {
        Ok((KFold::new(cv).split(y.n_samples())?, Vec::new()))
    }

    fn member_features(
        name: &str,
        member: &dyn LearnerDF,
        x: &Frame,
        _classes: &[String],
    ) -> Result<(Vec<String>, Array2<f64>), EstimatorError> {
        let prediction = member.predict(x)?;
        let values = prediction.as_values().ok_or_else(|| {
            EstimatorError::InvalidParameter(format!(
                "stacked regressor '{}' must predict a single continuous output",
                name
            ))
        })?;
        Ok((
            vec![name.to_string()],
            values.values().clone().insert_axis(Axis(1)),
        ))
    }
}

impl StackingRole for Classification {
    const NAME: &'static str = "StackingClassifierDF";

    fn default_final_estimator() -> Box<dyn EstimatorDF> {
        Box::new(LogisticRegressionDF::default())
    }

    fn folds(y: &Target, cv: usize) -> Result<(Vec<Fold>, Vec<String>), EstimatorError> {
        let name = <Self as StackingRole>::NAME;
        let labels = y
            .as_labels()
            .ok_or_else(|| EstimatorError::invalid_target(name, "class labels"))?;
        let (classes, codes) = encode_labels(labels.values());
        Ok((StratifiedKFold::new(cv).split(&codes)?, classes))
    }

    fn member_features(
        name: &str,
        member: &dyn LearnerDF,
        x: &Frame,
        classes: &[String],
    ) -> Result<(Vec<String>, Array2<f64>), EstimatorError> {
        let proba = member.predict_proba(x)?;
        let kept = if classes.len() == 2 {
            &classes[1..]
        } else {
            classes
        };

        // A member fitted on a fold may not have seen every class.
        let mut values = Array2::zeros((x.n_rows(), kept.len()));
        for (j, class) in kept.iter().enumerate() {
            if let Some(pos) = proba.column_position(class) {
                values.column_mut(j).assign(&proba.values().column(pos));
            }
        }
        let names = kept.iter().map(|c| format!("{}_{}", name, c)).collect();
        Ok((names, values))
    }
}

/// A member of a stacking estimator, or a dropped slot.
#[derive(Clone, Debug)]
pub enum StackMember {
    Estimator(Box<dyn EstimatorDF>),
    Drop,
}

impl StackMember {
    pub fn estimator<E: EstimatorDF + 'static>(estimator: E) -> Self {
        StackMember::Estimator(Box::new(estimator))
    }
}

impl From<Box<dyn EstimatorDF>> for StackMember {
    fn from(estimator: Box<dyn EstimatorDF>) -> Self {
        StackMember::Estimator(estimator)
    }
}

#[derive(Clone, Debug)]
struct FittedStack {
    members: Vec<(String, Box<dyn EstimatorDF>)>,
    final_estimator: Box<dyn EstimatorDF>,
    feature_names_in: Vec<String>,
    classes: Vec<String>,
}

/// Stacked learners with a final estimator trained on their predictions.
#[derive(Clone, Debug)]
pub struct StackingDF<R> {
    estimators: Vec<(String, StackMember)>,
    final_estimator: Box<dyn EstimatorDF>,
    cv: usize,
    passthrough: bool,
    fitted: Option<FittedStack>,
    _role: PhantomData<R>,
}

pub type StackingRegressorDF = StackingDF<Regression>;
pub type StackingClassifierDF = StackingDF<Classification>;

impl<R: StackingRole> StackingDF<R> {
    /// Stack the given members with the default final estimator and 5 folds.
    ///
    /// # Errors
    /// Returns [`EstimatorError::InvalidParameter`] for duplicate member
    /// names or a member that is not a learner of this role.
    pub fn new<S: Into<String>>(
        estimators: Vec<(S, StackMember)>,
    ) -> Result<Self, EstimatorError> {
        let estimators: Vec<(String, StackMember)> =
            estimators.into_iter().map(|(n, m)| (n.into(), m)).collect();

        let mut seen = HashSet::new();
        for (name, member) in &estimators {
            if !seen.insert(name.as_str()) {
                return Err(EstimatorError::InvalidParameter(format!(
                    "{} member names must be unique; '{}' is repeated",
                    R::NAME,
                    name
                )));
            }
            if let StackMember::Estimator(estimator) = member {
                Self::check_role("member", name, estimator.as_ref())?;
            }
        }

        Ok(Self {
            estimators,
            final_estimator: R::default_final_estimator(),
            cv: 5,
            passthrough: false,
            fitted: None,
            _role: PhantomData,
        })
    }

    fn check_role(
        what: &str,
        name: &str,
        estimator: &dyn EstimatorDF,
    ) -> Result<(), EstimatorError> {
        if estimator.kind() != R::KIND || estimator.as_learner().is_none() {
            return Err(EstimatorError::InvalidParameter(format!(
                "{} {} '{}' must be a {}, but got {} ({})",
                R::NAME,
                what,
                name,
                R::KIND,
                estimator.class_name(),
                estimator.kind()
            )));
        }
        Ok(())
    }

    /// # Errors
    /// Returns [`EstimatorError::InvalidParameter`] if `final_estimator` is
    /// not a learner of this role.
    pub fn with_final_estimator(
        mut self,
        final_estimator: Box<dyn EstimatorDF>,
    ) -> Result<Self, EstimatorError> {
        Self::check_role("final estimator", "final_estimator", final_estimator.as_ref())?;
        self.final_estimator = final_estimator;
        self.fitted = None;
        Ok(self)
    }

    /// Number of cross-validation folds for the meta-features.
    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self.fitted = None;
        self
    }

    /// Whether the final estimator also sees the original features.
    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self.fitted = None;
        self
    }

    pub fn estimators(&self) -> &[(String, StackMember)] {
        &self.estimators
    }

    /// The configured final estimator; never fitted.
    pub fn final_estimator(&self) -> &dyn EstimatorDF {
        self.final_estimator.as_ref()
    }

    /// The clone of the final estimator fitted on the meta-features.
    pub fn fitted_final_estimator(&self) -> Option<&dyn EstimatorDF> {
        self.fitted.as_ref().map(|f| f.final_estimator.as_ref())
    }

    /// Members refitted on the full training data; dropped members are absent.
    pub fn fitted_estimators(&self) -> Option<&[(String, Box<dyn EstimatorDF>)]> {
        self.fitted.as_ref().map(|f| f.members.as_slice())
    }

    pub fn cv(&self) -> usize {
        self.cv
    }

    pub fn passthrough(&self) -> bool {
        self.passthrough
    }

    fn fitted_state(&self) -> Result<&FittedStack, EstimatorError> {
        self.fitted
            .as_ref()
            .ok_or_else(|| EstimatorError::not_fitted(R::NAME))
    }

    fn as_member_learner<'a>(
        name: &str,
        member: &'a dyn EstimatorDF,
    ) -> Result<&'a dyn LearnerDF, EstimatorError> {
        member.as_learner().ok_or_else(|| {
            EstimatorError::InvalidParameter(format!("{} member '{}' is not a learner", R::NAME, name))
        })
    }

    /// Out-of-fold meta-features of one member.
    fn cross_val_features(
        name: &str,
        member: &dyn EstimatorDF,
        x: &Frame,
        y: &Target,
        folds: &[Fold],
        classes: &[String],
    ) -> Result<Frame, EstimatorError> {
        let mut out_of_fold: Option<(Vec<String>, Array2<f64>)> = None;
        for (train, test) in folds {
            let mut estimator = member.clone_unfitted();
            estimator.fit(&x.take_rows(train), Some(&y.take(train)))?;
            let learner = Self::as_member_learner(name, estimator.as_ref())?;
            let (names, values) =
                R::member_features(name, learner, &x.take_rows(test), classes)?;

            let n_cols = values.ncols();
            let (_, all) =
                out_of_fold.get_or_insert_with(|| (names, Array2::zeros((x.n_rows(), n_cols))));
            for (row, &i) in test.iter().enumerate() {
                all.row_mut(i).assign(&values.row(row));
            }
        }
        let (names, values) = out_of_fold
            .ok_or_else(|| EstimatorError::EmptyData("no cross-validation folds".to_string()))?;
        Frame::new(names, values)
    }

    fn meta_features(&self, fitted: &FittedStack, x: &Frame) -> Result<Frame, EstimatorError> {
        let mut blocks = Vec::with_capacity(fitted.members.len() + 1);
        for (name, member) in &fitted.members {
            let learner = Self::as_member_learner(name, member.as_ref())?;
            let (names, values) = R::member_features(name, learner, x, &fitted.classes)?;
            blocks.push(Frame::new(names, values)?);
        }
        if self.passthrough {
            blocks.push(x.select(&fitted.feature_names_in)?);
        }
        Frame::hconcat(&blocks)?.with_index(x.index().clone())
    }
}

/// Meta-features are selected by name at predict time, so names must not repeat.
fn check_unique_columns(meta: &Frame) -> Result<(), EstimatorError> {
    let mut seen = HashSet::with_capacity(meta.n_cols());
    match meta.columns().iter().find(|name| !seen.insert(name.as_str())) {
        Some(name) => Err(EstimatorError::InvalidParameter(format!(
            "meta-feature '{}' appears more than once; rename the member or the input column",
            name
        ))),
        None => Ok(()),
    }
}

impl<R: StackingRole> EstimatorDF for StackingDF<R> {
    fn class_name(&self) -> &'static str {
        R::NAME
    }

    fn kind(&self) -> EstimatorKind {
        R::KIND
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.feature_names_in.as_slice())
    }

    fn fit(&mut self, x: &Frame, y: Option<&Target>) -> Result<(), EstimatorError> {
        self.fitted = None;
        let y = y.ok_or_else(|| EstimatorError::invalid_target(R::NAME, "a target for fitting"))?;
        if y.n_samples() != x.n_rows() {
            return Err(EstimatorError::InvalidShape {
                expected: format!("{} target rows", x.n_rows()),
                got: format!("{} target rows", y.n_samples()),
            });
        }

        let active: Vec<(&String, &Box<dyn EstimatorDF>)> = self
            .estimators
            .iter()
            .filter_map(|(name, member)| match member {
                StackMember::Estimator(estimator) => Some((name, estimator)),
                StackMember::Drop => None,
            })
            .collect();
        if active.is_empty() {
            return Err(EstimatorError::InvalidParameter(
                "All estimators are dropped. At least one is required to be an estimator."
                    .to_string(),
            ));
        }

        let (folds, classes) = R::folds(y, self.cv)?;
        let mut blocks = Vec::with_capacity(active.len() + 1);
        let mut members = Vec::with_capacity(active.len());
        for (name, estimator) in active {
            blocks.push(Self::cross_val_features(
                name,
                estimator.as_ref(),
                x,
                y,
                &folds,
                &classes,
            )?);

            let mut member = estimator.clone_unfitted();
            member.fit(x, Some(y))?;
            members.push((name.clone(), member));
        }
        if self.passthrough {
            blocks.push(x.clone());
        }
        let meta = Frame::hconcat(&blocks)?.with_index(x.index().clone())?;
        check_unique_columns(&meta)?;

        let mut final_estimator = self.final_estimator.clone_unfitted();
        final_estimator.fit(&meta, Some(y))?;
        tracing::debug!(
            estimator = R::NAME,
            n_members = members.len(),
            n_meta_features = meta.n_cols(),
            "fitted"
        );

        self.fitted = Some(FittedStack {
            members,
            final_estimator,
            feature_names_in: x.columns().to_vec(),
            classes,
        });
        Ok(())
    }

    fn as_learner(&self) -> Option<&dyn LearnerDF> {
        Some(self)
    }

    fn clone_unfitted(&self) -> Box<dyn EstimatorDF> {
        Box::new(Self {
            estimators: self
                .estimators
                .iter()
                .map(|(name, member)| {
                    let member = match member {
                        StackMember::Estimator(e) => StackMember::Estimator(e.clone_unfitted()),
                        StackMember::Drop => StackMember::Drop,
                    };
                    (name.clone(), member)
                })
                .collect(),
            final_estimator: self.final_estimator.clone_unfitted(),
            cv: self.cv,
            passthrough: self.passthrough,
            fitted: None,
            _role: PhantomData,
        })
    }

    fn box_clone(&self) -> Box<dyn EstimatorDF> {
        Box::new(self.clone())
    }
}

impl<R: StackingRole> LearnerDF for StackingDF<R> {
    fn predict(&self, x: &Frame) -> Result<Prediction, EstimatorError> {
        let fitted = self.fitted_state()?;
        let meta = self.meta_features(fitted, x)?;
        Self::as_member_learner("final_estimator", fitted.final_estimator.as_ref())?.predict(&meta)
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        let fitted = self.fitted_state()?;
        let meta = self.meta_features(fitted, x)?;
        Self::as_member_learner("final_estimator", fitted.final_estimator.as_ref())?
            .predict_proba(&meta)
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted
            .as_ref()
            .filter(|f| !f.classes.is_empty())
            .map(|f| f.classes.as_slice())
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.stacking")
        .with_class(ClassInfo::class::<StackMember>("StackMember"))
        .with_class(ClassInfo::class::<StackingRegressorDF>("StackingRegressorDF"))
        .with_class(ClassInfo::class::<StackingClassifierDF>("StackingClassifierDF"))
}
