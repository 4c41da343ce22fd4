//! Frame-aware classifiers.
//!
//! Targets are [`Series`](crate::frame::Series) of string labels (or frames of
//! labels for multi-output classifiers). `predict_proba` returns one column
//! per class label, sorted.

use crate::error::EstimatorError;
use crate::native::ensemble::{RandomForestClassifier, Voting, VotingClassifier};
use crate::native::linear_model::{LogisticRegression, LogisticRegressionCV};
use crate::native::multioutput::{ClassifierChain, MultiOutputClassifier};
use crate::native::tree::DecisionTreeClassifier;
use crate::registry::{ClassInfo, Namespace};
use crate::wrapper::{df_wrapper, ensure_simple_learner, ensure_simple_learners, SubEstimator};

pub use crate::stacking::StackingClassifierDF;

df_wrapper!(LogisticRegressionDF = LearnerWrapperDF<LogisticRegression>);
df_wrapper!(
    /// Logistic regression with `C` chosen by stratified cross-validation.
    LogisticRegressionCVDF = LearnerWrapperDF<LogisticRegressionCV>
);
df_wrapper!(DecisionTreeClassifierDF = LearnerWrapperDF<DecisionTreeClassifier>);
df_wrapper!(RandomForestClassifierDF = LearnerWrapperDF<RandomForestClassifier>);
df_wrapper!(
    /// Majority (hard) or probability-averaging (soft) vote of its members.
    VotingClassifierDF = LearnerWrapperDF<VotingClassifier>
);
df_wrapper!(MultiOutputClassifierDF = LearnerWrapperDF<MultiOutputClassifier>);
df_wrapper!(
    /// One classifier per label column; earlier labels are features of later links.
    ClassifierChainDF = LearnerWrapperDF<ClassifierChain>
);

impl VotingClassifierDF {
    /// # Errors
    /// Returns [`EstimatorError::UnsupportedMember`] if a member is not a
    /// simple frame learner.
    pub fn from_estimators<S: Into<String>>(
        estimators: Vec<(S, SubEstimator)>,
    ) -> Result<Self, EstimatorError> {
        Ok(Self::new(VotingClassifier::new(ensure_simple_learners(estimators)?)))
    }

    pub fn with_voting(self, voting: Voting) -> Self {
        Self::new(self.into_delegate().with_voting(voting))
    }

    pub fn with_weights(self, weights: Vec<f64>) -> Self {
        Self::new(self.into_delegate().with_weights(weights))
    }
}

impl MultiOutputClassifierDF {
    /// # Errors
    /// Returns [`EstimatorError::UnsupportedMember`] if `estimator` is not a
    /// simple frame learner.
    pub fn from_estimator(estimator: SubEstimator) -> Result<Self, EstimatorError> {
        Ok(Self::new(MultiOutputClassifier::new(ensure_simple_learner(&estimator)?)))
    }
}

impl ClassifierChainDF {
    /// # Errors
    /// Returns [`EstimatorError::UnsupportedMember`] if `base_estimator` is not
    /// a simple frame learner.
    pub fn from_base_estimator(base_estimator: SubEstimator) -> Result<Self, EstimatorError> {
        Ok(Self::new(ClassifierChain::new(ensure_simple_learner(&base_estimator)?)))
    }

    pub fn with_order(self, order: Vec<usize>) -> Self {
        Self::new(self.into_delegate().with_order(order))
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.classification")
        .with_class(ClassInfo::default_wrapper::<LogisticRegressionDF>())
        .with_class(ClassInfo::default_wrapper::<LogisticRegressionCVDF>())
        .with_class(ClassInfo::default_wrapper::<DecisionTreeClassifierDF>())
        .with_class(ClassInfo::default_wrapper::<RandomForestClassifierDF>())
        .with_class(ClassInfo::wrapper::<VotingClassifierDF>())
        .with_class(ClassInfo::wrapper::<MultiOutputClassifierDF>())
        .with_class(ClassInfo::wrapper::<ClassifierChainDF>())
        .with_class(ClassInfo::class::<StackingClassifierDF>("StackingClassifierDF"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Series};
    use crate::native::ensemble::RandomForestConfig;
    use crate::native::preprocessing::SimpleImputer;
    use crate::wrapper::{EstimatorDF, LearnerDF, Target};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn create_test_data() -> (Frame, Target) {
        let x = Frame::new(
            ["f1", "f2"],
            array![
                [0.0, 0.1],
                [0.2, 0.0],
                [0.1, 0.3],
                [0.3, 0.2],
                [3.0, 3.1],
                [3.2, 2.9],
                [2.9, 3.3],
                [3.1, 3.0]
            ],
        )
        .unwrap();
        let labels = ["a", "a", "a", "a", "b", "b", "b", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        (x, Series::from_vec(Some("label"), labels).into())
    }

    fn seeded_forest() -> RandomForestClassifierDF {
        RandomForestClassifierDF::new(RandomForestClassifier::new(
            RandomForestConfig::default()
                .with_n_estimators(10)
                .with_random_state(42),
        ))
    }

    #[test]
    fn test_soft_voting_proba() {
        let (x, y) = create_test_data();
        let mut voting = VotingClassifierDF::from_estimators(vec![
            ("rf", SubEstimator::frame(seeded_forest())),
            ("lr", SubEstimator::frame(LogisticRegressionDF::default())),
        ])
        .unwrap()
        .with_voting(Voting::Soft);
        voting.fit(&x, Some(&y)).unwrap();

        let proba = voting.predict_proba(&x).unwrap();
        assert_eq!(proba.columns(), &["a", "b"]);
        for row in proba.values().rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        let pred = voting.predict(&x).unwrap();
        let labels = pred.as_labels().unwrap();
        assert_eq!(labels.name(), Some("label"));
        assert_eq!(labels.values()[0], "a");
        assert_eq!(labels.values()[7], "b");
    }

    #[test]
    fn test_voting_classifier_native_members() {
        let (x, y) = create_test_data();
        let mut voting = VotingClassifierDF::from_estimators(vec![(
            "rf",
            SubEstimator::native(RandomForestClassifier::default()),
        )])
        .unwrap();
        voting.fit(&x, Some(&y)).unwrap();
        assert_eq!(voting.classes().unwrap(), &["a", "b"]);

        let err = VotingClassifierDF::from_estimators(vec![(
            "impute",
            SubEstimator::native(SimpleImputer::default()),
        )])
        .unwrap_err();
        assert_eq!(err, EstimatorError::UnsupportedMember("SimpleImputer".to_string()));
    }

    #[test]
    fn test_multi_output_classifier_labels_frame() {
        let (x, y) = create_test_data();
        let first = y.as_labels().unwrap().values().to_vec();
        let second: Vec<String> = first
            .iter()
            .map(|l| if l == "a" { "low".to_string() } else { "high".to_string() })
            .collect();
        let y = Frame::from_columns(vec![("kind", first), ("level", second)]).unwrap();

        let mut model = MultiOutputClassifierDF::from_estimator(SubEstimator::frame(
            LogisticRegressionDF::default(),
        ))
        .unwrap();
        model.fit(&x, Some(&y.into())).unwrap();

        let pred = model.predict(&x).unwrap();
        let frame = pred.as_label_frame().unwrap();
        assert_eq!(frame.columns(), &["kind", "level"]);
        assert_eq!(frame.values()[[0, 1]], "low");
        assert_eq!(frame.values()[[5, 0]], "b");
    }

    #[test]
    fn test_classifier_chain_default_order() {
        let (x, y) = create_test_data();
        let labels = y.as_labels().unwrap().values().to_vec();
        let y = Frame::from_columns(vec![("l1", labels.clone()), ("l2", labels)]).unwrap();
        let mut chain = ClassifierChainDF::from_base_estimator(SubEstimator::frame(
            LogisticRegressionDF::default(),
        ))
        .unwrap();
        chain.fit(&x, Some(&y.into())).unwrap();
        assert_eq!(chain.feature_names_in().unwrap(), &["f1", "f2"]);
        assert!(chain.predict(&x).unwrap().as_label_frame().is_some());
    }
}
