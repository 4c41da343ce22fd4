//! Frame-aware regressors.
//!
//! Each wrapper class is a [`LearnerWrapperDF`](crate::wrapper::LearnerWrapperDF)
//! over the native regressor of the same name. Voting, multi-output and chain
//! regressors are built from simple frame learners only; pipelines and other
//! composites are rejected at construction.

use crate::error::EstimatorError;
use crate::native::ensemble::{RandomForestRegressor, VotingRegressor};
use crate::native::linear_model::{ElasticNet, LinearRegression, Ridge, RidgeCV};
use crate::native::multioutput::{MultiOutputRegressor, RegressorChain};
use crate::native::tree::DecisionTreeRegressor;
use crate::registry::{ClassInfo, Namespace};
use crate::wrapper::{df_wrapper, ensure_simple_learner, ensure_simple_learners, SubEstimator};

pub use crate::stacking::StackingRegressorDF;

df_wrapper!(
    /// Ordinary least squares on labeled frames.
    LinearRegressionDF = LearnerWrapperDF<LinearRegression>
);
df_wrapper!(RidgeDF = LearnerWrapperDF<Ridge>);
df_wrapper!(
    /// Ridge regression with the penalty chosen by leave-one-out error.
    RidgeCVDF = LearnerWrapperDF<RidgeCV>
);
df_wrapper!(ElasticNetDF = LearnerWrapperDF<ElasticNet>);
df_wrapper!(DecisionTreeRegressorDF = LearnerWrapperDF<DecisionTreeRegressor>);
df_wrapper!(RandomForestRegressorDF = LearnerWrapperDF<RandomForestRegressor>);
df_wrapper!(
    /// Averages the predictions of its members.
    VotingRegressorDF = LearnerWrapperDF<VotingRegressor>
);
df_wrapper!(
    /// Fits one clone of a regressor per target column.
    MultiOutputRegressorDF = LearnerWrapperDF<MultiOutputRegressor>
);
df_wrapper!(
    /// Fits one regressor per target column, feeding earlier predictions
    /// to later links.
    RegressorChainDF = LearnerWrapperDF<RegressorChain>
);

impl VotingRegressorDF {
    /// # Errors
    /// Returns [`EstimatorError::UnsupportedMember`] if a member is not a
    /// simple frame learner.
    pub fn from_estimators<S: Into<String>>(
        estimators: Vec<(S, SubEstimator)>,
    ) -> Result<Self, EstimatorError> {
        Ok(Self::new(VotingRegressor::new(ensure_simple_learners(estimators)?)))
    }

    pub fn with_weights(self, weights: Vec<f64>) -> Self {
        Self::new(self.into_delegate().with_weights(weights))
    }
}

impl MultiOutputRegressorDF {
    /// # Errors
    /// Returns [`EstimatorError::UnsupportedMember`] if `estimator` is not a
    /// simple frame learner.
    pub fn from_estimator(estimator: SubEstimator) -> Result<Self, EstimatorError> {
        Ok(Self::new(MultiOutputRegressor::new(ensure_simple_learner(&estimator)?)))
    }
}

impl RegressorChainDF {
    /// # Errors
    /// Returns [`EstimatorError::UnsupportedMember`] if `base_estimator` is not
    /// a simple frame learner.
    pub fn from_base_estimator(base_estimator: SubEstimator) -> Result<Self, EstimatorError> {
        Ok(Self::new(RegressorChain::new(ensure_simple_learner(&base_estimator)?)))
    }

    /// Fit the outputs in this order instead of column order.
    pub fn with_order(self, order: Vec<usize>) -> Self {
        Self::new(self.into_delegate().with_order(order))
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.regression")
        .with_class(ClassInfo::default_wrapper::<LinearRegressionDF>())
        .with_class(ClassInfo::default_wrapper::<RidgeDF>())
        .with_class(ClassInfo::default_wrapper::<RidgeCVDF>())
        .with_class(ClassInfo::default_wrapper::<ElasticNetDF>())
        .with_class(ClassInfo::default_wrapper::<DecisionTreeRegressorDF>())
        .with_class(ClassInfo::default_wrapper::<RandomForestRegressorDF>())
        .with_class(ClassInfo::wrapper::<VotingRegressorDF>())
        .with_class(ClassInfo::wrapper::<MultiOutputRegressorDF>())
        .with_class(ClassInfo::wrapper::<RegressorChainDF>())
        .with_class(ClassInfo::class::<StackingRegressorDF>("StackingRegressorDF"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Series};
    use crate::pipeline::RegressorPipelineDF;
    use crate::transformation::SimpleImputerDF;
    use crate::wrapper::{EstimatorDF, IntoEstimatorBox, LearnerDF, Target};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn create_test_data() -> (Frame, Target) {
        let x = Frame::new(
            ["x1", "x2"],
            array![
                [0.0, 0.0],
                [1.0, 0.5],
                [2.0, 0.0],
                [3.0, 1.5],
                [4.0, 1.0],
                [5.0, 2.5],
                [6.0, 2.0],
                [7.0, 3.0]
            ],
        )
        .unwrap();
        let y: Vec<f64> = x.values().rows().into_iter().map(|r| 1.0 + 2.0 * r[0] - r[1]).collect();
        (x, Series::from_vec(Some("target"), y).into())
    }

    #[test]
    fn test_wrapper_names() {
        assert_eq!(RidgeDF::default().class_name(), "RidgeDF");
        assert_eq!(
            RandomForestRegressorDF::default().native().unwrap().name(),
            "RandomForestRegressor"
        );
    }

    #[test]
    fn test_voting_regressor_with_simple_members() {
        let (x, y) = create_test_data();
        let mut voting = VotingRegressorDF::from_estimators(vec![
            ("ols", SubEstimator::frame(LinearRegressionDF::default())),
            ("ridge", SubEstimator::frame(RidgeDF::default())),
        ])
        .unwrap()
        .with_weights(vec![1.0, 1.0]);
        voting.fit(&x, Some(&y)).unwrap();

        let pred = voting.predict(&x).unwrap();
        assert_eq!(pred.as_values().unwrap().name(), Some("target"));
    }

    #[test]
    fn test_voting_regressor_rejects_pipeline() {
        let pipeline = RegressorPipelineDF::new(LinearRegressionDF::default().boxed()).unwrap();
        let err = VotingRegressorDF::from_estimators(vec![
            ("ols", SubEstimator::frame(LinearRegressionDF::default())),
            ("pipeline", SubEstimator::frame(pipeline)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            EstimatorError::UnsupportedMember("RegressorPipelineDF".to_string())
        );
    }

    #[test]
    fn test_chain_rejects_transformer() {
        let err = RegressorChainDF::from_base_estimator(SubEstimator::frame(
            SimpleImputerDF::default(),
        ))
        .unwrap_err();
        assert_eq!(err, EstimatorError::UnsupportedMember("SimpleImputerDF".to_string()));
    }

    #[test]
    fn test_regressor_chain_fits_frame_target() {
        let (x, _) = create_test_data();
        let y1: Vec<f64> = x.values().column(0).iter().map(|v| 2.0 * v).collect();
        let y2: Vec<f64> = y1.iter().map(|v| v + 1.0).collect();
        let y = Frame::from_columns(vec![("first", y1), ("second", y2)]).unwrap();

        let mut chain =
            RegressorChainDF::from_base_estimator(SubEstimator::frame(LinearRegressionDF::default()))
                .unwrap()
                .with_order(vec![1, 0]);
        chain.fit(&x, Some(&y.into())).unwrap();

        let pred = chain.predict(&x).unwrap();
        let frame = pred.as_frame().unwrap();
        assert_eq!(frame.columns(), &["first", "second"]);
        let expected: Array2<f64> = array![[0.0, 1.0], [14.0, 15.0]];
        for (row, expected_row) in [0usize, 7].iter().zip(expected.rows()) {
            for col in 0..2 {
                assert_abs_diff_eq!(frame.values()[[*row, col]], expected_row[col], epsilon = 1e-6);
            }
        }
    }
}
