use learnframe::classification::{
    ClassifierChainDF, LogisticRegressionDF, MultiOutputClassifierDF, StackingClassifierDF,
    VotingClassifierDF,
};
use learnframe::conformance::{check_expected_not_fitted_error, CheckerConfig};
use learnframe::frame::Series;
use learnframe::native::ensemble::Voting;
use learnframe::pipeline::{ClassifierPipelineDF, PipelineDF, RegressorPipelineDF};
use learnframe::regression::{
    LinearRegressionDF, MultiOutputRegressorDF, RegressorChainDF, RidgeDF, StackingRegressorDF,
    VotingRegressorDF,
};
use learnframe::registry::loaded_namespaces;
use learnframe::stacking::StackMember;
use learnframe::transformation::StandardScalerDF;
use learnframe::wrapper::{EstimatorDF, IntoEstimatorBox, SubEstimator};
use ndarray::Array1;

#[test]
fn test_every_default_wrapper_raises_not_fitted() {
    let config = CheckerConfig::default();
    let mut checked = 0;
    for namespace in loaded_namespaces() {
        if !namespace.name().starts_with("learnframe.") {
            continue;
        }
        for class in namespace.classes() {
            let Some(estimator) = class.create() else {
                continue;
            };
            assert!(class.is_wrapper(), "{} has a factory but wraps nothing", class);
            assert_eq!(
                check_expected_not_fitted_error(&*estimator, &config),
                Ok(()),
                "{} in {}",
                class,
                namespace
            );
            checked += 1;
        }
    }
    assert!(checked >= 14, "only {} classes checked", checked);
}

#[test]
fn test_wrapper_and_native_agree_on_error_kind() {
    let x = Series::from_vec(Some("0"), (0..10).map(f64::from).collect()).to_frame();
    let flat: Array1<f64> = (0..10).map(f64::from).collect();
    for namespace in loaded_namespaces() {
        for class in namespace.classes() {
            let Some(estimator) = class.create() else {
                continue;
            };
            let native = estimator.native().unwrap();
            let (wrapper_error, native_error) = match estimator.as_learner() {
                Some(learner) => (
                    learner.predict(&x).unwrap_err(),
                    native.predict(flat.view().into_dyn()).unwrap_err(),
                ),
                None => (
                    estimator.as_transformer().unwrap().transform(&x).unwrap_err(),
                    native.transform(x.view().into_dyn()).unwrap_err(),
                ),
            };
            assert!(wrapper_error.is_not_fitted(), "{}: {}", class, wrapper_error);
            assert!(native_error.is_not_fitted(), "{}: {}", class, native_error);
        }
    }
}

fn meta_estimators() -> Vec<Box<dyn EstimatorDF>> {
    let ols = || SubEstimator::frame(LinearRegressionDF::default());
    let logit = || SubEstimator::frame(LogisticRegressionDF::default());
    vec![
        VotingRegressorDF::from_estimators(vec![
            ("ols", ols()),
            ("ridge", SubEstimator::frame(RidgeDF::default())),
        ])
        .unwrap()
        .boxed(),
        VotingClassifierDF::from_estimators(vec![("logit", logit())])
            .unwrap()
            .with_voting(Voting::Soft)
            .boxed(),
        MultiOutputRegressorDF::from_estimator(ols()).unwrap().boxed(),
        MultiOutputClassifierDF::from_estimator(logit()).unwrap().boxed(),
        RegressorChainDF::from_base_estimator(ols()).unwrap().boxed(),
        ClassifierChainDF::from_base_estimator(logit()).unwrap().boxed(),
    ]
}

fn composites() -> Vec<Box<dyn EstimatorDF>> {
    vec![
        StackingRegressorDF::new(vec![(
            "ols",
            StackMember::estimator(LinearRegressionDF::default()),
        )])
        .unwrap()
        .boxed(),
        StackingClassifierDF::new(vec![(
            "logit",
            StackMember::estimator(LogisticRegressionDF::default()),
        )])
        .unwrap()
        .boxed(),
        RegressorPipelineDF::new(RidgeDF::default().boxed())
            .unwrap()
            .with_preprocessing(StandardScalerDF::default().boxed())
            .unwrap()
            .boxed(),
        ClassifierPipelineDF::new(LogisticRegressionDF::default().boxed())
            .unwrap()
            .boxed(),
        PipelineDF::new(vec![
            ("scale", StandardScalerDF::default().boxed()),
            ("ols", LinearRegressionDF::default().boxed()),
        ])
        .unwrap()
        .boxed(),
    ]
}

#[test]
fn test_meta_estimators_raise_not_fitted() {
    let config = CheckerConfig::default();
    for estimator in meta_estimators().iter().chain(composites().iter()) {
        assert_eq!(
            check_expected_not_fitted_error(&**estimator, &config),
            Ok(()),
            "{}",
            estimator.class_name()
        );
    }
}

#[test]
fn test_waived_guarantee_skips_everything() {
    let config = CheckerConfig::from_json(r#"{"not_fitted_guarantee": "waived"}"#).unwrap();
    for estimator in meta_estimators().iter().chain(composites().iter()) {
        assert_eq!(check_expected_not_fitted_error(&**estimator, &config), Ok(()));
    }
}
