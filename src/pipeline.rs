//! Pipelines of frame estimators.
//!
//! Pipelines are composites: they are not wrappers of a native class and
//! cannot be members of voting, multi-output or chain meta-estimators.
//! They can be members of stacking estimators.

use crate::error::EstimatorError;
use crate::frame::Frame;
use crate::native::EstimatorKind;
use crate::registry::{ClassInfo, Namespace};
use crate::wrapper::{
    Classification, EstimatorDF, LearnerDF, LearnerRole, Prediction, Regression, Target,
    TransformerDF,
};
use std::collections::HashSet;
use std::marker::PhantomData;

fn not_a_transformer(step: &str, estimator: &dyn EstimatorDF) -> EstimatorError {
    EstimatorError::InvalidParameter(format!(
        "all intermediate steps should be transformers; step '{}' is a {} ({})",
        step,
        estimator.kind(),
        estimator.class_name()
    ))
}

/// A sequence of named steps: transformers followed by a final estimator.
///
/// Fitting fits each step on the output of the previous one. The pipeline
/// is a learner if its last step is a learner and a transformer otherwise.
#[derive(Clone, Debug)]
pub struct PipelineDF {
    steps: Vec<(String, Box<dyn EstimatorDF>)>,
    feature_names_in: Option<Vec<String>>,
}

impl PipelineDF {
    /// # Errors
    /// Returns [`EstimatorError::EmptyData`] without steps and
    /// [`EstimatorError::InvalidParameter`] for duplicate step names or an
    /// intermediate step that is not a transformer.
    pub fn new<S: Into<String>>(
        steps: Vec<(S, Box<dyn EstimatorDF>)>,
    ) -> Result<Self, EstimatorError> {
        let steps: Vec<(String, Box<dyn EstimatorDF>)> =
            steps.into_iter().map(|(n, s)| (n.into(), s)).collect();
        if steps.is_empty() {
            return Err(EstimatorError::EmptyData(
                "a pipeline needs at least one step".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some((name, _)) = steps.iter().find(|(name, _)| !seen.insert(name.as_str())) {
            return Err(EstimatorError::InvalidParameter(format!(
                "pipeline step names must be unique; '{}' is repeated",
                name
            )));
        }
        if let Some((name, step)) = steps[..steps.len() - 1]
            .iter()
            .find(|(_, step)| step.as_transformer().is_none())
        {
            return Err(not_a_transformer(name, &**step));
        }
        Ok(Self {
            steps,
            feature_names_in: None,
        })
    }

    pub fn steps(&self) -> &[(String, Box<dyn EstimatorDF>)] {
        &self.steps
    }

    /// A step by name.
    pub fn step(&self, name: &str) -> Option<&dyn EstimatorDF> {
        self.steps
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_ref())
    }

    fn final_step(&self) -> &dyn EstimatorDF {
        // `new` guarantees at least one step
        self.steps[self.steps.len() - 1].1.as_ref()
    }

    fn check_fitted(&self) -> Result<(), EstimatorError> {
        if self.feature_names_in.is_none() {
            return Err(EstimatorError::not_fitted(self.class_name()));
        }
        Ok(())
    }

    /// Pass `x` through every step but the last.
    fn transform_intermediate(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        self.check_fitted()?;
        let mut xt = x.clone();
        for (name, step) in &self.steps[..self.steps.len() - 1] {
            let transformer = step
                .as_transformer()
                .ok_or_else(|| not_a_transformer(name, &**step))?;
            xt = transformer.transform(&xt)?;
        }
        Ok(xt)
    }

    fn final_learner(&self) -> Result<&dyn LearnerDF, EstimatorError> {
        self.final_step()
            .as_learner()
            .ok_or_else(|| EstimatorError::unsupported(self.class_name(), "predict"))
    }
}

impl EstimatorDF for PipelineDF {
    fn class_name(&self) -> &'static str {
        "PipelineDF"
    }

    fn kind(&self) -> EstimatorKind {
        self.final_step().kind()
    }

    fn is_fitted(&self) -> bool {
        self.feature_names_in.is_some()
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn fit(&mut self, x: &Frame, y: Option<&Target>) -> Result<(), EstimatorError> {
        self.feature_names_in = None;
        let last = self.steps.len() - 1;
        let mut xt = x.clone();
        for (i, (name, step)) in self.steps.iter_mut().enumerate() {
            step.fit(&xt, y)?;
            if i < last {
                let transformer = step
                    .as_transformer()
                    .ok_or_else(|| not_a_transformer(name, &**step))?;
                xt = transformer.transform(&xt)?;
            }
        }
        tracing::debug!(n_steps = self.steps.len(), "fitted pipeline");
        self.feature_names_in = Some(x.columns().to_vec());
        Ok(())
    }

    fn as_learner(&self) -> Option<&dyn LearnerDF> {
        if self.kind().is_learner() {
            Some(self)
        } else {
            None
        }
    }

    fn as_transformer(&self) -> Option<&dyn TransformerDF> {
        if self.kind().is_learner() {
            None
        } else {
            Some(self)
        }
    }

    fn clone_unfitted(&self) -> Box<dyn EstimatorDF> {
        Box::new(Self {
            steps: self
                .steps
                .iter()
                .map(|(n, s)| (n.clone(), s.clone_unfitted()))
                .collect(),
            feature_names_in: None,
        })
    }

    fn box_clone(&self) -> Box<dyn EstimatorDF> {
        Box::new(self.clone())
    }
}

impl LearnerDF for PipelineDF {
    fn predict(&self, x: &Frame) -> Result<Prediction, EstimatorError> {
        let xt = self.transform_intermediate(x)?;
        self.final_learner()?.predict(&xt)
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        let xt = self.transform_intermediate(x)?;
        self.final_learner()?.predict_proba(&xt)
    }

    fn classes(&self) -> Option<&[String]> {
        self.final_step().as_learner().and_then(|l| l.classes())
    }
}

impl TransformerDF for PipelineDF {
    fn transform(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        let xt = self.transform_intermediate(x)?;
        self.final_step()
            .as_transformer()
            .ok_or_else(|| EstimatorError::unsupported(self.class_name(), "transform"))?
            .transform(&xt)
    }

    fn feature_names_out(&self) -> Result<Vec<String>, EstimatorError> {
        self.check_fitted()?;
        self.final_step()
            .as_transformer()
            .ok_or_else(|| EstimatorError::unsupported(self.class_name(), "transform"))?
            .feature_names_out()
    }
}

/// Names of the two learner pipeline classes.
pub trait PipelineRole: LearnerRole {
    const NAME: &'static str;
}

impl PipelineRole for Regression {
    const NAME: &'static str = "RegressorPipelineDF";
}

impl PipelineRole for Classification {
    const NAME: &'static str = "ClassifierPipelineDF";
}

/// An optional preprocessing transformer followed by one learner of the
/// role `R`.
#[derive(Clone, Debug)]
pub struct LearnerPipelineDF<R> {
    preprocessing: Option<Box<dyn EstimatorDF>>,
    learner: Box<dyn EstimatorDF>,
    feature_names_in: Option<Vec<String>>,
    _role: PhantomData<R>,
}

pub type RegressorPipelineDF = LearnerPipelineDF<Regression>;
pub type ClassifierPipelineDF = LearnerPipelineDF<Classification>;

impl<R: PipelineRole> LearnerPipelineDF<R> {
    /// # Errors
    /// Returns [`EstimatorError::InvalidParameter`] if `learner` has the wrong role.
    pub fn new(learner: Box<dyn EstimatorDF>) -> Result<Self, EstimatorError> {
        if learner.kind() != R::KIND {
            return Err(EstimatorError::InvalidParameter(format!(
                "{} needs a {}, but got {} ({})",
                R::NAME,
                R::KIND,
                learner.class_name(),
                learner.kind()
            )));
        }
        Ok(Self {
            preprocessing: None,
            learner,
            feature_names_in: None,
            _role: PhantomData,
        })
    }

    /// # Errors
    /// Returns [`EstimatorError::InvalidParameter`] if `preprocessing` is not
    /// a transformer.
    pub fn with_preprocessing(
        mut self,
        preprocessing: Box<dyn EstimatorDF>,
    ) -> Result<Self, EstimatorError> {
        if preprocessing.as_transformer().is_none() {
            return Err(not_a_transformer("preprocessing", &*preprocessing));
        }
        self.preprocessing = Some(preprocessing);
        self.feature_names_in = None;
        Ok(self)
    }

    pub fn preprocessing(&self) -> Option<&dyn EstimatorDF> {
        self.preprocessing.as_deref()
    }

    pub fn final_estimator(&self) -> &dyn EstimatorDF {
        self.learner.as_ref()
    }

    fn preprocess(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        if self.feature_names_in.is_none() {
            return Err(EstimatorError::not_fitted(R::NAME));
        }
        match &self.preprocessing {
            Some(preprocessing) => preprocessing
                .as_transformer()
                .ok_or_else(|| not_a_transformer("preprocessing", &**preprocessing))?
                .transform(x),
            None => Ok(x.clone()),
        }
    }

    fn learner(&self) -> Result<&dyn LearnerDF, EstimatorError> {
        self.learner
            .as_learner()
            .ok_or_else(|| EstimatorError::unsupported(R::NAME, "predict"))
    }
}

impl<R: PipelineRole> EstimatorDF for LearnerPipelineDF<R> {
    fn class_name(&self) -> &'static str {
        R::NAME
    }

    fn kind(&self) -> EstimatorKind {
        R::KIND
    }

    fn is_fitted(&self) -> bool {
        self.feature_names_in.is_some()
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn feature_names_in(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn fit(&mut self, x: &Frame, y: Option<&Target>) -> Result<(), EstimatorError> {
        self.feature_names_in = None;
        let xt = match &mut self.preprocessing {
            Some(preprocessing) => {
                preprocessing.fit(x, y)?;
                preprocessing
                    .as_transformer()
                    .ok_or_else(|| not_a_transformer("preprocessing", &**preprocessing))?
                    .transform(x)?
            }
            None => x.clone(),
        };
        self.learner.fit(&xt, y)?;
        tracing::debug!(pipeline = R::NAME, "fitted pipeline");
        self.feature_names_in = Some(x.columns().to_vec());
        Ok(())
    }

    fn as_learner(&self) -> Option<&dyn LearnerDF> {
        Some(self)
    }

    fn clone_unfitted(&self) -> Box<dyn EstimatorDF> {
        Box::new(Self {
            preprocessing: self.preprocessing.as_ref().map(|p| p.clone_unfitted()),
            learner: self.learner.clone_unfitted(),
            feature_names_in: None,
            _role: PhantomData,
        })
    }

    fn box_clone(&self) -> Box<dyn EstimatorDF> {
        Box::new(self.clone())
    }
}

impl<R: PipelineRole> LearnerDF for LearnerPipelineDF<R> {
    fn predict(&self, x: &Frame) -> Result<Prediction, EstimatorError> {
        let xt = self.preprocess(x)?;
        self.learner()?.predict(&xt)
    }

    fn predict_proba(&self, x: &Frame) -> Result<Frame, EstimatorError> {
        let xt = self.preprocess(x)?;
        self.learner()?.predict_proba(&xt)
    }

    fn classes(&self) -> Option<&[String]> {
        self.learner.as_learner().and_then(|l| l.classes())
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.pipeline")
        .with_class(ClassInfo::class::<PipelineDF>("PipelineDF"))
        .with_class(ClassInfo::class::<RegressorPipelineDF>("RegressorPipelineDF"))
        .with_class(ClassInfo::class::<ClassifierPipelineDF>("ClassifierPipelineDF"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::LogisticRegressionDF;
    use crate::frame::Series;
    use crate::regression::LinearRegressionDF;
    use crate::transformation::{SimpleImputerDF, StandardScalerDF};
    use crate::wrapper::IntoEstimatorBox;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn create_test_data() -> (Frame, Target) {
        let x = Frame::new(
            ["a", "b"],
            array![[1.0, 2.0], [2.0, f64::NAN], [3.0, 1.0], [4.0, 3.0], [5.0, 0.0]],
        )
        .unwrap();
        let y = Series::from_vec(Some("y"), vec![3.0, 5.0, 7.0, 9.0, 11.0]);
        (x, y.into())
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let (x, y) = create_test_data();
        let mut pipeline = PipelineDF::new(vec![
            ("impute", SimpleImputerDF::default().boxed()),
            ("scale", StandardScalerDF::default().boxed()),
            ("ols", LinearRegressionDF::default().boxed()),
        ])
        .unwrap();
        assert!(pipeline.as_learner().is_some());
        assert!(pipeline.as_transformer().is_none());
        assert!(pipeline.is_composite());

        pipeline.fit(&x, Some(&y)).unwrap();
        let pred = pipeline.predict(&x).unwrap();
        let series = pred.as_values().unwrap();
        assert_eq!(series.name(), Some("y"));
        assert_abs_diff_eq!(series.values()[0], 3.0, epsilon = 1e-6);
        assert_eq!(
            pipeline.step("scale").unwrap().feature_names_in().unwrap(),
            &["a", "b"]
        );
    }

    #[test]
    fn test_pipeline_of_transformers() {
        let (x, _) = create_test_data();
        let mut pipeline = PipelineDF::new(vec![
            ("impute", SimpleImputerDF::default().boxed()),
            ("scale", StandardScalerDF::default().boxed()),
        ])
        .unwrap();
        assert!(pipeline.as_transformer().is_some());
        pipeline.fit(&x, None).unwrap();
        let out = pipeline.as_transformer().unwrap().transform(&x).unwrap();
        assert_eq!(out.columns(), &["a", "b"]);
        assert!(out.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pipeline_rejects_learner_in_the_middle() {
        let result = PipelineDF::new(vec![
            ("ols", LinearRegressionDF::default().boxed()),
            ("scale", StandardScalerDF::default().boxed()),
        ]);
        assert!(matches!(result, Err(EstimatorError::InvalidParameter(_))));
    }

    #[test]
    fn test_pipeline_rejects_duplicate_names() {
        let result = PipelineDF::new(vec![
            ("step", StandardScalerDF::default().boxed()),
            ("step", LinearRegressionDF::default().boxed()),
        ]);
        assert!(matches!(result, Err(EstimatorError::InvalidParameter(_))));
        assert!(matches!(
            PipelineDF::new(Vec::<(String, Box<dyn EstimatorDF>)>::new()),
            Err(EstimatorError::EmptyData(_))
        ));
    }

    #[test]
    fn test_pipeline_not_fitted() {
        let (x, _) = create_test_data();
        let pipeline = PipelineDF::new(vec![("ols", LinearRegressionDF::default().boxed())]).unwrap();
        let err = pipeline.predict(&x).unwrap_err();
        assert_eq!(err, EstimatorError::not_fitted("PipelineDF"));
    }

    #[test]
    fn test_regressor_pipeline() {
        let (x, y) = create_test_data();
        let mut pipeline = RegressorPipelineDF::new(LinearRegressionDF::default().boxed())
            .unwrap()
            .with_preprocessing(SimpleImputerDF::default().boxed())
            .unwrap();
        assert!(pipeline.predict(&x).unwrap_err().is_not_fitted());

        pipeline.fit(&x, Some(&y)).unwrap();
        assert!(pipeline.is_fitted());
        assert!(pipeline.final_estimator().is_fitted());
        let pred = pipeline.predict(&x).unwrap();
        assert_eq!(pred.as_values().unwrap().len(), 5);

        let fresh = pipeline.clone_unfitted();
        assert!(!fresh.is_fitted());
        assert_eq!(fresh.class_name(), "RegressorPipelineDF");
    }

    #[test]
    fn test_classifier_pipeline_role_checks() {
        let err = ClassifierPipelineDF::new(LinearRegressionDF::default().boxed()).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidParameter(_)));

        let pipeline = ClassifierPipelineDF::new(LogisticRegressionDF::default().boxed()).unwrap();
        let err = pipeline
            .with_preprocessing(LogisticRegressionDF::default().boxed())
            .unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidParameter(_)));
    }
}
