//! Frame-aware transformers.

use crate::error::EstimatorError;
use crate::native::compose::{ColumnAction, ColumnSelector, ColumnTransformer};
use crate::native::preprocessing::{MinMaxScaler, SimpleImputer, StandardScaler};
use crate::native::EstimatorKind;
use crate::registry::{ClassInfo, Namespace};
use crate::wrapper::{df_wrapper, EstimatorDF};

df_wrapper!(StandardScalerDF = TransformerWrapperDF<StandardScaler>);
df_wrapper!(MinMaxScalerDF = TransformerWrapperDF<MinMaxScaler>);
df_wrapper!(
    /// Fills NaN cells column by column.
    SimpleImputerDF = TransformerWrapperDF<SimpleImputer>
);
df_wrapper!(
    /// Applies transformers to named column subsets and concatenates the
    /// results. Output columns keep the names the step transformers give
    /// them; step names are not prefixed.
    ColumnTransformerDF = TransformerWrapperDF<ColumnTransformer>
);

/// What a [`ColumnTransformerDF`] step does with its columns.
#[derive(Clone, Debug)]
pub enum ColumnStepDF {
    /// A simple frame transformer.
    Transformer(Box<dyn EstimatorDF>),
    Passthrough,
    Drop,
}

impl ColumnStepDF {
    pub fn transformer<E: EstimatorDF + 'static>(transformer: E) -> Self {
        ColumnStepDF::Transformer(Box::new(transformer))
    }

    fn into_action(self, step: &str) -> Result<ColumnAction, EstimatorError> {
        match self {
            ColumnStepDF::Passthrough => Ok(ColumnAction::Passthrough),
            ColumnStepDF::Drop => Ok(ColumnAction::Drop),
            ColumnStepDF::Transformer(transformer) => {
                let native = transformer
                    .native()
                    .filter(|_| {
                        transformer.kind() == EstimatorKind::Transformer
                            && !transformer.is_composite()
                    })
                    .ok_or_else(|| {
                        EstimatorError::InvalidParameter(format!(
                            "step '{}' of ColumnTransformerDF must be a simple transformer, \
                             'passthrough' or 'drop', but got {}",
                            step,
                            transformer.class_name()
                        ))
                    })?;
                Ok(ColumnAction::Transformer(native.clone_unfitted()))
            }
        }
    }
}

impl ColumnTransformerDF {
    /// Steps of `(name, action, column names)`; unselected columns are dropped.
    ///
    /// # Errors
    /// Returns [`EstimatorError::InvalidParameter`] if a step's transformer is
    /// not a simple frame transformer.
    pub fn from_steps<N: Into<String>, C: Into<String>>(
        steps: Vec<(N, ColumnStepDF, Vec<C>)>,
    ) -> Result<Self, EstimatorError> {
        let mut native = ColumnTransformer::new();
        for (name, step, columns) in steps {
            let name = name.into();
            let action = step.into_action(&name)?;
            native = native.add(name, action, ColumnSelector::names(columns));
        }
        Ok(Self::new(native))
    }

    /// Set what happens to columns no step selects.
    pub fn with_remainder(self, remainder: ColumnStepDF) -> Result<Self, EstimatorError> {
        let action = remainder.into_action("remainder")?;
        Ok(Self::new(self.into_delegate().with_remainder(action)))
    }
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.transformation")
        .with_class(ClassInfo::default_wrapper::<StandardScalerDF>())
        .with_class(ClassInfo::default_wrapper::<MinMaxScalerDF>())
        .with_class(ClassInfo::default_wrapper::<SimpleImputerDF>())
        .with_class(ClassInfo::default_wrapper::<ColumnTransformerDF>())
        .with_class(ClassInfo::class::<ColumnStepDF>("ColumnStepDF"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Index};
    use crate::native::preprocessing::ImputeStrategy;
    use crate::regression::LinearRegressionDF;
    use crate::wrapper::TransformerDF;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn create_test_frame() -> Frame {
        Frame::new(
            ["age", "income", "rooms"],
            array![[20.0, 1.0, 3.0], [30.0, 2.0, f64::NAN], [40.0, 3.0, 5.0]],
        )
        .unwrap()
        .with_index(Index::new(["a", "b", "c"]))
        .unwrap()
    }

    #[test]
    fn test_column_transformer_by_name() {
        let x = create_test_frame();
        let mut ct = ColumnTransformerDF::from_steps(vec![
            (
                "scaled",
                ColumnStepDF::transformer(StandardScalerDF::default()),
                vec!["income", "age"],
            ),
            ("keep", ColumnStepDF::Passthrough, vec!["rooms"]),
        ])
        .unwrap();

        let out = ct.fit_transform(&x, None).unwrap();
        assert_eq!(out.columns(), &["income", "age", "rooms"]);
        assert_eq!(out.index(), x.index());
        assert_abs_diff_eq!(out.values()[[0, 1]], -1.224744871391589, epsilon = 1e-9);
        assert!(out.values()[[1, 2]].is_nan());
        assert_eq!(ct.feature_names_out().unwrap(), out.columns());
    }

    #[test]
    fn test_column_transformer_remainder() {
        let x = create_test_frame();
        let mut ct = ColumnTransformerDF::from_steps(vec![(
            "impute",
            ColumnStepDF::transformer(SimpleImputerDF::new(SimpleImputer::new(
                ImputeStrategy::Constant(0.0),
            ))),
            vec!["rooms"],
        )])
        .unwrap()
        .with_remainder(ColumnStepDF::Passthrough)
        .unwrap();

        let out = ct.fit_transform(&x, None).unwrap();
        assert_eq!(out.columns(), &["rooms", "age", "income"]);
        assert_eq!(out.values()[[1, 0]], 0.0);
    }

    #[test]
    fn test_column_transformer_missing_column() {
        let x = create_test_frame();
        let mut ct = ColumnTransformerDF::from_steps(vec![(
            "keep",
            ColumnStepDF::Passthrough,
            vec!["zip"],
        )])
        .unwrap();
        assert_eq!(
            ct.fit(&x, None).unwrap_err(),
            EstimatorError::MissingColumn("zip".to_string())
        );
    }

    #[test]
    fn test_column_transformer_rejects_learner_step() {
        let result = ColumnTransformerDF::from_steps(vec![(
            "model",
            ColumnStepDF::transformer(LinearRegressionDF::default()),
            vec!["age"],
        )]);
        assert!(matches!(result, Err(EstimatorError::InvalidParameter(_))));
    }

    #[test]
    fn test_min_max_scaler_df() {
        let x = create_test_frame().select(&["age", "income"]).unwrap();
        let mut scaler = MinMaxScalerDF::default();
        let out = scaler.fit_transform(&x, None).unwrap();
        assert_eq!(out.values()[[2, 0]], 1.0);
        assert_eq!(out.values()[[0, 1]], 0.0);
    }
}
