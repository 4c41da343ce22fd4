//! Labeled targets for `fit` and labeled predictions.

use crate::error::EstimatorError;
use crate::frame::{Frame, Index, Series};
use crate::native::Targets;
use serde::{Deserialize, Serialize};

/// A labeled target: one or several outputs, continuous or categorical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Values(Series<f64>),
    Labels(Series<String>),
    Frame(Frame<f64>),
    LabelFrame(Frame<String>),
}

/// Predictions have the same shape vocabulary as targets.
pub type Prediction = Target;

/// Names of the target outputs recorded at fit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetShape {
    /// A single output, possibly unnamed.
    Series(Option<String>),
    /// Several outputs, one named column each.
    Frame(Vec<String>),
}

impl Target {
    pub fn n_samples(&self) -> usize {
        match self {
            Target::Values(s) => s.len(),
            Target::Labels(s) => s.len(),
            Target::Frame(f) => f.n_rows(),
            Target::LabelFrame(f) => f.n_rows(),
        }
    }

    pub fn index(&self) -> &Index {
        match self {
            Target::Values(s) => s.index(),
            Target::Labels(s) => s.index(),
            Target::Frame(f) => f.index(),
            Target::LabelFrame(f) => f.index(),
        }
    }

    /// Rows at the given positions.
    pub fn take(&self, positions: &[usize]) -> Self {
        match self {
            Target::Values(s) => Target::Values(s.take(positions)),
            Target::Labels(s) => Target::Labels(s.take(positions)),
            Target::Frame(f) => Target::Frame(f.take_rows(positions)),
            Target::LabelFrame(f) => Target::LabelFrame(f.take_rows(positions)),
        }
    }

    pub fn shape(&self) -> TargetShape {
        match self {
            Target::Values(s) => TargetShape::Series(s.name().map(str::to_string)),
            Target::Labels(s) => TargetShape::Series(s.name().map(str::to_string)),
            Target::Frame(f) => TargetShape::Frame(f.columns().to_vec()),
            Target::LabelFrame(f) => TargetShape::Frame(f.columns().to_vec()),
        }
    }

    /// The unlabeled form handed to native estimators.
    pub fn to_native(&self) -> Targets {
        match self {
            Target::Values(s) => Targets::Values(s.values().clone()),
            Target::Labels(s) => Targets::Labels(s.values().clone()),
            Target::Frame(f) => Targets::Matrix(f.values().clone()),
            Target::LabelFrame(f) => Targets::LabelMatrix(f.values().clone()),
        }
    }

    /// Label a native prediction with the row index of the input and the
    /// output names recorded at fit.
    pub fn from_native(
        targets: Targets,
        index: &Index,
        shape: &TargetShape,
    ) -> Result<Self, EstimatorError> {
        let index = index.clone();
        match (targets, shape) {
            (Targets::Values(v), TargetShape::Series(name)) => Ok(Target::Values(
                Series::new(name.as_deref(), v).with_index(index)?,
            )),
            (Targets::Labels(v), TargetShape::Series(name)) => Ok(Target::Labels(
                Series::new(name.as_deref(), v).with_index(index)?,
            )),
            (Targets::Values(v), TargetShape::Frame(names)) if names.len() == 1 => Ok(
                Target::Frame(Frame::new(names.clone(), v.insert_axis(ndarray::Axis(1)))?
                    .with_index(index)?),
            ),
            (Targets::Labels(v), TargetShape::Frame(names)) if names.len() == 1 => Ok(
                Target::LabelFrame(
                    Frame::new(names.clone(), v.insert_axis(ndarray::Axis(1)))?
                        .with_index(index)?,
                ),
            ),
            (Targets::Matrix(m), TargetShape::Frame(names)) => Ok(Target::Frame(
                Frame::new(names.clone(), m)?.with_index(index)?,
            )),
            (Targets::LabelMatrix(m), TargetShape::Frame(names)) => Ok(Target::LabelFrame(
                Frame::new(names.clone(), m)?.with_index(index)?,
            )),
            (targets, shape) => Err(EstimatorError::InvalidShape {
                expected: match shape {
                    TargetShape::Series(_) => "a single output".to_string(),
                    TargetShape::Frame(names) => format!("{} outputs", names.len()),
                },
                got: targets.describe().to_string(),
            }),
        }
    }

    pub fn as_values(&self) -> Option<&Series<f64>> {
        match self {
            Target::Values(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_labels(&self) -> Option<&Series<String>> {
        match self {
            Target::Labels(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame<f64>> {
        match self {
            Target::Frame(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_label_frame(&self) -> Option<&Frame<String>> {
        match self {
            Target::LabelFrame(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this is a single output.
    pub fn is_series(&self) -> bool {
        matches!(self, Target::Values(_) | Target::Labels(_))
    }
}

impl From<Series<f64>> for Target {
    fn from(series: Series<f64>) -> Self {
        Target::Values(series)
    }
}

impl From<Series<String>> for Target {
    fn from(series: Series<String>) -> Self {
        Target::Labels(series)
    }
}

impl From<Frame<f64>> for Target {
    fn from(frame: Frame<f64>) -> Self {
        Target::Frame(frame)
    }
}

impl From<Frame<String>> for Target {
    fn from(frame: Frame<String>) -> Self {
        Target::LabelFrame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_shape_records_names() {
        let y = Target::from(Series::from_vec(Some("price"), vec![1.0, 2.0]));
        assert_eq!(y.shape(), TargetShape::Series(Some("price".to_string())));

        let frame = Frame::new(["a", "b"], array![[1.0, 2.0]]).unwrap();
        let y = Target::from(frame);
        assert_eq!(
            y.shape(),
            TargetShape::Frame(vec!["a".to_string(), "b".to_string()])
        );
        assert!(!y.is_series());
    }

    #[test]
    fn test_from_native_uses_index_and_name() {
        let index = Index::new(["r1", "r2"]);
        let shape = TargetShape::Series(Some("price".to_string()));
        let pred = Target::from_native(Targets::Values(array![3.0, 4.0]), &index, &shape).unwrap();

        let series = pred.as_values().unwrap();
        assert_eq!(series.name(), Some("price"));
        assert_eq!(series.index(), &index);
    }

    #[test]
    fn test_from_native_matrix() {
        let shape = TargetShape::Frame(vec!["y1".to_string(), "y2".to_string()]);
        let pred = Target::from_native(
            Targets::Matrix(array![[1.0, 2.0]]),
            &Index::range(1),
            &shape,
        )
        .unwrap();
        assert_eq!(pred.as_frame().unwrap().columns(), &["y1", "y2"]);
    }

    #[test]
    fn test_from_native_shape_mismatch() {
        let shape = TargetShape::Series(None);
        let result = Target::from_native(
            Targets::Matrix(array![[1.0, 2.0]]),
            &Index::range(1),
            &shape,
        );
        assert!(matches!(result, Err(EstimatorError::InvalidShape { .. })));
    }

    #[test]
    fn test_take_and_to_native() {
        let y = Target::from(Series::from_vec(
            None,
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        ));
        let taken = y.take(&[2, 0]);
        assert_eq!(taken.n_samples(), 2);
        assert_eq!(
            taken.to_native(),
            Targets::Labels(array!["c".to_string(), "a".to_string()])
        );
    }
}
