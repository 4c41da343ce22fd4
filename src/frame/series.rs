use crate::error::EstimatorError;
use crate::frame::{Frame, Index};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};

/// One-dimensional labeled data with an optional name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series<T = f64> {
    name: Option<String>,
    index: Index,
    values: Array1<T>,
}

impl<T: Clone> Series<T> {
    /// Create a series with a default `0..n` index.
    pub fn new(name: Option<&str>, values: Array1<T>) -> Self {
        Self {
            name: name.map(str::to_string),
            index: Index::range(values.len()),
            values,
        }
    }

    pub fn from_vec(name: Option<&str>, values: Vec<T>) -> Self {
        Self::new(name, Array1::from_vec(values))
    }

    /// Replace the row index.
    pub fn with_index(mut self, index: Index) -> Result<Self, EstimatorError> {
        if index.len() != self.values.len() {
            return Err(EstimatorError::InvalidShape {
                expected: format!("index of length {}", self.values.len()),
                got: format!("index of length {}", index.len()),
            });
        }
        self.index = index;
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn values(&self) -> &Array1<T> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn take(&self, positions: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            index: self.index.take(positions),
            values: self.values.select(Axis(0), positions),
        }
    }

    /// Single-column frame named after the series (or `"0"` when unnamed).
    pub fn to_frame(&self) -> Frame<T> {
        let name = self.name.clone().unwrap_or_else(|| "0".to_string());
        Frame {
            index: self.index.clone(),
            columns: vec![name],
            data: self.values.clone().insert_axis(Axis(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_defaults() {
        let s = Series::from_vec(Some("target"), vec![1.0, 2.0, 3.0]);
        assert_eq!(s.name(), Some("target"));
        assert_eq!(s.len(), 3);
        assert_eq!(s.index(), &Index::range(3));
    }

    #[test]
    fn test_take() {
        let s = Series::from_vec(None, vec!["a".to_string(), "b".to_string()]);
        let t = s.take(&[1]);
        assert_eq!(t.values().to_vec(), vec!["b".to_string()]);
    }

    #[test]
    fn test_to_frame_unnamed() {
        let s = Series::from_vec(None, vec![1.0, 2.0]);
        let frame = s.to_frame();
        assert_eq!(frame.columns(), &["0".to_string()]);
        assert_eq!(frame.shape(), (2, 1));
    }
}
