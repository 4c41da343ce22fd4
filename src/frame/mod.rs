//! Labeled tables and one-dimensional labeled data.
//!
//! A [`Frame`] is a 2-D value array with named columns and a row [`Index`];
//! a [`Series`] is a 1-D value array with an optional name and a row index.
//! Both are generic over the value type: features are `f64`, class labels
//! are `String`.
//!
//! # Example
//!
//! ```rust
//! use learnframe::frame::Frame;
//!
//! let frame = Frame::from_columns(vec![
//!     ("age", vec![31.0, 45.0]),
//!     ("income", vec![52.0, 61.5]),
//! ])
//! .unwrap();
//!
//! assert_eq!(frame.shape(), (2, 2));
//! assert_eq!(frame.column("income").unwrap().values()[1], 61.5);
//! ```

mod index;
mod io;
mod series;

pub use index::{Index, Label};
pub use series::Series;

use crate::error::EstimatorError;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// A 2-D table with named columns and labeled rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame<T = f64> {
    index: Index,
    columns: Vec<String>,
    data: Array2<T>,
}

impl<T: Clone> Frame<T> {
    /// Create a frame with a default `0..n` index.
    ///
    /// # Errors
    /// Returns [`EstimatorError::InvalidShape`] if the number of column names
    /// differs from the number of data columns.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        data: Array2<T>,
    ) -> Result<Self, EstimatorError> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.len() != data.ncols() {
            return Err(EstimatorError::InvalidShape {
                expected: format!("{} columns", columns.len()),
                got: format!("{} columns", data.ncols()),
            });
        }
        Ok(Self {
            index: Index::range(data.nrows()),
            columns,
            data,
        })
    }

    /// Create a frame from named column vectors of equal length.
    pub fn from_columns<S: Into<String>>(
        columns: Vec<(S, Vec<T>)>,
    ) -> Result<Self, EstimatorError> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let n_cols = columns.len();
        let mut names = Vec::with_capacity(n_cols);
        let mut values = Vec::with_capacity(n_rows * n_cols);
        let mut cols = Vec::with_capacity(n_cols);

        for (name, column) in columns {
            if column.len() != n_rows {
                return Err(EstimatorError::InvalidShape {
                    expected: format!("{} rows", n_rows),
                    got: format!("{} rows", column.len()),
                });
            }
            names.push(name.into());
            cols.push(column);
        }
        for row in 0..n_rows {
            for column in &cols {
                values.push(column[row].clone());
            }
        }

        let data = Array2::from_shape_vec((n_rows, n_cols), values).map_err(|e| {
            EstimatorError::InvalidShape {
                expected: format!("({}, {})", n_rows, n_cols),
                got: e.to_string(),
            }
        })?;
        Self::new(names, data)
    }

    /// Replace the row index.
    pub fn with_index(mut self, index: Index) -> Result<Self, EstimatorError> {
        if index.len() != self.data.nrows() {
            return Err(EstimatorError::InvalidShape {
                expected: format!("index of length {}", self.data.nrows()),
                got: format!("index of length {}", index.len()),
            });
        }
        self.index = index;
        Ok(self)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn values(&self) -> &Array2<T> {
        &self.data
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn into_values(self) -> Array2<T> {
        self.data
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Extract one column as a named series sharing this frame's index.
    pub fn column(&self, name: &str) -> Result<Series<T>, EstimatorError> {
        let pos = self
            .column_position(name)
            .ok_or_else(|| EstimatorError::MissingColumn(name.to_string()))?;
        Series::new(Some(name), self.data.column(pos).to_owned())
            .with_index(self.index.clone())
    }

    /// Select columns by name, in the given order.
    ///
    /// # Errors
    /// Returns [`EstimatorError::MissingColumn`] naming the first absent column.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, EstimatorError> {
        let positions = names
            .iter()
            .map(|n| {
                self.column_position(n.as_ref())
                    .ok_or_else(|| EstimatorError::MissingColumn(n.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            index: self.index.clone(),
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            data: self.data.select(Axis(1), &positions),
        })
    }

    /// Rows at the given positions, in that order.
    pub fn take_rows(&self, positions: &[usize]) -> Self {
        Self {
            index: self.index.take(positions),
            columns: self.columns.clone(),
            data: self.data.select(Axis(0), positions),
        }
    }

    /// Concatenate frames side by side; the index is taken from the first frame.
    ///
    /// # Errors
    /// Returns [`EstimatorError::EmptyData`] for an empty slice and
    /// [`EstimatorError::InvalidShape`] if row counts differ.
    pub fn hconcat(frames: &[Frame<T>]) -> Result<Self, EstimatorError> {
        let first = frames
            .first()
            .ok_or_else(|| EstimatorError::EmptyData("no frames to concatenate".to_string()))?;
        let n_rows = first.n_rows();
        if let Some(bad) = frames.iter().find(|f| f.n_rows() != n_rows) {
            return Err(EstimatorError::InvalidShape {
                expected: format!("{} rows", n_rows),
                got: format!("{} rows", bad.n_rows()),
            });
        }

        let views: Vec<ArrayView2<'_, T>> = frames.iter().map(|f| f.data.view()).collect();
        let data = concatenate(Axis(1), &views).map_err(|e| EstimatorError::InvalidShape {
            expected: "frames with matching rows".to_string(),
            got: e.to_string(),
        })?;

        Ok(Self {
            index: first.index.clone(),
            columns: frames.iter().flat_map(|f| f.columns.iter().cloned()).collect(),
            data,
        })
    }
}
