//! CSV input for numeric frames.

use crate::error::EstimatorError;
use crate::frame::{Frame, Series};
use csv::ReaderBuilder;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

impl Frame<f64> {
    /// Load a numeric frame from a CSV file with a header row.
    ///
    /// Empty cells are read as NaN (missing).
    ///
    /// # Errors
    /// Returns [`EstimatorError::Io`] if the file cannot be read and
    /// [`EstimatorError::InvalidParameter`] for a non-numeric cell.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, EstimatorError> {
        let file = File::open(path)?;
        Self::read_csv_from(BufReader::new(file))
    }

    /// Load a numeric frame from any CSV reader with a header row.
    pub fn read_csv_from<R: Read>(reader: R) -> Result<Self, EstimatorError> {
        let mut rdr = ReaderBuilder::new().from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

        let mut values = Vec::new();
        let mut n_rows = 0;
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            for (col, cell) in record.iter().enumerate() {
                values.push(parse_cell(cell.trim(), row, &columns[col])?);
            }
            n_rows += 1;
        }

        let data = Array2::from_shape_vec((n_rows, columns.len()), values).map_err(|e| {
            EstimatorError::InvalidShape {
                expected: format!("{} columns per row", columns.len()),
                got: e.to_string(),
            }
        })?;
        Frame::new(columns, data)
    }

    /// Split a frame into features and a named target column.
    pub fn split_target(&self, target: &str) -> Result<(Frame, Series), EstimatorError> {
        let y = self.column(target)?;
        let features: Vec<&String> = self.columns.iter().filter(|c| *c != target).collect();
        Ok((self.select(&features)?, y))
    }
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64, EstimatorError> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse().map_err(|_| {
        EstimatorError::InvalidParameter(format!(
            "non-numeric value '{}' in column '{}' at row {}",
            cell, column, row
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_from_reader() {
        let data = "a,b,target\n1,2,10\n3,,20\n";
        let frame = Frame::read_csv_from(data.as_bytes()).unwrap();
        assert_eq!(frame.shape(), (2, 3));
        assert!(frame.values()[[1, 1]].is_nan());

        let (x, y) = frame.split_target("target").unwrap();
        assert_eq!(x.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(y.name(), Some("target"));
        assert_eq!(y.values().to_vec(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_read_csv_rejects_text() {
        let data = "a\nhello\n";
        let result = Frame::read_csv_from(data.as_bytes());
        assert!(matches!(result, Err(EstimatorError::InvalidParameter(_))));
    }

    #[test]
    fn test_read_csv_file() {
        let path = std::env::temp_dir().join("learnframe_read_csv.csv");
        std::fs::write(&path, "x,y\n0.5,1.5\n").unwrap();
        let frame = Frame::read_csv(&path).unwrap();
        assert_eq!(frame.values()[[0, 1]], 1.5);
        std::fs::remove_file(path).ok();
    }
}
