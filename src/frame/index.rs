//! Row index for frames and series.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single row label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Int(i64),
    Str(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(i) => write!(f, "{}", i),
            Label::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Str(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Str(value)
    }
}

/// Ordered row labels. Labels need not be unique.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    labels: Vec<Label>,
}

impl Index {
    /// Default index `0..n`.
    pub fn range(n: usize) -> Self {
        Self {
            labels: (0..n as i64).map(Label::Int).collect(),
        }
    }

    pub fn new<L: Into<Label>>(labels: impl IntoIterator<Item = L>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn get(&self, position: usize) -> Option<&Label> {
        self.labels.get(position)
    }

    /// Labels at the given positions, in that order.
    pub fn take(&self, positions: &[usize]) -> Self {
        Self {
            labels: positions.iter().map(|&p| self.labels[p].clone()).collect(),
        }
    }
}
