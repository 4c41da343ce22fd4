//! Benchmark utilities for learnframe.
//!
//! - Metrics for regression and classification predictions
//! - Wall-clock timing with warmup

pub mod metrics;
pub mod timing;

pub use metrics::{accuracy, RegressionMetrics};
pub use timing::{time_repeated, TimingStats};
