//! Wall-clock timing of repeated runs.

use serde::Serialize;
use std::time::Instant;

/// Summary of repeated run times, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingStats {
    pub runs: usize,
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub median_ms: f64,
    pub max_ms: f64,
}

impl TimingStats {
    /// Summarize run times; all fields are 0 without runs.
    pub fn from_times(mut times: Vec<f64>) -> Self {
        let n = times.len();
        if n == 0 {
            return Self {
                runs: 0,
                mean_ms: 0.0,
                std_dev_ms: 0.0,
                min_ms: 0.0,
                median_ms: 0.0,
                max_ms: 0.0,
            };
        }
        times.sort_by(f64::total_cmp);

        let mean = times.iter().sum::<f64>() / n as f64;
        let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (times[n / 2 - 1] + times[n / 2]) / 2.0
        } else {
            times[n / 2]
        };

        Self {
            runs: n,
            mean_ms: mean,
            std_dev_ms: variance.sqrt(),
            min_ms: times[0],
            median_ms: median,
            max_ms: times[n - 1],
        }
    }
}

/// Run `f` `warmup` times unmeasured, then `iterations` times measured.
///
/// Returns the result of the last measured run, or `None` without measured runs.
pub fn time_repeated<F, R>(warmup: usize, iterations: usize, mut f: F) -> (Option<R>, TimingStats)
where
    F: FnMut() -> R,
{
    for _ in 0..warmup {
        std::hint::black_box(f());
    }

    let mut last = None;
    let mut times = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        let result = f();
        times.push(start.elapsed().as_secs_f64() * 1000.0);
        last = Some(result);
    }
    (last, TimingStats::from_times(times))
}
