//! Collect timing and scores of frame wrappers against their native estimators.
//!
//! Every configuration is fitted on seeded synthetic data and records:
//! - Fit time of the wrapper and of the bare native estimator
//! - R² for regressors, accuracy for classifiers
//!
//! Results are written as JSON to the path given as the first argument,
//! `benchmarks/results/learnframe_metrics.json` by default.

use benchmarks::{accuracy, time_repeated, RegressionMetrics, TimingStats};
use learnframe::classification::{LogisticRegressionDF, RandomForestClassifierDF};
use learnframe::datasets::{make_classification, make_regression, SyntheticConfig};
use learnframe::native::ensemble::RandomForestClassifier;
use learnframe::native::linear_model::{LinearRegression, LogisticRegression, Ridge};
use learnframe::native::{NativeEstimator, Targets};
use learnframe::regression::{LinearRegressionDF, RidgeDF, StackingRegressorDF};
use learnframe::stacking::StackMember;
use learnframe::wrapper::{EstimatorDF, LearnerDF, Target};
use learnframe::{EstimatorError, Frame};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::fs;
use std::path::Path;

const WARMUP: usize = 2;
const ITERATIONS: usize = 10;

#[derive(Serialize)]
struct Record {
    model: &'static str,
    n_samples: usize,
    n_features: usize,
    wrapper_fit: TimingStats,
    native_fit: Option<TimingStats>,
    score: f64,
}

fn fit_timed<E: EstimatorDF + Clone>(
    estimator: &E,
    x: &Frame,
    y: &Target,
) -> Result<(E, TimingStats), EstimatorError> {
    let (fitted, stats) = time_repeated(WARMUP, ITERATIONS, || {
        let mut model = estimator.clone();
        model.fit(x, Some(y)).map(|_| model)
    });
    let fitted = fitted.ok_or_else(|| EstimatorError::EmptyData("no measured runs".into()))??;
    Ok((fitted, stats))
}

fn native_fit_timed<N: NativeEstimator + Clone>(
    estimator: &N,
    x: &Frame,
    y: &Targets,
) -> Result<TimingStats, EstimatorError> {
    let (result, stats) = time_repeated(WARMUP, ITERATIONS, || {
        let mut model = estimator.clone();
        model.fit(x.values().view(), Some(y))
    });
    result.unwrap_or(Ok(()))?;
    Ok(stats)
}

fn r_squared<E: LearnerDF>(model: &E, x: &Frame, y: &[f64]) -> Result<f64, EstimatorError> {
    let prediction = model.predict(x)?;
    let values = prediction
        .as_values()
        .ok_or_else(|| EstimatorError::InvalidParameter("expected continuous predictions".into()))?;
    Ok(RegressionMetrics::score(y, &values.values().to_vec()).r_squared)
}

fn label_accuracy<E: LearnerDF>(model: &E, x: &Frame, y: &[String]) -> Result<f64, EstimatorError> {
    let prediction = model.predict(x)?;
    let labels = prediction
        .as_labels()
        .ok_or_else(|| EstimatorError::InvalidParameter("expected class labels".into()))?;
    Ok(accuracy(y, &labels.values().to_vec()))
}

fn regression_records(n_features: usize) -> Result<Vec<Record>, Box<dyn Error>> {
    let config = SyntheticConfig::default()
        .with_n_samples(1_000)
        .with_n_features(n_features)
        .with_noise(1.0)
        .with_random_state(42);
    let (x, y) = make_regression(&config)?;
    let truth = y.values().to_vec();
    let native_y = Targets::Values(y.values().clone());
    let y: Target = y.into();

    let mut records = Vec::new();

    let (model, wrapper_fit) = fit_timed(&LinearRegressionDF::default(), &x, &y)?;
    records.push(Record {
        model: "LinearRegressionDF",
        n_samples: config.n_samples,
        n_features,
        wrapper_fit,
        native_fit: Some(native_fit_timed(&LinearRegression::default(), &x, &native_y)?),
        score: r_squared(&model, &x, &truth)?,
    });

    let (model, wrapper_fit) = fit_timed(&RidgeDF::default(), &x, &y)?;
    records.push(Record {
        model: "RidgeDF",
        n_samples: config.n_samples,
        n_features,
        wrapper_fit,
        native_fit: Some(native_fit_timed(&Ridge::default(), &x, &native_y)?),
        score: r_squared(&model, &x, &truth)?,
    });

    let stack = StackingRegressorDF::new(vec![
        ("ols", StackMember::estimator(LinearRegressionDF::default())),
        ("ridge", StackMember::estimator(RidgeDF::default())),
    ])?;
    let (model, wrapper_fit) = fit_timed(&stack, &x, &y)?;
    records.push(Record {
        model: "StackingRegressorDF",
        n_samples: config.n_samples,
        n_features,
        wrapper_fit,
        native_fit: None,
        score: r_squared(&model, &x, &truth)?,
    });

    Ok(records)
}

fn classification_records(n_features: usize) -> Result<Vec<Record>, Box<dyn Error>> {
    let config = SyntheticConfig::default()
        .with_n_samples(600)
        .with_n_features(n_features)
        .with_random_state(42);
    let (x, y) = make_classification(&config)?;
    let truth = y.values().to_vec();
    let native_y = Targets::Labels(y.values().clone());
    let y: Target = y.into();

    let mut records = Vec::new();

    let (model, wrapper_fit) = fit_timed(&LogisticRegressionDF::default(), &x, &y)?;
    records.push(Record {
        model: "LogisticRegressionDF",
        n_samples: config.n_samples,
        n_features,
        wrapper_fit,
        native_fit: Some(native_fit_timed(&LogisticRegression::default(), &x, &native_y)?),
        score: label_accuracy(&model, &x, &truth)?,
    });

    let (model, wrapper_fit) = fit_timed(&RandomForestClassifierDF::default(), &x, &y)?;
    records.push(Record {
        model: "RandomForestClassifierDF",
        n_samples: config.n_samples,
        n_features,
        wrapper_fit,
        native_fit: Some(native_fit_timed(
            &RandomForestClassifier::default(),
            &x,
            &native_y,
        )?),
        score: label_accuracy(&model, &x, &truth)?,
    });

    Ok(records)
}

fn main() -> Result<(), Box<dyn Error>> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "benchmarks/results/learnframe_metrics.json".to_string());

    let mut records = Vec::new();
    for n_features in [4, 16] {
        println!("Collecting metrics for {} features...", n_features);
        records.extend(regression_records(n_features)?);
        records.extend(classification_records(n_features)?);
    }

    for record in &records {
        println!(
            "{:<26} {:>3} features  fit {:>9.3} ms  score {:.4}",
            record.model, record.n_features, record.wrapper_fit.mean_ms, record.score
        );
    }

    let output = json!({
        "library": "learnframe",
        "version": learnframe::VERSION,
        "warmup": WARMUP,
        "iterations": ITERATIONS,
        "results": records,
    });

    let path = Path::new(&output_path);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(&output)?)?;
    println!("\nMetrics collected and saved to {}", output_path);
    Ok(())
}
