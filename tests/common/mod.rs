#![allow(dead_code)]

use learnframe::datasets::{make_classification, make_regression, SyntheticConfig};
use learnframe::frame::{Frame, Series};

pub const BOSTON_FEATURES: [&str; 13] = [
    "CRIM", "ZN", "INDUS", "CHAS", "NOX", "RM", "AGE", "DIS", "RAD", "TAX", "PTRATIO", "B",
    "LSTAT",
];

pub const IRIS_FEATURES: [&str; 4] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

pub const IRIS_CLASSES: [&str; 3] = ["setosa", "versicolor", "virginica"];

/// A housing-style regression table: 13 named features, 120 rows.
pub fn boston() -> (Frame, Series) {
    let config = SyntheticConfig::default()
        .with_n_samples(120)
        .with_n_features(BOSTON_FEATURES.len())
        .with_noise(0.5)
        .with_random_state(42);
    let (x, y) = make_regression(&config).unwrap();
    let x = Frame::new(BOSTON_FEATURES, x.into_values()).unwrap();
    let y = Series::new(Some("price"), y.values().clone());
    (x, y)
}

/// An iris-style classification table: 4 named features, 3 named classes.
pub fn iris() -> (Frame, Series<String>) {
    let config = SyntheticConfig::default()
        .with_n_samples(150)
        .with_n_features(IRIS_FEATURES.len())
        .with_n_classes(IRIS_CLASSES.len())
        .with_class_sep(3.0)
        .with_random_state(7);
    let (x, y) = make_classification(&config).unwrap();
    let x = Frame::new(IRIS_FEATURES, x.into_values()).unwrap();
    let labels: Vec<String> = y
        .values()
        .iter()
        .map(|label| {
            let class: usize = label.trim_start_matches("class_").parse().unwrap();
            IRIS_CLASSES[class].to_string()
        })
        .collect();
    (x, Series::from_vec(Some("species"), labels))
}
