use learnframe::native::ensemble::RandomForestClassifier;
use learnframe::native::linear_model::{LinearRegression, LogisticRegression};
use learnframe::native::preprocessing::StandardScaler;
use learnframe::registry::{
    find_all_classes, find_all_submodules, find_namespace, list_classes, loaded_namespaces,
    native_delegate_classes, wrapper_class_for, NativeClass,
};
use learnframe::RegistryError;
use regex::Regex;

#[test]
fn test_native_to_wrapper_round_trip() {
    for namespace in loaded_namespaces() {
        let delegates = native_delegate_classes(namespace).unwrap();
        for (native, wrapper) in &delegates {
            assert_eq!(
                wrapper.wrapped_class(),
                Some(*native),
                "{} in {} does not wrap {}",
                wrapper,
                namespace,
                native
            );
            assert_eq!(wrapper_class_for(*native, namespace).unwrap(), *wrapper);
        }
    }
}

#[test]
fn test_every_wrapper_is_found() {
    let regression = find_namespace("learnframe.regression").unwrap();
    let classification = find_namespace("learnframe.classification").unwrap();
    let transformation = find_namespace("learnframe.transformation").unwrap();

    let wrapper = wrapper_class_for(NativeClass::of::<LinearRegression>(), regression).unwrap();
    assert_eq!(wrapper.name(), "LinearRegressionDF");
    let wrapper =
        wrapper_class_for(NativeClass::of::<RandomForestClassifier>(), classification).unwrap();
    assert_eq!(wrapper.name(), "RandomForestClassifierDF");
    let wrapper = wrapper_class_for(NativeClass::of::<StandardScaler>(), transformation).unwrap();
    assert_eq!(wrapper.name(), "StandardScalerDF");

    // Stacking is a composite, not a wrapper.
    let stacking = regression
        .classes()
        .find(|c| c.name() == "StackingRegressorDF")
        .unwrap();
    assert!(!stacking.is_wrapper());

    match wrapper_class_for(NativeClass::of::<LogisticRegression>(), regression) {
        Err(RegistryError::NotFound { native, namespace }) => {
            assert_eq!(native, "LogisticRegression");
            assert_eq!(namespace, "learnframe.regression");
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_list_classes_excludes() {
    let root = find_namespace("learnframe").unwrap();
    let namespaces: Vec<_> = find_all_submodules(root);
    assert!(!namespaces.is_empty());

    let excluding = ["Stacking", ".*CV", "Standard"];
    let found = list_classes(&namespaces, ".*DF", &excluding).unwrap();
    assert!(!found.is_empty());

    let patterns: Vec<Regex> = excluding
        .iter()
        .map(|p| Regex::new(&format!("^(?:{})", p)).unwrap())
        .collect();
    for class in &found {
        assert!(
            !patterns.iter().any(|p| p.is_match(class.name())),
            "{} matches an exclusion",
            class
        );
    }
    assert!(found.iter().any(|c| c.name() == "RidgeDF"));
    assert!(found.iter().all(|c| c.name() != "RidgeCVDF"));

    let names: Vec<&str> = found.iter().map(|c| c.name()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    // Without exclusions the result is a superset.
    let all = list_classes(&namespaces, ".*DF", &[]).unwrap();
    assert!(all.len() > found.len());
    assert!(found.iter().all(|c| all.contains(c)));
}

#[test]
fn test_find_all_classes_across_namespaces() {
    let regression = find_namespace("learnframe.regression").unwrap();
    let stacking = find_namespace("learnframe.stacking").unwrap();
    let both = find_all_classes(&[regression, stacking]);
    let regression_only = find_all_classes(&[regression]);

    // StackingRegressorDF is listed in both and counted once.
    assert_eq!(
        both.len(),
        regression_only.len() + stacking.classes().count() - 1
    );
}
