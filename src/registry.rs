//! Class registry: explicit namespaces of classes, discovery and the mapping
//! from native classes to their frame-aware wrappers.
//!
//! Every public module of the crate lists its members in a `namespace()`
//! function. The process-wide table of loaded namespaces is built from those
//! lists on first use and never changes afterwards.
//!
//! # Example
//!
//! ```rust
//! use learnframe::native::linear_model::Ridge;
//! use learnframe::registry::{self, NativeClass};
//!
//! let regression = learnframe::regression::namespace();
//! let wrapper = registry::wrapper_class_for(NativeClass::of::<Ridge>(), &regression).unwrap();
//! assert_eq!(wrapper.name(), "RidgeDF");
//!
//! let forests = registry::list_classes(&[&regression], "RandomForest", &[]).unwrap();
//! assert_eq!(forests.len(), 1);
//! ```

use crate::error::RegistryError;
use crate::native::NativeType;
use crate::wrapper::{EstimatorDF, Wrapper};
use regex::Regex;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Identity of a native estimator class.
#[derive(Clone, Copy, Debug)]
pub struct NativeClass {
    name: &'static str,
    type_id: TypeId,
}

impl NativeClass {
    pub fn of<N: NativeType>() -> Self {
        Self {
            name: N::NAME,
            type_id: TypeId::of::<N>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl PartialEq for NativeClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for NativeClass {}

impl Hash for NativeClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Creates an instance of a class with default parameters.
pub type Factory = fn() -> Box<dyn EstimatorDF>;

fn create_default<E: EstimatorDF + Default + 'static>() -> Box<dyn EstimatorDF> {
    Box::new(E::default())
}

/// Descriptor of a class member of a namespace.
///
/// Equality and hashing use the type identity only.
#[derive(Clone, Copy, Debug)]
pub struct ClassInfo {
    name: &'static str,
    type_id: TypeId,
    wrapped: Option<NativeClass>,
    factory: Option<Factory>,
}

impl ClassInfo {
    /// A class that is not a wrapper.
    pub fn class<T: 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            wrapped: None,
            factory: None,
        }
    }

    /// A native estimator class.
    pub fn native<N: NativeType>() -> Self {
        Self::class::<N>(N::NAME)
    }

    /// A wrapper class; the only way to record a wrapped native class.
    pub fn wrapper<W: Wrapper>() -> Self {
        Self {
            name: W::NAME,
            type_id: TypeId::of::<W>(),
            wrapped: Some(W::wrapped_class()),
            factory: None,
        }
    }

    /// A wrapper class that can be created with default parameters.
    pub fn default_wrapper<W: Wrapper + EstimatorDF + Default>() -> Self {
        Self::wrapper::<W>().with_factory(create_default::<W>)
    }

    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The native class of a wrapper class.
    pub fn wrapped_class(&self) -> Option<NativeClass> {
        self.wrapped
    }

    pub fn is_wrapper(&self) -> bool {
        self.wrapped.is_some()
    }

    /// Whether this descriptor stands for the class `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// A new instance with default parameters, if the class has a factory.
    pub fn create(&self) -> Option<Box<dyn EstimatorDF>> {
        self.factory.map(|factory| factory())
    }
}

impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassInfo {}

impl Hash for ClassInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A named member of a namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Class(ClassInfo),
    Function(&'static str),
    Constant(&'static str),
}

impl Member {
    pub fn name(&self) -> &'static str {
        match self {
            Member::Class(class) => class.name(),
            Member::Function(name) | Member::Constant(name) => name,
        }
    }
}

/// A dotted-path namespace and its members, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Namespace {
    name: &'static str,
    members: Vec<Member>,
}

impl Namespace {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: ClassInfo) -> Self {
        self.members.push(Member::Class(class));
        self
    }

    pub fn with_function(mut self, name: &'static str) -> Self {
        self.members.push(Member::Function(name));
        self
    }

    pub fn with_constant(mut self, name: &'static str) -> Self {
        self.members.push(Member::Constant(name));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Class members in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.members.iter().filter_map(|m| match m {
            Member::Class(class) => Some(class),
            _ => None,
        })
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static LOADED: OnceLock<Vec<Namespace>> = OnceLock::new();

/// Every namespace of the crate, built once per process.
pub fn loaded_namespaces() -> &'static [Namespace] {
    LOADED.get_or_init(|| {
        let namespaces = vec![
            crate::namespace(),
            crate::classification::namespace(),
            crate::conformance::namespace(),
            crate::datasets::namespace(),
            crate::native::namespace(),
            crate::pipeline::namespace(),
            crate::regression::namespace(),
            namespace(),
            crate::stacking::namespace(),
            crate::transformation::namespace(),
            crate::wrapper::namespace(),
        ];
        tracing::debug!(n_namespaces = namespaces.len(), "loaded namespaces");
        namespaces
    })
}

/// A loaded namespace by its dotted name.
pub fn find_namespace(name: &str) -> Option<&'static Namespace> {
    loaded_namespaces().iter().find(|ns| ns.name() == name)
}

/// All class members of the given namespaces, deduplicated by identity.
pub fn find_all_classes(namespaces: &[&Namespace]) -> HashSet<ClassInfo> {
    namespaces
        .iter()
        .flat_map(|ns| ns.classes().copied())
        .collect()
}

/// All loaded namespaces nested below `parent`, in name order.
pub fn find_all_submodules(parent: &Namespace) -> Vec<&'static Namespace> {
    let prefix = format!("{}.", parent.name());
    let mut found: Vec<&'static Namespace> = loaded_namespaces()
        .iter()
        .filter(|ns| ns.name().starts_with(&prefix))
        .collect();
    found.sort_by_key(|ns| ns.name());
    found
}

/// Map each native class wrapped in `namespace` to its wrapper class.
///
/// # Errors
/// Returns [`RegistryError::DuplicateWrapper`] if two wrapper classes of the
/// namespace wrap the same native class.
pub fn native_delegate_classes(
    namespace: &Namespace,
) -> Result<HashMap<NativeClass, ClassInfo>, RegistryError> {
    let mut delegates: HashMap<NativeClass, ClassInfo> = HashMap::new();
    for class in namespace.classes() {
        let Some(native) = class.wrapped_class() else {
            continue;
        };
        if let Some(first) = delegates.get(&native) {
            if first != class {
                return Err(RegistryError::DuplicateWrapper {
                    native: native.name().to_string(),
                    first: first.name().to_string(),
                    second: class.name().to_string(),
                    namespace: namespace.name().to_string(),
                });
            }
        }
        delegates.insert(native, *class);
    }
    Ok(delegates)
}

/// Classes of the given namespaces whose name starts with a match of
/// `matching` and with a match of none of `excluding`, sorted by name.
///
/// # Errors
/// Returns [`RegistryError::InvalidPattern`] if a pattern does not compile.
pub fn list_classes(
    namespaces: &[&Namespace],
    matching: &str,
    excluding: &[&str],
) -> Result<Vec<ClassInfo>, RegistryError> {
    let matching = Regex::new(&format!("^(?:{})", matching))?;
    let excluding = if excluding.is_empty() {
        None
    } else {
        let alternatives: Vec<String> = excluding.iter().map(|p| format!("(?:{})", p)).collect();
        Some(Regex::new(&format!("^(?:{})", alternatives.join("|")))?)
    };

    let mut classes: Vec<ClassInfo> = find_all_classes(namespaces)
        .into_iter()
        .filter(|class| matching.is_match(class.name()))
        .filter(|class| {
            excluding
                .as_ref()
                .map_or(true, |excluding| !excluding.is_match(class.name()))
        })
        .collect();
    classes.sort_by_key(|class| class.name());
    Ok(classes)
}

/// The wrapper class for `native` in `namespace`.
///
/// # Errors
/// Returns [`RegistryError::NotFound`] naming both the native class and the
/// namespace if nothing in the namespace wraps it.
pub fn wrapper_class_for(
    native: NativeClass,
    namespace: &Namespace,
) -> Result<ClassInfo, RegistryError> {
    native_delegate_classes(namespace)?
        .remove(&native)
        .ok_or_else(|| RegistryError::NotFound {
            native: native.name().to_string(),
            namespace: namespace.name().to_string(),
        })
}

pub fn namespace() -> Namespace {
    Namespace::new("learnframe.registry")
        .with_class(ClassInfo::class::<NativeClass>("NativeClass"))
        .with_class(ClassInfo::class::<ClassInfo>("ClassInfo"))
        .with_class(ClassInfo::class::<Namespace>("Namespace"))
        .with_function("loaded_namespaces")
        .with_function("find_namespace")
        .with_function("find_all_classes")
        .with_function("find_all_submodules")
        .with_function("native_delegate_classes")
        .with_function("list_classes")
        .with_function("wrapper_class_for")
}
