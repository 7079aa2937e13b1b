//! Type resolution for artifact object graphs
//!
//! Class names in an artifact resolve in two places. The [`TypeRegistry`]
//! holds the estimator types this crate implements. The
//! [`LegacyTypeRegistry`] holds shims for classes that were only defined
//! inside the training process (for example `__main__.EnsembleBundle`): a shim
//! builds a [`Placeholder`] that keeps whatever state the artifact recorded.

use crate::estimators::{
    FromState, LinearScore, LogisticText, NaiveBayesText, SoftVoting, LINEAR_SCORE,
    LOGISTIC_TEXT, NAIVE_BAYES_TEXT, SOFT_VOTING,
};
use crate::object::{contains_record, kind_of, ClassPath, Instance, ObjectRecord, Placeholder, Slot, State};
use parking_lot::RwLock;
use reviewsense_core::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

/// Deepest object graph accepted from an artifact
pub const MAX_DEPTH: usize = 64;

/// A constructed object waiting for its state
pub trait Blank: Send {
    /// Apply the restored state and produce the final instance
    fn restore(self: Box<Self>, state: State) -> Result<Instance>;
}

/// Builds a blank object from a class path and constructor arguments
pub type Constructor =
    Arc<dyn Fn(&ClassPath, &[Value]) -> Result<Box<dyn Blank>> + Send + Sync>;

struct Pending<T> {
    class: ClassPath,
    _kind: PhantomData<fn() -> T>,
}

impl<T: FromState> Blank for Pending<T> {
    fn restore(self: Box<Self>, state: State) -> Result<Instance> {
        T::from_state(&self.class, state)
    }
}

fn state_constructor<T: FromState + 'static>() -> Constructor {
    Arc::new(|class: &ClassPath, args: &[Value]| {
        if !args.is_empty() {
            debug!(class = %class, count = args.len(), "Ignoring constructor arguments");
        }
        Ok(Box::new(Pending::<T> {
            class: class.clone(),
            _kind: PhantomData,
        }) as Box<dyn Blank>)
    })
}

struct PlaceholderBlank {
    class: ClassPath,
}

impl Blank for PlaceholderBlank {
    fn restore(self: Box<Self>, state: State) -> Result<Instance> {
        Ok(Instance::Placeholder(Placeholder {
            class: self.class,
            state,
        }))
    }
}

/// Constructor of a shim: arguments carry no meaning and are dropped
pub fn placeholder_constructor() -> Constructor {
    Arc::new(|class: &ClassPath, _args: &[Value]| {
        Ok(Box::new(PlaceholderBlank {
            class: class.clone(),
        }) as Box<dyn Blank>)
    })
}

/// Estimator types implemented by this crate
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: HashMap<ClassPath, Constructor>,
}

impl TypeRegistry {
    /// Registry with an empty type table
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in estimator type
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_state::<LogisticText>(LOGISTIC_TEXT);
        registry.register_state::<LinearScore>(LINEAR_SCORE);
        registry.register_state::<NaiveBayesText>(NAIVE_BAYES_TEXT);
        registry.register_state::<SoftVoting>(SOFT_VOTING);
        registry
    }

    fn register_state<T: FromState + 'static>(&mut self, qualified: &str) {
        match ClassPath::parse(qualified) {
            Ok(class) => self.register(class, state_constructor::<T>()),
            Err(e) => debug!("Skipping built-in type {}: {}", qualified, e),
        }
    }

    /// Register (or replace) a constructor for a class
    pub fn register(&mut self, class: ClassPath, constructor: Constructor) {
        self.constructors.insert(class, constructor);
    }

    pub fn resolve(&self, class: &ClassPath) -> Option<Constructor> {
        self.constructors.get(class).cloned()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// Process-wide shims for training-time classes
///
/// Installation is idempotent and safe from any thread.
#[derive(Default)]
pub struct LegacyTypeRegistry {
    shims: RwLock<HashMap<ClassPath, Constructor>>,
}

impl LegacyTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a placeholder shim for `namespace.Name`
    ///
    /// Returns `Ok(false)` when the shim was already installed.
    pub fn install(&self, qualified: &str) -> Result<bool> {
        let class = ClassPath::parse(qualified)?;
        Ok(self.install_with(class, placeholder_constructor()))
    }

    /// Install a shim with a custom constructor; existing shims are kept
    pub fn install_with(&self, class: ClassPath, constructor: Constructor) -> bool {
        let mut shims = self.shims.write();
        if shims.contains_key(&class) {
            return false;
        }
        info!(class = %class, "Installed legacy type shim");
        shims.insert(class, constructor);
        true
    }

    pub fn resolve(&self, class: &ClassPath) -> Option<Constructor> {
        self.shims.read().get(class).cloned()
    }

    /// Installed shims, sorted by qualified name
    pub fn installed(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shims.read().keys().map(ToString::to_string).collect();
        names.sort();
        names
    }
}

/// Turns a decoded object graph into model instances
pub struct Materializer<'a> {
    types: &'a TypeRegistry,
    legacy: &'a LegacyTypeRegistry,
}

impl<'a> Materializer<'a> {
    pub fn new(types: &'a TypeRegistry, legacy: &'a LegacyTypeRegistry) -> Self {
        Self { types, legacy }
    }

    /// Materialize the root record of an artifact
    pub fn materialize(&self, root: Value) -> Result<Instance> {
        if !ObjectRecord::is_record(&root) {
            return Err(Error::unsupported(format!(
                "artifact root is {}, not an object record",
                kind_of(&root)
            )));
        }
        self.object(root, 0)
    }

    fn object(&self, value: Value, depth: usize) -> Result<Instance> {
        if depth > MAX_DEPTH {
            return Err(Error::unsupported(format!(
                "object graph nested deeper than {MAX_DEPTH} levels"
            )));
        }

        let record = ObjectRecord::from_value(value)?;
        let constructor = self.constructor(&record.class)?;
        let blank = constructor(&record.class, &record.args)?;

        let mut state = State::new();
        for (key, value) in record.state {
            state.insert(key, self.slot(value, depth + 1)?);
        }

        blank.restore(state)
    }

    fn slot(&self, value: Value, depth: usize) -> Result<Slot> {
        if ObjectRecord::is_record(&value) {
            return Ok(Slot::Object(self.object(value, depth)?));
        }
        if !contains_record(&value) {
            return Ok(Slot::Data(value));
        }

        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| Ok((key, self.slot(value, depth + 1)?)))
                .collect::<Result<_>>()
                .map(Slot::Table),
            Value::Array(items) => items
                .into_iter()
                .map(|value| self.slot(value, depth + 1))
                .collect::<Result<_>>()
                .map(Slot::List),
            other => Ok(Slot::Data(other)),
        }
    }

    fn constructor(&self, class: &ClassPath) -> Result<Constructor> {
        self.types
            .resolve(class)
            .or_else(|| self.legacy.resolve(class))
            .ok_or_else(|| Error::unsupported(format!("cannot resolve class `{class}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn bundle() -> Value {
        json!({
            "__class__": "__main__.EnsembleBundle",
            "__args__": ["ignored"],
            "__state__": {
                "models": {
                    "lr": {
                        "__class__": "reviewsense.linear.LogisticText",
                        "__state__": { "weights": { "great": 1.0 }, "intercept": 0.0 }
                    }
                },
                "weights": { "lr": 1.0 },
                "version": 3
            }
        })
    }

    #[test]
    fn test_install_is_idempotent() {
        let legacy = LegacyTypeRegistry::new();
        assert!(legacy.install("__main__.EnsembleBundle").unwrap());
        assert!(!legacy.install("__main__.EnsembleBundle").unwrap());
        assert_eq!(legacy.installed(), vec!["__main__.EnsembleBundle"]);
    }

    #[test]
    fn test_install_rejects_unqualified_name() {
        let legacy = LegacyTypeRegistry::new();
        assert!(legacy.install("EnsembleBundle").is_err());
        assert!(legacy.installed().is_empty());
    }

    #[test]
    fn test_concurrent_install() {
        let legacy = Arc::new(LegacyTypeRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let legacy = Arc::clone(&legacy);
                thread::spawn(move || legacy.install("__main__.EnsembleBundle").unwrap())
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|installed| *installed)
            .count();
        assert_eq!(fresh, 1);
    }

    #[test]
    fn test_materialize_through_shim() {
        let types = TypeRegistry::builtin();
        let legacy = LegacyTypeRegistry::new();
        legacy.install("__main__.EnsembleBundle").unwrap();

        let instance = Materializer::new(&types, &legacy).materialize(bundle()).unwrap();
        let Instance::Placeholder(placeholder) = instance else {
            panic!("expected a placeholder");
        };
        assert_eq!(placeholder.class.to_string(), "__main__.EnsembleBundle");
        assert!(matches!(placeholder.state.get("models"), Some(Slot::Table(_))));
        assert_eq!(placeholder.state["version"].as_data(), Some(&json!(3)));
    }

    #[test]
    fn test_unresolved_class_is_named() {
        let types = TypeRegistry::builtin();
        let legacy = LegacyTypeRegistry::new();

        let err = Materializer::new(&types, &legacy).materialize(bundle()).unwrap_err();
        assert!(err.to_string().contains("__main__.EnsembleBundle"));
    }

    #[test]
    fn test_root_must_be_record() {
        let types = TypeRegistry::builtin();
        let legacy = LegacyTypeRegistry::new();

        let err = Materializer::new(&types, &legacy)
            .materialize(json!({ "weights": {} }))
            .unwrap_err();
        assert!(err.to_string().contains("not an object record"));
    }

    #[test]
    fn test_builtin_soft_voting() {
        let types = TypeRegistry::builtin();
        let legacy = LegacyTypeRegistry::new();
        let mut root = bundle();
        root["__class__"] = json!("reviewsense.ensemble.SoftVoting");

        let instance = Materializer::new(&types, &legacy).materialize(root).unwrap();
        let Instance::Ensemble(parts) = instance else {
            panic!("expected an ensemble");
        };
        assert_eq!(parts.models.len(), 1);
        assert_eq!(parts.weights["lr"], 1.0);
    }

    #[test]
    fn test_depth_limit() {
        let types = TypeRegistry::builtin();
        let legacy = LegacyTypeRegistry::new();
        legacy.install("__main__.Nested").unwrap();

        let mut value = json!({ "__class__": "__main__.Nested" });
        for _ in 0..(MAX_DEPTH + 2) {
            value = json!({ "__class__": "__main__.Nested", "__state__": { "inner": value } });
        }

        let err = Materializer::new(&types, &legacy).materialize(value).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }
}
