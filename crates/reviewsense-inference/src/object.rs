//! Object-graph records stored in model artifacts
//!
//! An artifact encodes the trained model as a tree of object records:
//!
//! ```json
//! {
//!   "__class__": "__main__.EnsembleBundle",
//!   "__args__": [],
//!   "__state__": { "models": { ... }, "weights": { "lr": 2.0 } }
//! }
//! ```
//!
//! `__class__` names the type the training process serialized. `__args__` are
//! constructor arguments and `__state__` is restored onto the constructed
//! object afterwards. Any nested map carrying `__class__` is itself a record.

use crate::estimators::{ProbabilityEstimator, ScoreEstimator};
use regex::Regex;
use reviewsense_core::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Reserved key holding the qualified class name
pub const CLASS_KEY: &str = "__class__";

/// Reserved key holding constructor arguments
pub const ARGS_KEY: &str = "__args__";

/// Reserved key holding the state restored after construction
pub const STATE_KEY: &str = "__state__";

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("valid namespace pattern")
    })
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .expect("valid identifier pattern")
    })
}

/// Qualified type name: namespace plus type name
///
/// `__main__.EnsembleBundle` has namespace `__main__` and name
/// `EnsembleBundle`. Namespaces may be dotted (`reviewsense.linear`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassPath {
    namespace: String,
    name: String,
}

impl ClassPath {
    /// Build a class path from its parts, validating both
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let name = name.into();

        if !namespace_pattern().is_match(&namespace) {
            return Err(Error::config(format!("invalid class namespace '{namespace}'")));
        }
        if !identifier_pattern().is_match(&name) {
            return Err(Error::config(format!("invalid class name '{name}'")));
        }

        Ok(Self { namespace, name })
    }

    /// Parse `namespace.Name`
    pub fn parse(qualified: &str) -> Result<Self> {
        let (namespace, name) = qualified.trim().rsplit_once('.').ok_or_else(|| {
            Error::config(format!("class '{qualified}' is not qualified with a namespace"))
        })?;
        Self::new(namespace, name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for ClassPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A decoded, not yet materialized object record
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub class: ClassPath,
    pub args: Vec<Value>,
    pub state: Map<String, Value>,
}

impl ObjectRecord {
    /// Whether a value is shaped like an object record
    pub fn is_record(value: &Value) -> bool {
        value
            .as_object()
            .map(|map| map.contains_key(CLASS_KEY))
            .unwrap_or(false)
    }

    /// Read a record out of a decoded value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::unsupported(format!(
                "expected an object record, found {}",
                kind_of(&value)
            )));
        };

        let class = match map.remove(CLASS_KEY) {
            Some(Value::String(qualified)) => ClassPath::parse(&qualified)?,
            Some(other) => {
                return Err(Error::config(format!(
                    "{CLASS_KEY} must be a string, found {}",
                    kind_of(&other)
                )))
            }
            None => return Err(Error::unsupported(format!("object has no {CLASS_KEY} key"))),
        };

        let args = match map.remove(ARGS_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(args)) => args,
            Some(single) => vec![single],
        };

        let state = match map.remove(STATE_KEY) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(state)) => state,
            Some(other) => {
                return Err(Error::config(format!(
                    "{STATE_KEY} of {class} must be a map, found {}",
                    kind_of(&other)
                )))
            }
        };

        Ok(Self { class, args, state })
    }
}

/// Human-readable JSON kind, for error messages
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

/// Whether any record is nested anywhere inside a value
pub(crate) fn contains_record(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(CLASS_KEY) || map.values().any(contains_record),
        Value::Array(items) => items.iter().any(contains_record),
        _ => false,
    }
}

/// A materialized model object
pub enum Instance {
    /// Exposes class probabilities
    Probability(Box<dyn ProbabilityEstimator>),

    /// Exposes only a decision score
    Score(Box<dyn ScoreEstimator>),

    /// Named member models plus their weights
    Ensemble(EnsembleParts),

    /// A shim object carrying whatever state the artifact recorded
    Placeholder(Placeholder),
}

impl Instance {
    /// Short description used in logs and errors
    pub fn describe(&self) -> String {
        match self {
            Self::Probability(est) => format!("probability estimator {}", est.name()),
            Self::Score(est) => format!("score estimator {}", est.name()),
            Self::Ensemble(parts) => format!("ensemble of {} models", parts.models.len()),
            Self::Placeholder(p) => format!("placeholder {}", p.class),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A state entry after materialization
#[derive(Debug)]
pub enum Slot {
    /// Plain data with no nested records
    Data(Value),
    /// A nested record
    Object(Instance),
    /// A map holding at least one nested record
    Table(BTreeMap<String, Slot>),
    /// A list holding at least one nested record
    List(Vec<Slot>),
}

impl Slot {
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }
}

/// Restored state of a materialized object
pub type State = BTreeMap<String, Slot>;

/// Convert a state made only of plain data back into a JSON map
pub(crate) fn state_into_value(class: &ClassPath, state: State) -> Result<Value> {
    let mut map = Map::new();
    for (key, slot) in state {
        match slot {
            Slot::Data(value) => {
                map.insert(key, value);
            }
            _ => {
                return Err(Error::config(format!(
                    "{class}: field '{key}' holds nested objects, expected plain data"
                )))
            }
        }
    }
    Ok(Value::Object(map))
}

/// Shim object standing in for a class that only existed at training time
///
/// It takes no meaning from constructor arguments; everything it knows comes
/// from the restored state.
#[derive(Debug)]
pub struct Placeholder {
    pub class: ClassPath,
    pub state: State,
}

/// Member models and weights of an ensemble
#[derive(Debug)]
pub struct EnsembleParts {
    pub models: BTreeMap<String, Instance>,

    /// Raw weights; non-numeric entries are kept as NaN for the adapter to report
    pub weights: BTreeMap<String, f64>,
}

impl EnsembleParts {
    /// Whether a restored state looks like an ensemble (`models` and `weights`)
    pub fn is_ensemble_state(state: &State) -> bool {
        state.contains_key("models") && state.contains_key("weights")
    }

    /// Pull `models` and `weights` out of a restored state
    pub fn from_state(class: &ClassPath, mut state: State) -> Result<Self> {
        let models = match state.remove("models") {
            Some(Slot::Table(table)) => {
                let mut models = BTreeMap::new();
                for (name, slot) in table {
                    match slot {
                        Slot::Object(instance) => {
                            models.insert(name, instance);
                        }
                        _ => {
                            return Err(Error::config(format!(
                                "{class}: model '{name}' is not an object record"
                            )))
                        }
                    }
                }
                models
            }
            Some(Slot::Data(Value::Object(map))) if map.is_empty() => BTreeMap::new(),
            Some(Slot::Data(Value::Null)) | None => BTreeMap::new(),
            Some(_) => {
                return Err(Error::config(format!(
                    "{class}: 'models' must map names to object records"
                )))
            }
        };

        let weights = match state.remove("weights") {
            Some(Slot::Data(Value::Object(map))) => map
                .into_iter()
                .map(|(name, weight)| (name, weight.as_f64().unwrap_or(f64::NAN)))
                .collect(),
            Some(Slot::Data(Value::Null)) | None => BTreeMap::new(),
            Some(_) => {
                return Err(Error::config(format!(
                    "{class}: 'weights' must map names to numbers"
                )))
            }
        };

        Ok(Self { models, weights })
    }
}
