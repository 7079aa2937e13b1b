//! Multi-strategy artifact deserialization
//!
//! Artifacts are decoded by trying each configured strategy in order, never by
//! file extension. A strategy fails either while decoding the bytes or while
//! materializing the decoded object graph; every failure is kept so that
//! exhaustion reports all of them at once.
//!
//! Before any strategy runs, the configured training-time classes are
//! installed as shims in the [`LegacyTypeRegistry`].

use crate::config::{InferenceConfig, StrategyKind};
use crate::estimators::LINEAR_SCORE;
use crate::object::{Instance, CLASS_KEY, STATE_KEY};
use crate::registry::{LegacyTypeRegistry, Materializer, TypeRegistry};
use reviewsense_core::{Attempt, AttemptKind, Error, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns artifact bytes into a decoded value
pub trait DecodeStrategy: Send + Sync {
    /// Name reported in attempts and on the status page
    fn name(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// General object serialization
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStrategy;

impl DecodeStrategy for JsonStrategy {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Tolerant alternative: YAML 1.2 (comments, JSON superset)
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlStrategy;

impl DecodeStrategy for YamlStrategy {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        serde_yaml::from_slice(bytes).map_err(|e| Error::config(e.to_string()))
    }
}

/// Row holding the intercept in a lexicon table
pub const INTERCEPT_ROW: &str = "__intercept__";

/// Minimal baseline format: one `token weight` pair per line
///
/// ```text
/// # exported weights
/// __intercept__  -0.25
/// great           1.8
/// not worth      -2.1
/// ```
///
/// Tokens may contain spaces (n-grams); the weight is the last field.
/// Decodes to a [`LINEAR_SCORE`] record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconTableStrategy;

impl DecodeStrategy for LexiconTableStrategy {
    fn name(&self) -> &'static str {
        "lexicon-table"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::config(format!("not UTF-8 text: {e}")))?;

        let mut weights = Map::new();
        let mut intercept = 0.0;
        let mut ngram_max = 1;

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let lineno = index + 1;
            let (token, weight) = line
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| Error::config(format!("line {lineno}: expected `token weight`")))?;

            let weight: f64 = weight
                .parse()
                .ok()
                .filter(|w: &f64| w.is_finite())
                .ok_or_else(|| Error::config(format!("line {lineno}: invalid weight '{weight}'")))?;

            let words: Vec<String> = token.split_whitespace().map(str::to_lowercase).collect();
            if words.len() == 1 && words[0] == INTERCEPT_ROW {
                intercept = weight;
                continue;
            }

            ngram_max = ngram_max.max(words.len());
            weights.insert(words.join(" "), Value::from(weight));
        }

        if weights.is_empty() {
            return Err(Error::config("no token weights found"));
        }

        let mut features = Map::new();
        features.insert("ngram_max".to_string(), Value::from(ngram_max));

        let mut state = Map::new();
        state.insert("features".to_string(), Value::Object(features));
        state.insert("weights".to_string(), Value::Object(weights));
        state.insert("intercept".to_string(), Value::from(intercept));

        let mut record = Map::new();
        record.insert(CLASS_KEY.to_string(), Value::from(LINEAR_SCORE));
        record.insert(STATE_KEY.to_string(), Value::Object(state));
        Ok(Value::Object(record))
    }
}

fn strategy_for(kind: StrategyKind) -> Box<dyn DecodeStrategy> {
    match kind {
        StrategyKind::Json => Box::new(JsonStrategy),
        StrategyKind::Yaml => Box::new(YamlStrategy),
        StrategyKind::LexiconTable => Box::new(LexiconTableStrategy),
    }
}

/// A successfully deserialized artifact
#[derive(Debug)]
pub struct Deserialized {
    pub instance: Instance,

    /// Strategy that succeeded
    pub strategy: &'static str,

    /// Hex-encoded SHA-256 of the artifact bytes
    pub sha256: String,

    pub path: PathBuf,
}

/// Hex-encoded SHA-256 digest
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Ordered-strategy deserializer with legacy class shims
pub struct Deserializer {
    strategies: Vec<Box<dyn DecodeStrategy>>,
    types: TypeRegistry,
    legacy: Arc<LegacyTypeRegistry>,
    legacy_classes: Vec<String>,
}

impl Deserializer {
    /// Default strategies and shims
    pub fn new() -> Self {
        Self::from_config(&InferenceConfig::default())
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self {
            strategies: config.strategies.iter().copied().map(strategy_for).collect(),
            types: TypeRegistry::builtin(),
            legacy: Arc::new(LegacyTypeRegistry::new()),
            legacy_classes: config.legacy_classes.clone(),
        }
    }

    /// Replace the strategy list
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Share a shim registry with other deserializers
    pub fn with_legacy_types(mut self, legacy: Arc<LegacyTypeRegistry>) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn legacy_types(&self) -> Arc<LegacyTypeRegistry> {
        Arc::clone(&self.legacy)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Install the configured shims; failures are logged, never raised
    pub fn install_shims(&self) {
        for qualified in &self.legacy_classes {
            if let Err(e) = self.legacy.install(qualified) {
                warn!(class = %qualified, error = %e, "Failed to install legacy type shim");
            }
        }
    }

    /// Read and deserialize an artifact
    pub fn deserialize(&self, path: &Path) -> Result<Deserialized> {
        let bytes = fs::read(path).map_err(|e| Error::DeserializationExhausted {
            path: path.to_path_buf(),
            attempts: vec![Attempt::new("file", AttemptKind::Read, e.to_string())],
        })?;

        let (instance, strategy) = self.deserialize_bytes(&bytes, path)?;
        let sha256 = fingerprint(&bytes);

        info!(
            path = %path.display(),
            strategy,
            sha256 = %sha256,
            model = %instance.describe(),
            "Deserialized model artifact"
        );

        Ok(Deserialized {
            instance,
            strategy,
            sha256,
            path: path.to_path_buf(),
        })
    }

    /// Try every strategy on in-memory bytes; `origin` is used for reporting
    pub fn deserialize_bytes(&self, bytes: &[u8], origin: &Path) -> Result<(Instance, &'static str)> {
        self.install_shims();
        let materializer = Materializer::new(&self.types, &self.legacy);
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let name = strategy.name();

            let decoded = match strategy.decode(bytes) {
                Ok(value) => value,
                Err(e) => {
                    debug!(strategy = name, error = %e, "Decode failed");
                    attempts.push(Attempt::new(name, AttemptKind::Decode, e.to_string()));
                    continue;
                }
            };

            match materializer.materialize(decoded) {
                Ok(instance) => return Ok((instance, name)),
                Err(e) => {
                    debug!(strategy = name, error = %e, "Materialize failed");
                    attempts.push(Attempt::new(name, AttemptKind::Materialize, e.to_string()));
                }
            }
        }

        Err(Error::DeserializationExhausted {
            path: origin.to_path_buf(),
            attempts,
        })
    }
}

impl Default for Deserializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origin() -> PathBuf {
        PathBuf::from("model/ensemble.json")
    }

    fn legacy_bundle() -> String {
        json!({
            "__class__": "__main__.EnsembleBundle",
            "__args__": [],
            "__state__": {
                "models": {
                    "lr": {
                        "__class__": "reviewsense.linear.LogisticText",
                        "__state__": { "weights": { "great": 2.0 }, "intercept": 0.0 }
                    }
                },
                "weights": { "lr": 1.0 }
            }
        })
        .to_string()
    }

    #[test]
    fn test_json_through_shim() {
        let deserializer = Deserializer::new();
        let (instance, strategy) = deserializer
            .deserialize_bytes(legacy_bundle().as_bytes(), &origin())
            .unwrap();

        assert_eq!(strategy, "json");
        assert!(matches!(instance, Instance::Placeholder(_)));
        assert_eq!(deserializer.legacy_types().installed(), vec!["__main__.EnsembleBundle"]);
    }

    #[test]
    fn test_missing_shim_is_materialize_failure() {
        let config = InferenceConfig {
            legacy_classes: Vec::new(),
            ..Default::default()
        };
        let err = Deserializer::from_config(&config)
            .deserialize_bytes(legacy_bundle().as_bytes(), &origin())
            .unwrap_err();

        let Error::DeserializationExhausted { attempts, .. } = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].kind, AttemptKind::Materialize);
        assert!(attempts[0].message.contains("__main__.EnsembleBundle"));
    }

    #[test]
    fn test_yaml_with_comments() {
        let yaml = r#"
# exported by the training job
__class__: reviewsense.linear.LinearScore
__state__:
  weights: { great: 1.0 }
  intercept: -0.5
"#;
        let (instance, strategy) = Deserializer::new()
            .deserialize_bytes(yaml.as_bytes(), &origin())
            .unwrap();

        assert_eq!(strategy, "yaml");
        assert!(matches!(instance, Instance::Score(_)));
    }

    #[test]
    fn test_lexicon_table() {
        let table = "# weights\n__intercept__ -0.25\ngreat\t1.5\nnot worth   -2.0\n";
        let value = LexiconTableStrategy.decode(table.as_bytes()).unwrap();

        assert_eq!(value["__class__"], LINEAR_SCORE);
        assert_eq!(value["__state__"]["intercept"], -0.25);
        assert_eq!(value["__state__"]["weights"]["not worth"], -2.0);
        assert_eq!(value["__state__"]["features"]["ngram_max"], 2);

        let (instance, strategy) = Deserializer::new()
            .deserialize_bytes(table.as_bytes(), &origin())
            .unwrap();
        assert_eq!(strategy, "lexicon-table");
        assert!(matches!(instance, Instance::Score(_)));
    }

    #[test]
    fn test_lexicon_table_rejects_bad_rows() {
        assert!(LexiconTableStrategy.decode(b"great").is_err());
        assert!(LexiconTableStrategy.decode(b"great NaN").is_err());
        assert!(LexiconTableStrategy.decode(b"# only comments\n").is_err());
        assert!(LexiconTableStrategy.decode(&[0xff, 0xfe, 0x20, 0x31]).is_err());
    }

    #[test]
    fn test_corrupt_bytes_exhaust_every_strategy() {
        let err = Deserializer::new()
            .deserialize_bytes(b"{ this is not a model", &origin())
            .unwrap_err();

        let Error::DeserializationExhausted { attempts, path } = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(path, origin());
        let strategies: Vec<_> = attempts.iter().map(|a| a.strategy.as_str()).collect();
        assert_eq!(strategies, vec!["json", "yaml", "lexicon-table"]);
    }

    #[test]
    fn test_unreadable_file() {
        let err = Deserializer::new()
            .deserialize(Path::new("/nonexistent/ensemble.json"))
            .unwrap_err();

        let Error::DeserializationExhausted { attempts, .. } = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].kind, AttemptKind::Read);
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_invalid_shim_name_is_logged_not_raised() {
        let config = InferenceConfig {
            legacy_classes: vec!["NotQualified".to_string(), "__main__.EnsembleBundle".to_string()],
            ..Default::default()
        };
        let deserializer = Deserializer::from_config(&config);
        deserializer.install_shims();

        assert_eq!(deserializer.legacy_types().installed(), vec!["__main__.EnsembleBundle"]);
    }
}
