//! Configuration for model loading

use reviewsense_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for the inference layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Directory holding the model artifact and manifest
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Candidate file names inside `model_dir`
    #[serde(default)]
    pub artifacts: ArtifactNames,

    /// Training-time classes to shim, as `namespace.Name`
    #[serde(default = "default_legacy_classes")]
    pub legacy_classes: Vec<String>,

    /// Deserialization strategies, tried in order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,
}

/// Artifact file names, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNames {
    /// Soft-voting ensemble export
    #[serde(default = "default_preferred")]
    pub preferred: String,

    /// Ensemble export of the older notebook flow
    #[serde(default = "default_legacy")]
    pub legacy: String,

    #[serde(default = "default_manifest")]
    pub manifest: String,
}

/// A deserialization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Json,
    Yaml,
    LexiconTable,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::LexiconTable => "lexicon-table",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            artifacts: ArtifactNames::default(),
            legacy_classes: default_legacy_classes(),
            strategies: default_strategies(),
        }
    }
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            preferred: default_preferred(),
            legacy: default_legacy(),
            manifest: default_manifest(),
        }
    }
}

impl InferenceConfig {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(e.to_string()))
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    pub fn with_model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = model_dir.into();
        self
    }
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("./model")
}

fn default_preferred() -> String {
    "ensemble_soft.json".to_string()
}

fn default_legacy() -> String {
    "ensemble.json".to_string()
}

fn default_manifest() -> String {
    "manifest.json".to_string()
}

fn default_legacy_classes() -> Vec<String> {
    vec!["__main__.EnsembleBundle".to_string()]
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![StrategyKind::Json, StrategyKind::Yaml, StrategyKind::LexiconTable]
}
