//! Error types for reviewsense

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Result type alias using reviewsense's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reviewsense operations
///
/// None of these escape the inference service: every variant either
/// downgrades the service to the fallback predictor or is logged as a
/// configuration defect. They surface as diagnostics on the status report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No candidate artifact exists in the model directory
    #[error("no model artifact found in {}", .dir.display())]
    ArtifactNotFound { dir: PathBuf },

    /// Every deserialization strategy failed
    #[error("failed to load model from {} → {}", .path.display(), AttemptList(.attempts))]
    DeserializationExhausted { path: PathBuf, attempts: Vec<Attempt> },

    /// The deserialized object exposes no usable prediction capability
    #[error("unsupported model object: {0}")]
    UnsupportedModel(String),

    /// An ensemble without member estimators
    #[error("ensemble has no member models")]
    EmptyEnsemble,

    /// Ensemble weights sum to zero (or the weight map is empty)
    #[error("ensemble weights sum to zero: {0}")]
    ZeroWeightSum(String),

    /// Manifest could not be read or parsed
    #[error("manifest error: {0}")]
    ManifestParse(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new unsupported-model error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedModel(msg.into())
    }

    /// Create a new zero-weight-sum error
    pub fn zero_weight_sum(msg: impl Into<String>) -> Self {
        Self::ZeroWeightSum(msg.into())
    }

    /// Create a new manifest error
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::ManifestParse(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// One failed deserialization attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    /// Strategy name (`json`, `yaml`, `lexicon-table`, ...)
    pub strategy: String,

    /// Stage at which the strategy failed
    pub kind: AttemptKind,

    /// Underlying error message
    pub message: String,
}

impl Attempt {
    pub fn new(strategy: impl Into<String>, kind: AttemptKind, message: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.strategy, self.kind, self.message)
    }
}

/// Stage of a deserialization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    /// The artifact bytes could not be read
    Read,
    /// The bytes are not valid for the strategy's format
    Decode,
    /// The decoded object graph could not be turned into model objects
    Materialize,
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Decode => "decode",
            Self::Materialize => "materialize",
        };
        f.write_str(s)
    }
}

struct AttemptList<'a>(&'a [Attempt]);

impl fmt::Display for AttemptList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{attempt}")?;
        }
        Ok(())
    }
}
