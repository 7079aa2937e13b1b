//! reviewsense Inference
//!
//! Model loading and sentiment inference for review pre-labeling.
//!
//! The layer locates a serialized ensemble in a model directory, deserializes
//! it even when the artifact names classes that only existed in the training
//! process, normalizes it to a single `predict_proba` contract and applies a
//! manifest-driven decision policy. When no usable model is available it
//! serves a deterministic lexicon predictor instead and says so in every
//! result (`degraded = true`).
//!
//! ```no_run
//! use reviewsense_inference::InferenceService;
//!
//! let service = InferenceService::from_model_dir("./model");
//! let result = service.classify("Great fit, would recommend");
//! println!("{} ({:.2})", result.label, result.prob);
//! ```

pub mod adapter;
pub mod config;
pub mod deserializer;
pub mod estimators;
pub mod fallback;
pub mod lexicon;
pub mod locator;
pub mod object;
pub mod policy;
pub mod registry;
pub mod service;

pub use adapter::{adapt, AdaptedModel, ModelHandle, PredictProba, WeightedEnsemble};
pub use config::{ArtifactNames, InferenceConfig, StrategyKind};
pub use deserializer::{
    DecodeStrategy, Deserialized, Deserializer, JsonStrategy, LexiconTableStrategy, YamlStrategy,
};
pub use estimators::{BagOfWords, ProbaOutput, ProbabilityEstimator, ScoreEstimator};
pub use fallback::LexiconFallback;
pub use locator::{locate, ArtifactLocation, ArtifactLocator};
pub use object::{ClassPath, EnsembleParts, Instance, Placeholder};
pub use policy::{load_policy, LoadedPolicy, Manifest, Policy};
pub use registry::{LegacyTypeRegistry, TypeRegistry};
pub use service::{ActivePredictor, InferenceService, ServiceState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::PredictProba;
    pub use crate::config::InferenceConfig;
    pub use crate::service::{ActivePredictor, InferenceService, ServiceState};
    pub use reviewsense_core::prelude::*;
}
