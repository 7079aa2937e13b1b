//! Inference service: load once, then classify
//!
//! The first call that needs a predictor runs the whole load (locate,
//! deserialize, adapt, read the manifest) inside a [`OnceLock`] initializer.
//! Exactly one thread performs it; concurrent callers block until it is done
//! and every later call reads the cached outcome without locking. A failed
//! load is an outcome too: the lexicon fallback is cached and the load is
//! never retried for the life of the service.

use crate::adapter::{adapt, clamp_probability, AdaptedModel, ModelHandle, PredictProba};
use crate::config::InferenceConfig;
use crate::deserializer::Deserializer;
use crate::fallback::LexiconFallback;
use crate::locator::ArtifactLocator;
use crate::policy::{load_policy, LoadedPolicy, Policy};
use reviewsense_core::{
    ArtifactInfo, Error, PredictionResult, Result, ServiceStatus, StatusKind,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Predictor bound after the load
#[derive(Debug)]
pub enum ActivePredictor {
    /// A trained model
    Model(ModelHandle),
    /// The lexicon fallback (degraded mode)
    Fallback(LexiconFallback),
}

impl ActivePredictor {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

impl PredictProba for ActivePredictor {
    fn predict_proba(&self, texts: &[&str]) -> Vec<f64> {
        match self {
            Self::Model(handle) => handle.predict_proba(texts),
            Self::Fallback(fallback) => fallback.predict_proba(texts),
        }
    }
}

/// Lifecycle of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Unloaded,
    Loading,
    Ready { degraded: bool },
}

#[derive(Debug)]
struct Loaded {
    predictor: ActivePredictor,
    policy: Policy,
    manifest: Value,
    status: StatusKind,
    diagnostic: Option<String>,
    artifact: Option<ArtifactInfo>,
}

impl Loaded {
    fn model(adapted: AdaptedModel, artifact: ArtifactInfo, policy: LoadedPolicy) -> Self {
        let (status, diagnostic) = if adapted.defects.is_empty() {
            (StatusKind::Ready, None)
        } else {
            let defects: Vec<String> = adapted.defects.iter().map(ToString::to_string).collect();
            (StatusKind::Error, Some(defects.join("; ")))
        };

        Self {
            predictor: ActivePredictor::Model(adapted.handle),
            policy: policy.policy,
            manifest: policy.manifest,
            status,
            diagnostic,
            artifact: Some(artifact),
        }
    }

    fn fallback(reason: &Error, policy: LoadedPolicy) -> Self {
        Self {
            predictor: ActivePredictor::Fallback(LexiconFallback::new()),
            policy: policy.policy,
            manifest: policy.manifest,
            status: StatusKind::ReadyFallback,
            diagnostic: Some(reason.to_string()),
            artifact: None,
        }
    }
}

/// Sentiment inference over a lazily loaded model
pub struct InferenceService {
    config: InferenceConfig,
    deserializer: Deserializer,
    loaded: OnceLock<Loaded>,
    loading: AtomicBool,
}

impl InferenceService {
    pub fn new(config: InferenceConfig) -> Self {
        let deserializer = Deserializer::from_config(&config);
        Self::with_deserializer(config, deserializer)
    }

    /// Default configuration rooted at `model_dir`
    pub fn from_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self::new(InferenceConfig::default().with_model_dir(model_dir))
    }

    pub fn with_deserializer(config: InferenceConfig, deserializer: Deserializer) -> Self {
        Self {
            config,
            deserializer,
            loaded: OnceLock::new(),
            loading: AtomicBool::new(false),
        }
    }

    /// An already-ready service around an injected predictor
    ///
    /// Nothing is read from disk; the manifest echo is `{}`.
    pub fn with_predictor(predictor: ActivePredictor, policy: Policy) -> Self {
        let (status, diagnostic) = match &predictor {
            ActivePredictor::Model(_) => (StatusKind::Ready, None),
            ActivePredictor::Fallback(_) => (
                StatusKind::ReadyFallback,
                Some("fallback predictor configured explicitly".to_string()),
            ),
        };

        let loaded = Loaded {
            predictor,
            policy,
            manifest: Value::Object(Map::new()),
            status,
            diagnostic,
            artifact: None,
        };

        Self {
            config: InferenceConfig::default(),
            deserializer: Deserializer::new(),
            loaded: OnceLock::from(loaded),
            loading: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn model_dir(&self) -> &Path {
        &self.config.model_dir
    }

    /// Run the load now instead of on the first request
    pub fn warm_up(&self) -> ServiceState {
        self.loaded();
        self.state()
    }

    /// Run the load on the blocking pool so the async executor keeps serving
    pub async fn warm_up_async(self: Arc<Self>) -> ServiceState {
        let service = Arc::clone(&self);
        match tokio::task::spawn_blocking(move || service.warm_up()).await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Model warm-up task failed");
                self.state()
            }
        }
    }

    pub fn state(&self) -> ServiceState {
        match self.loaded.get() {
            Some(loaded) => ServiceState::Ready {
                degraded: loaded.predictor.is_fallback(),
            },
            None if self.loading.load(Ordering::Acquire) => ServiceState::Loading,
            None => ServiceState::Unloaded,
        }
    }

    /// Whether the lexicon fallback is serving (triggers the load)
    pub fn is_degraded(&self) -> bool {
        self.loaded().predictor.is_fallback()
    }

    /// Policy in effect (triggers the load)
    pub fn policy(&self) -> &Policy {
        &self.loaded().policy
    }

    /// Classify one review text. Never fails.
    pub fn classify(&self, text: &str) -> PredictionResult {
        let loaded = self.loaded();
        let raw = match loaded.predictor.predict_proba(&[text]).first() {
            Some(p) => *p,
            None => {
                error!("Predictor returned no output, using neutral probability");
                0.5
            }
        };
        Self::finish(loaded, text, raw)
    }

    /// Classify several texts with a single predictor call
    pub fn classify_batch(&self, texts: &[&str]) -> Vec<PredictionResult> {
        let loaded = self.loaded();
        let mut raw = loaded.predictor.predict_proba(texts);
        raw.resize(texts.len(), 0.5);

        texts
            .iter()
            .zip(raw)
            .map(|(text, raw)| Self::finish(loaded, text, raw))
            .collect()
    }

    /// Status report for the operational metrics page (triggers the load)
    pub fn status(&self) -> ServiceStatus {
        let loaded = self.loaded();
        ServiceStatus {
            status: loaded.status,
            error: loaded.diagnostic.clone(),
            manifest: loaded.manifest.clone(),
            artifact: loaded.artifact.clone(),
        }
    }

    fn finish(loaded: &Loaded, text: &str, raw: f64) -> PredictionResult {
        let prob_raw = clamp_probability(raw);
        let prob = loaded.policy.adjust(text, prob_raw);
        let label = loaded.policy.decide(prob);
        let degraded = loaded.predictor.is_fallback();

        metrics::counter!(
            "reviewsense_predictions_total",
            "label" => label.as_str(),
            "degraded" => if degraded { "true" } else { "false" }
        )
        .increment(1);

        PredictionResult {
            label,
            prob,
            prob_raw,
            threshold: loaded.policy.threshold(),
            degraded,
        }
    }

    fn loaded(&self) -> &Loaded {
        self.loaded.get_or_init(|| self.load())
    }

    fn load(&self) -> Loaded {
        self.loading.store(true, Ordering::Release);

        let location = ArtifactLocator::from_config(&self.config).locate();
        let policy = load_policy(location.manifest.as_deref());

        let outcome = match &location.artifact {
            Some(path) => self.load_model(path),
            None => Err(Error::ArtifactNotFound {
                dir: self.config.model_dir.clone(),
            }),
        };

        let loaded = match outcome {
            Ok((adapted, artifact)) => {
                let loaded = Loaded::model(adapted, artifact, policy);
                match &loaded.diagnostic {
                    None => info!(status = %loaded.status, "Model loaded"),
                    Some(defect) => warn!(status = %loaded.status, defect = %defect, "Model loaded with configuration defects"),
                }
                loaded
            }
            Err(e) => {
                warn!(error = %e, "Model unavailable, serving with lexicon fallback");
                Loaded::fallback(&e, policy)
            }
        };

        let outcome = match loaded.status {
            StatusKind::Ready => "model",
            StatusKind::Error => "model_with_defects",
            StatusKind::ReadyFallback => "fallback",
        };
        metrics::counter!("reviewsense_model_loads_total", "outcome" => outcome).increment(1);

        self.loading.store(false, Ordering::Release);
        loaded
    }

    fn load_model(&self, path: &Path) -> Result<(AdaptedModel, ArtifactInfo)> {
        let deserialized = self.deserializer.deserialize(path)?;
        let artifact = ArtifactInfo {
            path: deserialized.path.display().to_string(),
            strategy: deserialized.strategy.to_string(),
            sha256: deserialized.sha256,
        };

        let adapted = adapt(deserialized.instance)?;
        info!(
            path = %artifact.path,
            kind = adapted.handle.kind(),
            "Adapted model"
        );
        Ok((adapted, artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewsense_core::Label;
    use serde_json::json;
    use std::fs;

    fn fallback_service() -> InferenceService {
        InferenceService::with_predictor(
            ActivePredictor::Fallback(LexiconFallback::new()),
            Policy::default(),
        )
    }

    #[test]
    fn test_empty_text_on_fallback() {
        let service = fallback_service();
        let result = service.classify("");

        assert_eq!(result.prob_raw, 0.5);
        assert_eq!(result.prob, 0.5);
        assert_eq!(result.threshold, 0.6);
        assert_eq!(result.label, Label::Negative);
        assert!(result.degraded);
    }

    #[test]
    fn test_state_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let service = InferenceService::from_model_dir(dir.path());

        assert_eq!(service.state(), ServiceState::Unloaded);
        assert_eq!(service.warm_up(), ServiceState::Ready { degraded: true });
    }

    #[test]
    fn test_missing_artifact_status() {
        let dir = tempfile::tempdir().unwrap();
        let service = InferenceService::from_model_dir(dir.path());

        let status = service.status();
        assert_eq!(status.status, StatusKind::ReadyFallback);
        assert!(status.error.unwrap().contains("no model artifact found"));
        assert_eq!(status.manifest, json!({}));
        assert!(status.artifact.is_none());
    }

    #[test]
    fn test_zero_weight_ensemble_reports_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = json!({
            "__class__": "reviewsense.ensemble.SoftVoting",
            "__state__": {
                "models": {
                    "lr": {
                        "__class__": "reviewsense.linear.LogisticText",
                        "__state__": { "weights": { "great": 2.0 } }
                    }
                },
                "weights": {}
            }
        });
        fs::write(dir.path().join("ensemble_soft.json"), artifact.to_string()).unwrap();

        let service = InferenceService::from_model_dir(dir.path());
        let status = service.status();

        assert_eq!(status.status, StatusKind::Error);
        assert!(status.error.unwrap().contains("sum to zero"));
        assert!(!service.is_degraded());
        assert_eq!(status.artifact.unwrap().strategy, "json");
    }

    #[test]
    fn test_batch_matches_single() {
        let service = fallback_service();
        let texts = ["love it", "awful, returned it", ""];

        let batch = service.classify_batch(&texts);
        let single: Vec<_> = texts.iter().map(|t| service.classify(t)).collect();
        assert_eq!(batch, single);
    }
}
