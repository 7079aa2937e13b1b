//! Normalizes deserialized models to one prediction contract
//!
//! Whatever the artifact held, the service only ever calls
//! [`PredictProba::predict_proba`]: one positive-class probability per input.
//! The capability is decided once here and fixed in [`ModelHandle`].

use crate::estimators::{ProbabilityEstimator, ScoreEstimator};
use crate::object::{EnsembleParts, Instance};
use reviewsense_core::{Error, Result};
use std::fmt;
use tracing::{debug, warn};

/// Positive-class probabilities, one per input, same order
pub trait PredictProba: Send + Sync {
    fn predict_proba(&self, texts: &[&str]) -> Vec<f64>;
}

/// Logistic function, stable for large magnitudes
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Clamp to [0, 1]; NaN maps to 0.5
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.5
    } else {
        p.clamp(0.0, 1.0)
    }
}

fn fit_len(mut values: Vec<f64>, expected: usize, source: &str) -> Vec<f64> {
    if values.len() != expected {
        warn!(
            model = source,
            expected,
            got = values.len(),
            "Model returned wrong number of predictions"
        );
        values.resize(expected, 0.5);
    }
    values
}

/// A model with its prediction capability fixed
pub enum ModelHandle {
    /// Native probabilities (two columns, or the single-column shorthand)
    Probability(Box<dyn ProbabilityEstimator>),

    /// Decision scores mapped through the logistic function
    Score(Box<dyn ScoreEstimator>),

    /// Weighted average of member probabilities
    Ensemble(WeightedEnsemble),
}

impl ModelHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Probability(_) => "probability",
            Self::Score(_) => "score",
            Self::Ensemble(_) => "ensemble",
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probability(est) => write!(f, "Probability({})", est.name()),
            Self::Score(est) => write!(f, "Score({})", est.name()),
            Self::Ensemble(ensemble) => f.debug_tuple("Ensemble").field(ensemble).finish(),
        }
    }
}

impl PredictProba for ModelHandle {
    fn predict_proba(&self, texts: &[&str]) -> Vec<f64> {
        let probs = match self {
            Self::Probability(est) => fit_len(
                est.predict_proba(texts).positive_column(),
                texts.len(),
                est.name(),
            ),
            Self::Score(est) => fit_len(
                est.decision_function(texts).into_iter().map(sigmoid).collect(),
                texts.len(),
                est.name(),
            ),
            Self::Ensemble(ensemble) => ensemble.predict_proba(texts),
        };

        probs.into_iter().map(clamp_probability).collect()
    }
}

#[derive(Debug)]
struct Member {
    name: String,
    handle: ModelHandle,
    weight: f64,
}

/// Soft-voting combination `Σ w·p / Σ w`
#[derive(Debug)]
pub struct WeightedEnsemble {
    members: Vec<Member>,
    /// Largest effective weight; weights are divided by it before use
    scale: f64,
    denominator: f64,
    low_confidence: bool,
}

impl WeightedEnsemble {
    /// Member names with their effective weights, in name order
    pub fn weights(&self) -> Vec<(&str, f64)> {
        self.members.iter().map(|m| (m.name.as_str(), m.weight)).collect()
    }

    /// Sum of the weights relative to the largest one
    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    /// Set when the weights summed to zero and 1.0 stands in as denominator
    pub fn is_low_confidence(&self) -> bool {
        self.low_confidence
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl PredictProba for WeightedEnsemble {
    fn predict_proba(&self, texts: &[&str]) -> Vec<f64> {
        let mut sums = vec![0.0; texts.len()];

        for member in self.members.iter().filter(|m| m.weight > 0.0) {
            let probs = member.handle.predict_proba(texts);
            for (sum, p) in sums.iter_mut().zip(probs) {
                *sum += member.weight / self.scale * p;
            }
        }

        sums.into_iter().map(|sum| sum / self.denominator).collect()
    }
}

/// An adapted model plus the configuration defects found while adapting it
#[derive(Debug)]
pub struct AdaptedModel {
    pub handle: ModelHandle,

    /// Non-fatal defects, e.g. a zero weight sum
    pub defects: Vec<Error>,
}

impl AdaptedModel {
    pub fn is_low_confidence(&self) -> bool {
        !self.defects.is_empty()
    }
}

/// Probe a deserialized instance for its prediction capability
pub fn adapt(instance: Instance) -> Result<AdaptedModel> {
    let mut defects = Vec::new();
    let handle = adapt_instance(instance, &mut defects)?;
    Ok(AdaptedModel { handle, defects })
}

fn adapt_instance(instance: Instance, defects: &mut Vec<Error>) -> Result<ModelHandle> {
    match instance {
        Instance::Probability(est) => Ok(ModelHandle::Probability(est)),
        Instance::Score(est) => Ok(ModelHandle::Score(est)),
        Instance::Ensemble(parts) => adapt_ensemble(parts, defects),
        Instance::Placeholder(placeholder) if EnsembleParts::is_ensemble_state(&placeholder.state) => {
            debug!(class = %placeholder.class, "Adapting restored placeholder as ensemble");
            let parts = EnsembleParts::from_state(&placeholder.class, placeholder.state)?;
            adapt_ensemble(parts, defects)
        }
        Instance::Placeholder(placeholder) => {
            let fields: Vec<&str> = placeholder.state.keys().map(String::as_str).collect();
            Err(Error::unsupported(format!(
                "{} has no prediction capability (state fields: [{}])",
                placeholder.class,
                fields.join(", ")
            )))
        }
    }
}

fn adapt_ensemble(parts: EnsembleParts, defects: &mut Vec<Error>) -> Result<ModelHandle> {
    let EnsembleParts { models, weights } = parts;
    if models.is_empty() {
        return Err(Error::EmptyEnsemble);
    }

    for name in weights.keys().filter(|name| !models.contains_key(*name)) {
        debug!(member = %name, "Ignoring weight for unknown ensemble member");
    }

    let mut members = Vec::with_capacity(models.len());

    for (name, instance) in models {
        let weight = match weights.get(&name) {
            None => {
                warn!(member = %name, "Ensemble member has no weight, using 0");
                0.0
            }
            Some(w) if w.is_finite() && *w >= 0.0 => *w,
            Some(w) => {
                warn!(member = %name, weight = *w, "Invalid ensemble weight, using 0");
                0.0
            }
        };

        let handle = adapt_instance(instance, defects)?;
        members.push(Member {
            name,
            handle,
            weight,
        });
    }

    // Relative weights are at most 1.0 each, so their sum cannot overflow
    let largest = members.iter().map(|m| m.weight).fold(0.0, f64::max);
    let scale = if largest > 0.0 { largest } else { 1.0 };
    let total: f64 = members.iter().map(|m| m.weight / scale).sum();

    let (denominator, low_confidence) = if total > 0.0 {
        (total, false)
    } else {
        let defect = Error::zero_weight_sum(format!(
            "{} members with effective weight sum {}",
            members.len(),
            total
        ));
        warn!(error = %defect, "Ensemble configuration defect, predictions are low confidence");
        defects.push(defect);
        (1.0, true)
    };

    Ok(ModelHandle::Ensemble(WeightedEnsemble {
        members,
        scale,
        denominator,
        low_confidence,
    }))
}
