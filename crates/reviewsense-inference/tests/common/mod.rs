//! Shared fixtures for integration tests
//!
//! Stub estimators with fixed outputs and helpers that write model
//! directories the way the training pipeline lays them out.

#![allow(dead_code)]

use reviewsense_core::Result;
use reviewsense_inference::{
    DecodeStrategy, JsonStrategy, ProbaOutput, ProbabilityEstimator, ScoreEstimator,
};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Probability estimator returning the same positive probability for every input
pub struct ConstantProbability(pub f64);

impl ProbabilityEstimator for ConstantProbability {
    fn name(&self) -> &str {
        "stub.ConstantProbability"
    }

    fn predict_proba(&self, texts: &[&str]) -> ProbaOutput {
        ProbaOutput::TwoClass(texts.iter().map(|_| [1.0 - self.0, self.0]).collect())
    }
}

/// Score estimator returning the same decision score for every input
pub struct ConstantScore(pub f64);

impl ScoreEstimator for ConstantScore {
    fn name(&self) -> &str {
        "stub.ConstantScore"
    }

    fn decision_function(&self, texts: &[&str]) -> Vec<f64> {
        vec![self.0; texts.len()]
    }
}

/// JSON strategy that counts how often it is asked to decode
pub struct CountingStrategy {
    pub calls: Arc<AtomicUsize>,
}

impl CountingStrategy {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl DecodeStrategy for CountingStrategy {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        JsonStrategy.decode(bytes)
    }
}

/// Logistic member with a handful of sentiment weights
pub fn logistic_member(bias: f64) -> Value {
    json!({
        "__class__": "reviewsense.linear.LogisticText",
        "__state__": {
            "features": { "lowercase": true, "ngram_max": 2 },
            "weights": {
                "love": 2.0,
                "great": 1.5,
                "perfect": 1.5,
                "terrible": -2.5,
                "broke": -2.0,
                "not worth": -1.5
            },
            "intercept": bias
        }
    })
}

/// Naive Bayes member with a small vocabulary
pub fn naive_bayes_member() -> Value {
    json!({
        "__class__": "reviewsense.bayes.NaiveBayesText",
        "__state__": {
            "class_log_prior": [-0.693147, -0.693147],
            "feature_log_prob": {
                "love": [-4.0, -2.0],
                "great": [-3.5, -2.2],
                "terrible": [-2.0, -4.5],
                "broke": [-2.1, -4.0]
            }
        }
    })
}

/// Ensemble as exported by the notebook flow, under a training-time class
pub fn legacy_bundle() -> Value {
    json!({
        "__class__": "__main__.EnsembleBundle",
        "__args__": [],
        "__state__": {
            "models": {
                "lr": logistic_member(0.0),
                "nb": naive_bayes_member()
            },
            "weights": { "lr": 2.0, "nb": 1.0 }
        }
    })
}

/// Ensemble as exported by the current pipeline
pub fn soft_voting() -> Value {
    json!({
        "__class__": "reviewsense.ensemble.SoftVoting",
        "__state__": {
            "models": {
                "lr": logistic_member(0.25),
                "nb": naive_bayes_member()
            },
            "weights": { "lr": 1.0, "nb": 1.0 }
        }
    })
}

pub fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn write_text(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}
