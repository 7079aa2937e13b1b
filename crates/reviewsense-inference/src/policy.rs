//! Manifest-driven decision policy
//!
//! The manifest is an optional JSON file written by the training pipeline:
//!
//! ```json
//! {
//!   "threshold": 0.6,
//!   "post_prob_heuristic": true,
//!   "heuristic_delta": 0.05,
//!   "neg_phrases": ["not worth", "fell apart"]
//! }
//! ```
//!
//! Every field is optional and read independently; a malformed field keeps its
//! default without affecting the others.

use crate::adapter::clamp_probability;
use crate::lexicon::CueMatcher;
use reviewsense_core::{Error, Label, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default decision threshold
pub const DEFAULT_THRESHOLD: f64 = 0.60;

/// Default probability reduction per matched negative phrase
pub const DEFAULT_HEURISTIC_DELTA: f64 = 0.05;

/// Negative phrases used when the manifest supplies none
pub const DEFAULT_NEG_PHRASES: &[&str] = &[
    "not worth",
    "waste of money",
    "poor quality",
    "cheaply made",
    "fell apart",
    "returned it",
    "not recommend",
    "not happy",
    "not good",
    "too small",
    "too big",
    "runs small",
];

/// Manifest fields as found on disk, before defaults are applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub threshold: Option<f64>,
    pub post_prob_heuristic: Option<bool>,
    pub heuristic_delta: Option<f64>,
    pub neg_phrases: Option<Vec<String>>,
}

impl Manifest {
    /// Read fields leniently; malformed fields are logged and left unset
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::manifest("manifest root must be an object"))?;

        Ok(Self {
            threshold: number_field(map, "threshold"),
            post_prob_heuristic: match map.get("post_prob_heuristic") {
                None | Some(Value::Null) => None,
                Some(Value::Bool(b)) => Some(*b),
                Some(other) => {
                    warn!(field = "post_prob_heuristic", value = %other, "Ignoring malformed manifest field");
                    None
                }
            },
            heuristic_delta: number_field(map, "heuristic_delta"),
            neg_phrases: match map.get("neg_phrases") {
                None | Some(Value::Null) => None,
                Some(Value::Array(items)) => {
                    let phrases: Option<Vec<String>> =
                        items.iter().map(|v| v.as_str().map(str::to_string)).collect();
                    if phrases.is_none() {
                        warn!(field = "neg_phrases", "Ignoring phrase list with non-string entries");
                    }
                    phrases
                }
                Some(other) => {
                    warn!(field = "neg_phrases", value = %other, "Ignoring malformed manifest field");
                    None
                }
            },
        })
    }

    /// Parse manifest bytes (JSON)
    pub fn parse(bytes: &[u8]) -> Result<(Self, Value)> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| Error::manifest(e.to_string()))?;
        let manifest = Self::from_value(&value)?;
        Ok((manifest, value))
    }
}

fn number_field(map: &Map<String, Value>, field: &str) -> Option<f64> {
    match map.get(field) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let number = value.as_f64();
            if number.is_none() {
                warn!(field, value = %value, "Ignoring malformed manifest field");
            }
            number
        }
    }
}

/// Threshold, phrase adjustment and labeling
#[derive(Debug, Clone)]
pub struct Policy {
    threshold: f64,
    heuristic_delta: f64,
    heuristic_enabled: bool,
    neg_phrases: CueMatcher,
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_manifest(&Manifest::default())
    }
}

impl Policy {
    /// Apply defaults and bounds to manifest fields
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let threshold = match manifest.threshold {
            Some(t) if !t.is_nan() => t.clamp(0.0, 1.0),
            _ => DEFAULT_THRESHOLD,
        };

        let heuristic_delta = match manifest.heuristic_delta {
            Some(d) if d.is_finite() => d.clamp(0.0, 1.0),
            Some(d) => {
                warn!(heuristic_delta = d, "Non-finite heuristic delta, using default");
                DEFAULT_HEURISTIC_DELTA
            }
            None => DEFAULT_HEURISTIC_DELTA,
        };

        let heuristic_enabled = manifest.post_prob_heuristic.unwrap_or(true);

        let configured = manifest
            .neg_phrases
            .as_ref()
            .filter(|_| heuristic_enabled)
            .map(CueMatcher::new)
            .filter(|matcher| !matcher.is_empty());

        let neg_phrases = configured.unwrap_or_else(|| CueMatcher::new(DEFAULT_NEG_PHRASES));

        Self {
            threshold,
            heuristic_delta,
            heuristic_enabled,
            neg_phrases,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn heuristic_delta(&self) -> f64 {
        self.heuristic_delta
    }

    pub fn heuristic_enabled(&self) -> bool {
        self.heuristic_enabled
    }

    pub fn neg_phrases(&self) -> &[String] {
        self.neg_phrases.patterns()
    }

    /// Subtract `delta` per distinct negative phrase found, then clamp
    pub fn adjust(&self, text: &str, raw: f64) -> f64 {
        if !self.heuristic_enabled {
            return clamp_probability(raw);
        }

        let hits = self.neg_phrases.distinct_hits(text);
        clamp_probability(raw - hits as f64 * self.heuristic_delta)
    }

    pub fn decide(&self, adjusted: f64) -> Label {
        Label::from_probability(adjusted, self.threshold)
    }
}

/// Policy plus the manifest it was built from
#[derive(Debug, Clone)]
pub struct LoadedPolicy {
    pub policy: Policy,

    /// Manifest as parsed, `{}` when absent or unreadable
    pub manifest: Value,
}

impl Default for LoadedPolicy {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            manifest: Value::Object(Map::new()),
        }
    }
}

/// Load the policy from an optional manifest path. Never fails.
pub fn load_policy(manifest_path: Option<&Path>) -> LoadedPolicy {
    let Some(path) = manifest_path else {
        debug!("No manifest found, using default policy");
        return LoadedPolicy::default();
    };

    let parsed = fs::read(path)
        .map_err(|e| Error::manifest(format!("{}: {}", path.display(), e)))
        .and_then(|bytes| Manifest::parse(&bytes));

    match parsed {
        Ok((manifest, value)) => {
            let policy = Policy::from_manifest(&manifest);
            info!(
                path = %path.display(),
                threshold = policy.threshold(),
                heuristic = policy.heuristic_enabled(),
                phrases = policy.neg_phrases().len(),
                "Loaded manifest"
            );
            LoadedPolicy {
                policy,
                manifest: value,
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unusable manifest, using default policy");
            LoadedPolicy::default()
        }
    }
}
