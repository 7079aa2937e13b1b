//! Prediction and status types handed to the embedding web layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentiment label assigned to a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Positive,
    Negative,
}

impl Label {
    /// Decide the label for an adjusted probability.
    ///
    /// `Positive` iff `prob >= threshold`.
    pub fn from_probability(prob: f64, threshold: f64) -> Self {
        if prob >= threshold {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one review text
///
/// Serializes to the exact shape the web layer renders:
/// `{label, prob, prob_raw, threshold, degraded}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Label decided on the adjusted probability
    pub label: Label,

    /// Probability of the positive class after phrase adjustment (0.0-1.0)
    pub prob: f64,

    /// Probability of the positive class as produced by the predictor (0.0-1.0)
    pub prob_raw: f64,

    /// Threshold the label was decided with
    pub threshold: f64,

    /// True when the lexicon fallback produced the probability
    pub degraded: bool,
}

impl PredictionResult {
    /// Check whether the result is labeled positive
    pub fn is_positive(&self) -> bool {
        self.label == Label::Positive
    }
}

/// Operational state shown on the metrics page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    /// A trained model is serving
    #[serde(rename = "ready")]
    Ready,
    /// The lexicon fallback is serving
    #[serde(rename = "ready (fallback)")]
    ReadyFallback,
    /// A trained model is serving but its load recorded a configuration defect
    #[serde(rename = "error")]
    Error,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::ReadyFallback => "ready (fallback)",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the serving model came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Artifact path on disk
    pub path: String,

    /// Deserialization strategy that succeeded
    pub strategy: String,

    /// Hex-encoded SHA-256 of the artifact bytes
    pub sha256: String,
}

/// Status report for the operational metrics page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: StatusKind,

    /// Diagnostic explaining a fallback or a configuration defect
    pub error: Option<String>,

    /// Manifest as read from disk (`{}` when absent)
    pub manifest: serde_json::Value,

    /// Loaded artifact, if a trained model is serving
    pub artifact: Option<ArtifactInfo>,
}
