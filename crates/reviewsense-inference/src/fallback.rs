//! Lexicon fallback predictor
//!
//! Serves whenever no trained model could be loaded. It counts how many
//! positive and negative cue words appear in the text and smooths the counts
//! with add-one smoothing, so the output is always strictly inside (0, 1).

use crate::adapter::PredictProba;
use crate::lexicon::CueMatcher;

/// Positive cue words
pub const POSITIVE_CUES: &[&str] = &[
    "love",
    "great",
    "amazing",
    "perfect",
    "good",
    "excellent",
    "nice",
    "recommend",
    "best",
    "beautiful",
    "happy",
];

/// Negative cue words
pub const NEGATIVE_CUES: &[&str] = &[
    "bad",
    "worst",
    "poor",
    "terrible",
    "hate",
    "awful",
    "disappoint",
    "return",
    "ugly",
    "broken",
    "sad",
    "tight",
];

/// Deterministic cue-counting predictor
#[derive(Debug, Clone)]
pub struct LexiconFallback {
    positive: CueMatcher,
    negative: CueMatcher,
}

impl LexiconFallback {
    pub fn new() -> Self {
        Self::with_cues(POSITIVE_CUES, NEGATIVE_CUES)
    }

    pub fn with_cues(positive: &[&str], negative: &[&str]) -> Self {
        Self {
            positive: CueMatcher::new(positive),
            negative: CueMatcher::new(negative),
        }
    }

    /// `(pos + 1) / (pos + neg + 2)`
    pub fn probability(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let pos = self.positive.distinct_hits_lowered(&lowered) as f64;
        let neg = self.negative.distinct_hits_lowered(&lowered) as f64;
        (pos + 1.0) / (pos + neg + 2.0)
    }
}

impl Default for LexiconFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictProba for LexiconFallback {
    fn predict_proba(&self, texts: &[&str]) -> Vec<f64> {
        texts.iter().map(|text| self.probability(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laplace_smoothing() {
        let fallback = LexiconFallback::new();
        assert_eq!(fallback.probability("great product, love it"), 0.75);
        assert_eq!(fallback.probability("arrived on tuesday"), 0.5);
        assert_eq!(fallback.probability(""), 0.5);
    }

    #[test]
    fn test_negative_cues() {
        let fallback = LexiconFallback::new();
        // bad + awful + return(ed)
        assert_eq!(fallback.probability("Bad fit, awful seams, returned"), 0.2);
    }

    #[test]
    fn test_repeated_cue_counts_once() {
        let fallback = LexiconFallback::new();
        assert_eq!(
            fallback.probability("good good good"),
            fallback.probability("good")
        );
    }

    #[test]
    fn test_output_strictly_inside_unit_interval() {
        let fallback = LexiconFallback::new();
        let all_positive = POSITIVE_CUES.join(" ");
        let all_negative = NEGATIVE_CUES.join(" ");

        for p in fallback.predict_proba(&[&all_positive, &all_negative]) {
            assert!(p > 0.0 && p < 1.0);
        }
    }
}
