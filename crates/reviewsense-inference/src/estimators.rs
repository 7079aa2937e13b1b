//! Estimator capabilities and the built-in text estimators
//!
//! The training pipeline exports three estimator types plus a soft-voting
//! ensemble. All of them featurize text the same way (see [`BagOfWords`]).

use crate::adapter::sigmoid;
use crate::object::{state_into_value, ClassPath, EnsembleParts, Instance, State};
use regex::Regex;
use reviewsense_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Class name of [`LogisticText`]
pub const LOGISTIC_TEXT: &str = "reviewsense.linear.LogisticText";

/// Class name of [`LinearScore`]
pub const LINEAR_SCORE: &str = "reviewsense.linear.LinearScore";

/// Class name of [`NaiveBayesText`]
pub const NAIVE_BAYES_TEXT: &str = "reviewsense.bayes.NaiveBayesText";

/// Class name of the built-in soft-voting ensemble
pub const SOFT_VOTING: &str = "reviewsense.ensemble.SoftVoting";

/// Native probability output of an estimator
#[derive(Debug, Clone, PartialEq)]
pub enum ProbaOutput {
    /// One column: probability of the positive class only
    Positive(Vec<f64>),
    /// Two columns: `[negative, positive]` per input
    TwoClass(Vec<[f64; 2]>),
}

impl ProbaOutput {
    /// Expand to explicit two-column form
    pub fn into_two_class(self) -> Vec<[f64; 2]> {
        match self {
            Self::Positive(probs) => probs.into_iter().map(|p| [1.0 - p, p]).collect(),
            Self::TwoClass(rows) => rows,
        }
    }

    /// Probability of the positive class per input
    pub fn positive_column(self) -> Vec<f64> {
        self.into_two_class().into_iter().map(|row| row[1]).collect()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positive(probs) => probs.len(),
            Self::TwoClass(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An estimator that outputs class probabilities
pub trait ProbabilityEstimator: Send + Sync {
    /// Estimator name (class path for built-ins)
    fn name(&self) -> &str;

    /// One output row per input text, same order
    fn predict_proba(&self, texts: &[&str]) -> ProbaOutput;
}

/// An estimator that outputs only an unbounded decision score
pub trait ScoreEstimator: Send + Sync {
    /// Estimator name (class path for built-ins)
    fn name(&self) -> &str;

    /// One score per input text, same order; positive means positive class
    fn decision_function(&self, texts: &[&str]) -> Vec<f64>;
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"))
}

/// Bag-of-words featurizer shared by the built-in estimators
///
/// Tokens are runs of two or more word characters. Terms are the tokens plus
/// space-joined n-grams up to `ngram_max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagOfWords {
    #[serde(default = "default_true")]
    pub lowercase: bool,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    /// Count each distinct term once per text
    #[serde(default)]
    pub binary: bool,
}

fn default_true() -> bool {
    true
}

fn default_ngram_max() -> usize {
    1
}

const MAX_NGRAM: usize = 5;

impl Default for BagOfWords {
    fn default() -> Self {
        Self {
            lowercase: true,
            ngram_max: default_ngram_max(),
            binary: false,
        }
    }
}

impl BagOfWords {
    /// Visit every term of `text` in text order (n-grams after unigrams)
    pub fn for_each_term(&self, text: &str, mut visit: impl FnMut(&str)) {
        let normalized;
        let text = if self.lowercase {
            normalized = text.to_lowercase();
            normalized.as_str()
        } else {
            text
        };

        let tokens: Vec<&str> = token_pattern().find_iter(text).map(|m| m.as_str()).collect();
        let ngram_max = self.ngram_max.clamp(1, MAX_NGRAM);
        let mut seen = HashSet::new();

        for n in 1..=ngram_max {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if self.binary && !seen.insert(term.clone()) {
                    continue;
                }
                visit(&term);
            }
        }
    }
}

/// Build an [`Instance`] from restored state
pub(crate) trait FromState {
    fn from_state(class: &ClassPath, state: State) -> Result<Instance>;
}

#[derive(Debug, Deserialize)]
struct LinearState {
    #[serde(default)]
    features: BagOfWords,
    weights: HashMap<String, f64>,
    #[serde(default)]
    intercept: f64,
}

/// Shared linear scoring: `intercept + Σ weight(term)` over all terms
#[derive(Debug, Clone)]
struct LinearModel {
    features: BagOfWords,
    weights: HashMap<String, f64>,
    intercept: f64,
}

impl LinearModel {
    fn from_state(class: &ClassPath, state: State) -> Result<Self> {
        let LinearState {
            features,
            weights,
            intercept,
        } = serde_json::from_value(state_into_value(class, state)?)?;

        Ok(Self {
            features,
            weights,
            intercept,
        })
    }

    fn score(&self, text: &str) -> f64 {
        let mut score = self.intercept;
        self.features.for_each_term(text, |term| {
            if let Some(weight) = self.weights.get(term) {
                score += weight;
            }
        });
        score
    }
}

/// Logistic regression over bag-of-words terms (two-column probabilities)
#[derive(Debug, Clone)]
pub struct LogisticText {
    model: LinearModel,
}

impl LogisticText {
    pub fn new(features: BagOfWords, weights: HashMap<String, f64>, intercept: f64) -> Self {
        Self {
            model: LinearModel {
                features,
                weights,
                intercept,
            },
        }
    }
}

impl ProbabilityEstimator for LogisticText {
    fn name(&self) -> &str {
        LOGISTIC_TEXT
    }

    fn predict_proba(&self, texts: &[&str]) -> ProbaOutput {
        ProbaOutput::TwoClass(
            texts
                .iter()
                .map(|text| {
                    let p = sigmoid(self.model.score(text));
                    [1.0 - p, p]
                })
                .collect(),
        )
    }
}

impl FromState for LogisticText {
    fn from_state(class: &ClassPath, state: State) -> Result<Instance> {
        let model = LinearModel::from_state(class, state)?;
        Ok(Instance::Probability(Box::new(Self { model })))
    }
}

/// Linear decision function over bag-of-words terms (score only)
#[derive(Debug, Clone)]
pub struct LinearScore {
    model: LinearModel,
}

impl LinearScore {
    pub fn new(features: BagOfWords, weights: HashMap<String, f64>, intercept: f64) -> Self {
        Self {
            model: LinearModel {
                features,
                weights,
                intercept,
            },
        }
    }
}

impl ScoreEstimator for LinearScore {
    fn name(&self) -> &str {
        LINEAR_SCORE
    }

    fn decision_function(&self, texts: &[&str]) -> Vec<f64> {
        texts.iter().map(|text| self.model.score(text)).collect()
    }
}

impl FromState for LinearScore {
    fn from_state(class: &ClassPath, state: State) -> Result<Instance> {
        let model = LinearModel::from_state(class, state)?;
        Ok(Instance::Score(Box::new(Self { model })))
    }
}

#[derive(Debug, Deserialize)]
struct NaiveBayesState {
    #[serde(default)]
    features: BagOfWords,
    /// `[negative, positive]`
    class_log_prior: [f64; 2],
    feature_log_prob: HashMap<String, [f64; 2]>,
    /// Log likelihood for terms missing from the vocabulary; skipped when absent
    #[serde(default)]
    unknown_log_prob: Option<[f64; 2]>,
}

/// Multinomial naive Bayes over bag-of-words terms (single-column probabilities)
#[derive(Debug, Clone)]
pub struct NaiveBayesText {
    features: BagOfWords,
    class_log_prior: [f64; 2],
    feature_log_prob: HashMap<String, [f64; 2]>,
    unknown_log_prob: Option<[f64; 2]>,
}

impl NaiveBayesText {
    fn positive_probability(&self, text: &str) -> f64 {
        let mut joint = self.class_log_prior;
        self.features.for_each_term(text, |term| {
            let log_prob = self
                .feature_log_prob
                .get(term)
                .copied()
                .or(self.unknown_log_prob);
            if let Some([neg, pos]) = log_prob {
                joint[0] += neg;
                joint[1] += pos;
            }
        });
        sigmoid(joint[1] - joint[0])
    }
}

impl ProbabilityEstimator for NaiveBayesText {
    fn name(&self) -> &str {
        NAIVE_BAYES_TEXT
    }

    fn predict_proba(&self, texts: &[&str]) -> ProbaOutput {
        ProbaOutput::Positive(texts.iter().map(|t| self.positive_probability(t)).collect())
    }
}

impl FromState for NaiveBayesText {
    fn from_state(class: &ClassPath, state: State) -> Result<Instance> {
        let NaiveBayesState {
            features,
            class_log_prior,
            feature_log_prob,
            unknown_log_prob,
        } = serde_json::from_value(state_into_value(class, state)?)?;

        Ok(Instance::Probability(Box::new(Self {
            features,
            class_log_prior,
            feature_log_prob,
            unknown_log_prob,
        })))
    }
}

/// Soft-voting ensemble as exported by the current training pipeline
pub struct SoftVoting;

impl FromState for SoftVoting {
    fn from_state(class: &ClassPath, state: State) -> Result<Instance> {
        EnsembleParts::from_state(class, state).map(Instance::Ensemble)
    }
}
