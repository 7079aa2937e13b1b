//! Substring cue matching shared by the fallback predictor and the phrase policy

use aho_corasick::AhoCorasick;
use std::collections::HashSet;
use tracing::warn;

/// A set of lowercase cues matched as plain substrings
///
/// Matching is deliberately not word-bounded: `bad` matches inside `badge`.
/// A cue counts once per text no matter how often it occurs.
#[derive(Debug, Clone)]
pub struct CueMatcher {
    patterns: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl CueMatcher {
    /// Build from cues; they are lowercased, trimmed and deduplicated
    pub fn new<I, S>(cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let patterns: Vec<String> = cues
            .into_iter()
            .map(|cue| cue.as_ref().trim().to_lowercase())
            .filter(|cue| !cue.is_empty() && seen.insert(cue.clone()))
            .collect();

        let automaton = if patterns.is_empty() {
            None
        } else {
            match AhoCorasick::new(&patterns) {
                Ok(automaton) => Some(automaton),
                Err(e) => {
                    warn!("Failed to build cue matcher, using linear scan: {}", e);
                    None
                }
            }
        };

        Self { patterns, automaton }
    }

    /// Cues in insertion order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of distinct cues occurring in `text` (lowercased first)
    pub fn distinct_hits(&self, text: &str) -> usize {
        self.distinct_hits_lowered(&text.to_lowercase())
    }

    /// Same as [`distinct_hits`](Self::distinct_hits) for already lowercased text
    pub fn distinct_hits_lowered(&self, lowered: &str) -> usize {
        match &self.automaton {
            Some(automaton) => {
                let mut hit = vec![false; self.patterns.len()];
                for m in automaton.find_overlapping_iter(lowered) {
                    hit[m.pattern().as_usize()] = true;
                }
                hit.into_iter().filter(|h| *h).count()
            }
            None => self
                .patterns
                .iter()
                .filter(|cue| lowered.contains(cue.as_str()))
                .count(),
        }
    }
}
