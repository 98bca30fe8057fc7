use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Binary relevance judgment. Serialized as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    /// The user did not find the document interesting (`0`).
    NotInteresting,
    /// The user found the document interesting (`1`).
    Interesting,
}

impl Label {
    /// Numeric form used by the persisted training log.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::NotInteresting => 0,
            Self::Interesting => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.as_u8()
    }
}

/// Raised when a persisted label is neither `0` nor `1`.
#[derive(Debug, Error)]
#[error("label must be 0 or 1, got {0}")]
pub struct LabelError(pub u8);

impl TryFrom<u8> for Label {
    type Error = LabelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotInteresting),
            1 => Ok(Self::Interesting),
            other => Err(LabelError(other)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInteresting => f.write_str("not interesting"),
            Self::Interesting => f.write_str("interesting"),
        }
    }
}

/// Term ranked by its TF-IDF relevancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// The term.
    pub term: String,
    /// TF-IDF score of the term in its blob.
    pub relevancy: f64,
}

/// Signed per-term weights consumed by the classifier.
///
/// Iteration follows insertion order, so two signatures built from the same corpus
/// state serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSignature(IndexMap<String, f64>);

impl FeatureSignature {
    /// Creates an empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of `term`, if present.
    #[must_use]
    pub fn get(&self, term: &str) -> Option<f64> {
        self.0.get(term).copied()
    }

    /// Sets the weight of `term`, replacing any previous value.
    pub fn insert(&mut self, term: impl Into<String>, weight: f64) {
        self.0.insert(term.into(), weight);
    }

    /// Adds `delta` to the weight of `term`, inserting it when missing.
    pub fn accumulate(&mut self, term: &str, delta: f64) {
        if let Some(weight) = self.0.get_mut(term) {
            *weight += delta;
        } else {
            self.0.insert(term.to_owned(), delta);
        }
    }

    /// Iterates `(term, weight)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(term, weight)| (term.as_str(), *weight))
    }

    /// Terms carrying a strictly positive weight.
    pub fn positive_terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(term, _)| term)
    }

    /// Terms carrying a strictly negative weight.
    pub fn negative_terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(|(_, weight)| *weight < 0.0)
            .map(|(term, _)| term)
    }

    /// Number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no terms are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureSignature {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(term, weight)| (term.into(), weight))
                .collect(),
        )
    }
}

/// One explicit user judgment, as stored in the training log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Signature the user judged.
    pub input: FeatureSignature,
    /// The judgment.
    pub output: Label,
}

impl TrainingExample {
    /// Creates a training example.
    #[must_use]
    pub const fn new(input: FeatureSignature, output: Label) -> Self {
        Self { input, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_serializes_as_number() {
        let example = TrainingExample::new(
            [("rust", 0.4), ("python", -0.2)].into_iter().collect(),
            Label::Interesting,
        );
        let json = serde_json::to_string(&example).unwrap();
        assert_eq!(json, r#"{"input":{"rust":0.4,"python":-0.2},"output":1}"#);
        let back: TrainingExample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, example);
    }

    #[test]
    fn rejects_out_of_range_label() {
        let err = serde_json::from_str::<TrainingExample>(r#"{"input":{},"output":2}"#);
        assert!(err.is_err());
    }

    #[test]
    fn accumulate_adds_or_inserts() {
        let mut signature = FeatureSignature::new();
        signature.insert("dog", -0.5);
        signature.accumulate("dog", 0.75);
        signature.accumulate("fish", 0.1);
        assert_eq!(signature.get("dog"), Some(0.25));
        assert_eq!(signature.get("fish"), Some(0.1));
        assert_eq!(signature.positive_terms().count(), 2);
        assert_eq!(signature.negative_terms().count(), 0);
    }
}
