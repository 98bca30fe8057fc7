use indexmap::IndexMap;
use thiserror::Error;

use guesser_corpus::{FeatureSignature, Label};

use crate::classifier::OnlineClassifier;

/// Weight of a term the model has never updated.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Rejected Winnow hyperparameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WinnowConfigError {
    /// Promotion must be greater than one.
    #[error("promotion factor must be > 1, got {0}")]
    Promotion(f64),
    /// Demotion must lie strictly between zero and one.
    #[error("demotion factor must be in (0, 1), got {0}")]
    Demotion(f64),
    /// The threshold must be a finite number.
    #[error("threshold must be finite, got {0}")]
    Threshold(f64),
}

/// Fixed Winnow hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinnowParams {
    promotion: f64,
    demotion: f64,
    threshold: f64,
}

impl Default for WinnowParams {
    fn default() -> Self {
        Self {
            promotion: 1.5,
            demotion: 0.5,
            threshold: 1.0,
        }
    }
}

impl WinnowParams {
    /// Validates and creates a parameter set.
    pub fn new(promotion: f64, demotion: f64, threshold: f64) -> Result<Self, WinnowConfigError> {
        if !(promotion.is_finite() && promotion > 1.0) {
            return Err(WinnowConfigError::Promotion(promotion));
        }
        if !(demotion > 0.0 && demotion < 1.0) {
            return Err(WinnowConfigError::Demotion(demotion));
        }
        if !threshold.is_finite() {
            return Err(WinnowConfigError::Threshold(threshold));
        }
        Ok(Self {
            promotion,
            demotion,
            threshold,
        })
    }

    /// Multiplier applied to weights that should grow (alpha).
    #[must_use]
    pub const fn promotion(&self) -> f64 {
        self.promotion
    }

    /// Multiplier applied to weights that should shrink (beta).
    #[must_use]
    pub const fn demotion(&self) -> f64 {
        self.demotion
    }

    /// Score above which the prediction is `Interesting` (theta).
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Winnow classifier with signed features.
///
/// Positive signature terms vote with their weight, negative terms vote against with
/// theirs, zero-valued terms abstain. On a mistake the voting terms are promoted or
/// demoted so the vote moves towards the true label.
#[derive(Debug, Clone, PartialEq)]
pub struct Winnow {
    params: WinnowParams,
    weights: IndexMap<String, f64>,
}

impl Default for Winnow {
    fn default() -> Self {
        Self::new(WinnowParams::default())
    }
}

impl Winnow {
    /// Creates an untrained classifier.
    #[must_use]
    pub fn new(params: WinnowParams) -> Self {
        Self {
            params,
            weights: IndexMap::new(),
        }
    }

    /// Hyperparameters in use.
    #[must_use]
    pub const fn params(&self) -> WinnowParams {
        self.params
    }

    /// Current weight of `term`.
    #[must_use]
    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Terms whose weight has been updated at least once, in first-update order.
    #[must_use]
    pub const fn weights(&self) -> &IndexMap<String, f64> {
        &self.weights
    }

    /// Signed vote of `signature`: positive-term weights minus negative-term weights.
    #[must_use]
    pub fn score(&self, signature: &FeatureSignature) -> f64 {
        let support: f64 = signature.positive_terms().map(|t| self.weight(t)).sum();
        let opposition: f64 = signature.negative_terms().map(|t| self.weight(t)).sum();
        support - opposition
    }

    fn scale(&mut self, term: &str, factor: f64) {
        let weight = self
            .weights
            .entry(term.to_owned())
            .or_insert(DEFAULT_WEIGHT);
        *weight *= factor;
    }
}

impl OnlineClassifier for Winnow {
    fn predict(&self, signature: &FeatureSignature) -> Label {
        if self.score(signature) > self.params.threshold {
            Label::Interesting
        } else {
            Label::NotInteresting
        }
    }

    fn train_one(&mut self, signature: &FeatureSignature, label: Label) -> bool {
        if self.predict(signature) == label {
            return false;
        }
        let (positive, negative) = match label {
            Label::Interesting => (self.params.promotion, self.params.demotion),
            Label::NotInteresting => (self.params.demotion, self.params.promotion),
        };
        for (term, value) in signature.iter() {
            if value > 0.0 {
                self.scale(term, positive);
            } else if value < 0.0 {
                self.scale(term, negative);
            }
        }
        true
    }
}
