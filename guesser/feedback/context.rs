//! The long-lived state a triage run works against: corpus, classifier, settings.

use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;

use guesser_corpus::{
    CorpusLoadError, CorpusStore, FeatureSignature, Keyword, Label, PersistenceError,
    SignatureBuilder, TfIdfError, UpsertOutcome,
};
use guesser_learning::{OnlineClassifier, Winnow, WinnowParams};

use crate::{
    collaborators::GuessOutcome,
    config::GuesserConfig,
    telemetry::{self, FeedbackTelemetry},
};

/// Engine settings fixed for the lifetime of a context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackSettings {
    /// Winnow hyperparameters.
    pub winnow: WinnowParams,
    /// Signature keyword counts.
    pub signature: SignatureBuilder,
    /// Judgments required corpus-wide before a guess is offered.
    pub min_training_examples: usize,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            winnow: WinnowParams::default(),
            signature: SignatureBuilder::default(),
            min_training_examples: 1,
        }
    }
}

/// Startup failures.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The persisted corpus is unreadable.
    #[error(transparent)]
    Load(#[from] CorpusLoadError),
    /// The configuration is unusable.
    #[error(transparent)]
    Settings(#[from] anyhow::Error),
}

/// A document after fetch and analysis, ready for judgment.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Document url.
    pub url: String,
    /// Number of tokens stored for the document.
    pub token_count: usize,
    /// Top document keywords, for display.
    pub keywords: Vec<Keyword>,
    /// Signature used for both guessing and training.
    pub signature: FeatureSignature,
}

/// What recording a judgment did.
#[derive(Debug)]
pub struct JudgmentRecord {
    /// The judgment.
    pub label: Label,
    /// Whether the classifier's weights changed.
    pub model_updated: bool,
    /// Outcome of the checkpoint write.
    pub persisted: Result<(), PersistenceError>,
}

/// Corpus store and classifier, constructed once per run.
///
/// `open` loads the corpus and replays its training log into a fresh classifier;
/// every judgment is a checkpoint; `close` writes a final checkpoint.
#[derive(Debug)]
pub struct FeedbackContext {
    store: CorpusStore,
    classifier: Winnow,
    settings: FeedbackSettings,
    telemetry: Option<FeedbackTelemetry>,
}

impl FeedbackContext {
    /// Builds a context around an already loaded store, replaying its training log.
    #[must_use]
    pub fn new(store: CorpusStore, settings: FeedbackSettings) -> Self {
        let mut classifier = Winnow::new(settings.winnow);
        classifier.train_batch(store.training_examples());
        Self {
            store,
            classifier,
            settings,
            telemetry: None,
        }
    }

    /// Loads the corpus named by `config` and rebuilds the classifier.
    pub async fn open(
        config: &GuesserConfig,
        telemetry: Option<FeedbackTelemetry>,
    ) -> Result<Self, ContextError> {
        let settings = config.feedback_settings()?;
        let store = match CorpusStore::open(&config.repository).await {
            Ok(store) => store,
            Err(err) => {
                telemetry::log(
                    telemetry.as_ref(),
                    LogLevel::Error,
                    "feedback.context.load_failed",
                    json!({ "error": err.to_string() }),
                );
                return Err(err.into());
            }
        };
        let context = Self::new(store, settings).with_telemetry_opt(telemetry);
        context.log(
            LogLevel::Info,
            "feedback.context.opened",
            json!({
                "documents": context.store.len(),
                "training_examples": context.store.training_count(),
                "weighted_terms": context.classifier.weights().len(),
            }),
        );
        Ok(context)
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(self, telemetry: FeedbackTelemetry) -> Self {
        self.with_telemetry_opt(Some(telemetry))
    }

    fn with_telemetry_opt(mut self, telemetry: Option<FeedbackTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Telemetry handle, if any.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&FeedbackTelemetry> {
        self.telemetry.as_ref()
    }

    /// The corpus.
    #[must_use]
    pub const fn store(&self) -> &CorpusStore {
        &self.store
    }

    /// The classifier.
    #[must_use]
    pub const fn classifier(&self) -> &Winnow {
        &self.classifier
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &FeedbackSettings {
        &self.settings
    }

    /// Stores `tokens` for `url` and computes its keywords and signature.
    pub fn analyze(&mut self, url: &str, tokens: Vec<String>) -> Result<Analysis, TfIdfError> {
        let token_count = tokens.len();
        let outcome = self.store.upsert_document(url, tokens);
        let tokens = self.store.document(url).unwrap_or_default();
        let keywords = self
            .store
            .keywords_for(tokens, Some(self.settings.signature.local()))?;
        let signature = self.settings.signature.build(&self.store, tokens)?;
        self.log(
            LogLevel::Info,
            "feedback.document.analyzed",
            json!({
                "url": url,
                "tokens": token_count,
                "replaced": outcome == UpsertOutcome::Replaced,
                "signature_terms": signature.len(),
            }),
        );
        Ok(Analysis {
            url: url.to_owned(),
            token_count,
            keywords,
            signature,
        })
    }

    /// Builds the signature `tokens` would have if stored, leaving the corpus untouched.
    pub fn preview(&self, url: &str, tokens: Vec<String>) -> Result<Analysis, TfIdfError> {
        let mut scratch = Self {
            store: self.store.detached_copy(),
            classifier: self.classifier.clone(),
            settings: self.settings,
            telemetry: None,
        };
        scratch.analyze(url, tokens)
    }

    /// Asks the classifier, unless too few judgments exist corpus-wide.
    #[must_use]
    pub fn guess(&self, signature: &FeatureSignature) -> GuessOutcome {
        let available = self.store.training_count();
        let required = self.settings.min_training_examples;
        let outcome = if available < required {
            GuessOutcome::InsufficientData {
                available,
                required,
            }
        } else {
            GuessOutcome::Predicted {
                label: self.classifier.predict(signature),
            }
        };
        self.log(
            LogLevel::Debug,
            "feedback.guess.computed",
            json!({
                "outcome": outcome,
                "score": self.classifier.score(signature),
            }),
        );
        outcome
    }

    /// Trains on an explicit judgment, logs it, and checkpoints the corpus.
    ///
    /// The in-memory update stands even when the write fails.
    pub async fn record_judgment(
        &mut self,
        signature: FeatureSignature,
        label: Label,
    ) -> JudgmentRecord {
        let model_updated = self.classifier.train_one(&signature, label);
        self.store.register_training_example(signature, label);
        let persisted = self.persist().await;
        self.log(
            LogLevel::Info,
            "feedback.judgment.recorded",
            json!({
                "label": label,
                "model_updated": model_updated,
                "training_examples": self.store.training_count(),
                "persisted": persisted.is_ok(),
            }),
        );
        JudgmentRecord {
            label,
            model_updated,
            persisted,
        }
    }

    /// Writes the corpus, logging failures.
    pub async fn persist(&self) -> Result<(), PersistenceError> {
        let result = self.store.persist().await;
        if let Err(err) = &result {
            self.log(
                LogLevel::Error,
                "feedback.persist.failed",
                json!({ "error": err.to_string() }),
            );
        }
        result
    }

    /// Final checkpoint at teardown.
    pub async fn close(self) -> Result<(), PersistenceError> {
        let result = self.persist().await;
        self.log(
            LogLevel::Info,
            "feedback.context.closed",
            json!({
                "documents": self.store.len(),
                "training_examples": self.store.training_count(),
                "persisted": result.is_ok(),
            }),
        );
        result
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        telemetry::log(self.telemetry.as_ref(), level, message, metadata);
    }
}
