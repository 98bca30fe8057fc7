#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Corpus storage and term statistics for the interest guesser.

/// Documents, training examples, signatures, and labels.
#[path = "../model.rs"]
pub mod model;

/// Term frequency / inverse document frequency scoring and ranking.
#[path = "../tfidf.rs"]
pub mod tfidf;

/// Durable corpus store.
#[path = "../store.rs"]
pub mod store;

/// Feature signature construction.
#[path = "../signature.rs"]
pub mod signature;

pub use model::{FeatureSignature, Keyword, Label, LabelError, TrainingExample};
pub use signature::{SignatureBuilder, DEFAULT_KEYWORDS};
pub use store::{CorpusLoadError, CorpusStore, PersistenceError, TrainingExamples, UpsertOutcome};
pub use tfidf::{
    inverse_document_frequency, rank_terms, term_frequency, tfidf, TfIdfError,
};
