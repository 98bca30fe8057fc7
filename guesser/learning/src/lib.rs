#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Online classifiers trained from user relevance judgments.

/// Classifier contract shared by online learners.
#[path = "../classifier.rs"]
pub mod classifier;

/// Winnow: multiplicative promotion/demotion linear classifier.
#[path = "../winnow.rs"]
pub mod winnow;

pub use classifier::OnlineClassifier;
pub use winnow::{Winnow, WinnowConfigError, WinnowParams};
