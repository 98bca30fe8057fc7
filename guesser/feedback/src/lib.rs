#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Relevance-feedback engine: one interactive session per candidate link.

/// Contracts for the fetcher, prompter, opener, and link source.
#[path = "../collaborators.rs"]
pub mod collaborators;

/// TOML configuration.
#[path = "../config.rs"]
pub mod config;

/// Telemetry helpers.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Long-lived corpus + classifier context.
#[path = "../context.rs"]
pub mod context;

/// Per-link decision state machine.
#[path = "../session.rs"]
pub mod session;

/// Sequential link queue driver.
#[path = "../queue.rs"]
pub mod queue;

#[cfg(test)]
#[path = "../testkit.rs"]
mod testkit;

pub use collaborators::{
    AnnotationError, Choice, DocumentReader, FetchError, GuessOutcome, Link, LinkSource,
    LinkSourceError, Notice, Opener, Prompt, PromptError, PromptKind, Prompter, ReaderError,
    StaticLinkSource,
};
pub use config::{ClassifierConfig, GuesserConfig, KeywordConfig, LoggingConfig, ReaderConfig};
pub use context::{Analysis, ContextError, FeedbackContext, FeedbackSettings, JudgmentRecord};
pub use queue::{QueueDriver, QueueReport};
pub use session::{SessionController, SessionError, SessionOutcome, SessionReport, SessionState};
pub use telemetry::{FeedbackTelemetry, FeedbackTelemetryBuilder};
