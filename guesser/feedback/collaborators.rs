//! Contracts the feedback engine consumes from the outside world.
//!
//! Fetching and tokenizing documents, talking to the user, opening links, and producing
//! the candidate queue all happen behind these traits. Terminal and HTTP implementations
//! live in other crates; tests use scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use guesser_corpus::{Keyword, Label};

/// Candidate link produced by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Display title.
    pub title: String,
    /// Target url. Links without one are skipped.
    #[serde(default)]
    pub href: Option<String>,
}

impl Link {
    /// Creates a link with a target.
    #[must_use]
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: Some(href.into()),
        }
    }
}

/// Failure to produce the candidate queue.
#[derive(Debug, Error)]
pub enum LinkSourceError {
    /// The backing source could not be read.
    #[error("reading links: {0}")]
    Io(#[from] std::io::Error),
    /// The backing source is not a list of links.
    #[error("parsing links: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Produces the ordered queue of candidate links.
#[async_trait]
pub trait LinkSource: Send + Sync {
    /// Returns every candidate, in order.
    async fn links(&self) -> Result<Vec<Link>, LinkSourceError>;
}

/// Link source over a fixed list.
#[derive(Debug, Clone, Default)]
pub struct StaticLinkSource {
    links: Vec<Link>,
}

impl StaticLinkSource {
    /// Wraps `links`.
    #[must_use]
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }
}

#[async_trait]
impl LinkSource for StaticLinkSource {
    async fn links(&self) -> Result<Vec<Link>, LinkSourceError> {
        Ok(self.links.clone())
    }
}

/// Network or transport failure while downloading a document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("transport error for {url}: {message}")]
    Transport {
        /// Requested url.
        url: String,
        /// Transport detail.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("{url} answered with status {status}")]
    Status {
        /// Requested url.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}

/// Failure to turn a downloaded document into filtered tokens.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// No readable body text was found.
    #[error("no readable text in {url}")]
    EmptyText {
        /// Source url.
        url: String,
    },
    /// Text was found but every token was filtered out.
    #[error("no content tokens left in {url}")]
    NoTokens {
        /// Source url.
        url: String,
    },
    /// The tokenizer or tagger itself failed.
    #[error("annotating {url}: {message}")]
    Annotator {
        /// Source url.
        url: String,
        /// Failure detail.
        message: String,
    },
}

/// Either half of the read pipeline failing.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Extraction or tokenization failed.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// Fetches a url and returns its filtered term tokens, in document order.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Reads and tokenizes `url`.
    async fn read(&self, url: &str) -> Result<Vec<String>, ReaderError>;
}

/// Opens a url in an external viewer. Best effort; the engine never waits on the outcome.
#[async_trait]
pub trait Opener: Send + Sync {
    /// Opens `url`.
    async fn open(&self, url: &str);
}

/// Options the user can pick during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// Open the link in the browser.
    Open,
    /// Skip the link or document.
    Discard,
    /// Fetch and analyze the document.
    Analyze,
    /// The document is interesting.
    Good,
    /// The document is not interesting.
    Bad,
    /// Ask the classifier first.
    Guess,
}

impl Choice {
    /// Menu text for the option.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open the link in the browser",
            Self::Discard => "Discard it",
            Self::Analyze => "Analyze",
            Self::Good => "Of course yes!",
            Self::Bad => "Hell no!",
            Self::Guess => "I doubt you can guess it!",
        }
    }
}

/// The decision point a prompt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// What to do with a freshly shown link.
    Link,
    /// What to do with an opened document.
    Document,
    /// Whether the analyzed document is interesting.
    Judgment,
}

impl PromptKind {
    /// Question shown above the options.
    #[must_use]
    pub const fn question(self) -> &'static str {
        match self {
            Self::Link => "What should I do with this link?",
            Self::Document => "What should I do with this document?",
            Self::Judgment => "Is this an interesting document?",
        }
    }
}

/// Enumerated options presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Decision point.
    pub kind: PromptKind,
    /// Options, in display order.
    pub options: Vec<Choice>,
}

impl Prompt {
    /// Creates a prompt.
    #[must_use]
    pub fn new(kind: PromptKind, options: Vec<Choice>) -> Self {
        Self { kind, options }
    }
}

/// Result of asking the classifier for a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuessOutcome {
    /// The classifier's prediction.
    Predicted {
        /// Predicted label.
        label: Label,
    },
    /// Too few judgments exist for a meaningful guess.
    InsufficientData {
        /// Judgments recorded so far.
        available: usize,
        /// Judgments required.
        required: usize,
    },
}

/// Information the engine shows the user without asking anything.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A new link is up for triage.
    Link {
        /// Link title.
        title: String,
        /// Link url.
        url: String,
    },
    /// The document is being fetched and analyzed.
    Analyzing {
        /// Document url.
        url: String,
    },
    /// Top keywords of the analyzed document.
    Keywords(Vec<Keyword>),
    /// The classifier's guess.
    Guess(GuessOutcome),
    /// A judgment was recorded.
    Recorded {
        /// The judgment.
        label: Label,
        /// Whether the corpus reached disk.
        persisted: bool,
    },
    /// A session or checkpoint failed; one line of explanation.
    Failure {
        /// Affected url, if any.
        url: Option<String>,
        /// Explanation.
        message: String,
    },
}

/// Failure to obtain an answer from the user.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Input closed before an answer arrived.
    #[error("input closed")]
    Closed,
    /// Reading input failed.
    #[error("reading input: {0}")]
    Io(#[from] std::io::Error),
}

/// Talks to the user.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Presents `prompt` and returns the index of the selected option.
    ///
    /// Implementations re-ask until the answer is in range.
    async fn choose(&self, prompt: &Prompt) -> Result<usize, PromptError>;

    /// Displays `notice`.
    async fn notify(&self, notice: Notice);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_deserialize_with_missing_href() {
        let links: Vec<Link> = serde_json::from_str(
            r#"[{"title":"a","href":"http://a"},{"title":"b","href":null},{"title":"c"}]"#,
        )
        .unwrap();
        assert_eq!(links[0], Link::new("a", "http://a"));
        assert!(links[1].href.is_none());
        assert!(links[2].href.is_none());
    }

    #[test]
    fn guess_outcome_serializes_with_tag() {
        let json = serde_json::to_value(GuessOutcome::InsufficientData {
            available: 0,
            required: 1,
        })
        .unwrap();
        assert_eq!(json["outcome"], "insufficient_data");
        let predicted = serde_json::to_value(GuessOutcome::Predicted {
            label: Label::Interesting,
        })
        .unwrap();
        assert_eq!(predicted["label"], 1);
    }
}
