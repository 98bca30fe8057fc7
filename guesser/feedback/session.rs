use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;
use thiserror::Error;

use guesser_corpus::{Label, TfIdfError};

use crate::{
    collaborators::{
        Choice, DocumentReader, GuessOutcome, Notice, Opener, Prompt, PromptError, PromptKind,
        Prompter, ReaderError,
    },
    context::{Analysis, FeedbackContext},
    telemetry::{self, FeedbackTelemetry},
};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Discarded at the link prompt.
    LinkDiscarded,
    /// Discarded after opening, before analysis.
    DocumentDiscarded,
    /// A judgment was recorded.
    Judged {
        /// The judgment.
        label: Label,
        /// Whether the checkpoint reached disk.
        persisted: bool,
    },
}

/// Session positions. Each step of [`SessionController::run`] consumes one state and
/// yields the next.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The link is about to be shown.
    LinkShown,
    /// Waiting for open or discard.
    AwaitingLinkChoice,
    /// The link is about to be opened.
    DocumentOpened,
    /// Waiting for analyze or discard.
    AwaitingDocumentChoice,
    /// The document is stored and its signature built.
    DocumentAnalyzed(Analysis),
    /// Waiting for a judgment, or a guess request while one is still available.
    AwaitingJudgment {
        /// The analyzed document.
        analysis: Analysis,
        /// False once a guess was shown for this document.
        guess_available: bool,
    },
    /// A guess is about to be shown.
    GuessShown {
        /// The analyzed document.
        analysis: Analysis,
        /// What the classifier said.
        outcome: GuessOutcome,
    },
    /// The session is over.
    Terminal(SessionOutcome),
}

impl SessionState {
    /// Stable state name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LinkShown => "link_shown",
            Self::AwaitingLinkChoice => "awaiting_link_choice",
            Self::DocumentOpened => "document_opened",
            Self::AwaitingDocumentChoice => "awaiting_document_choice",
            Self::DocumentAnalyzed(_) => "document_analyzed",
            Self::AwaitingJudgment { .. } => "awaiting_judgment",
            Self::GuessShown { .. } => "guess_shown",
            Self::Terminal(_) => "terminal",
        }
    }
}

/// Reasons a session aborts before reaching a terminal state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The document could not be fetched or tokenized.
    #[error(transparent)]
    Read(#[from] ReaderError),
    /// Keyword ranking failed.
    #[error("indexing failed: {0}")]
    Index(#[from] TfIdfError),
    /// No answer could be obtained from the user.
    #[error(transparent)]
    Prompt(#[from] PromptError),
    /// The prompter returned an index outside the offered options.
    #[error("choice {index} is outside the {offered} offered options")]
    InvalidChoice {
        /// Returned index.
        index: usize,
        /// Number of options offered.
        offered: usize,
    },
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// The link's url.
    pub url: String,
    /// How it ended.
    pub outcome: SessionOutcome,
    /// The guess shown during the session, if one was requested.
    pub guess: Option<GuessOutcome>,
}

/// Drives one link at a time through the decision state machine.
///
/// The controller holds the only mutable borrow of the context, so sessions cannot
/// overlap.
pub struct SessionController<'a> {
    context: &'a mut FeedbackContext,
    reader: &'a dyn DocumentReader,
    prompter: &'a dyn Prompter,
    opener: &'a dyn Opener,
    telemetry: Option<FeedbackTelemetry>,
}

impl<'a> SessionController<'a> {
    /// Wires a controller to its collaborators.
    pub fn new(
        context: &'a mut FeedbackContext,
        reader: &'a dyn DocumentReader,
        prompter: &'a dyn Prompter,
        opener: &'a dyn Opener,
    ) -> Self {
        let telemetry = context.telemetry().cloned();
        Self {
            context,
            reader,
            prompter,
            opener,
            telemetry,
        }
    }

    /// Context the sessions mutate.
    #[must_use]
    pub fn context(&self) -> &FeedbackContext {
        &*self.context
    }

    /// Prompter used for choices and notices.
    #[must_use]
    pub fn prompter(&self) -> &'a dyn Prompter {
        self.prompter
    }

    /// Runs one session for the link `title` / `url` until it reaches a terminal state.
    pub async fn run(&mut self, title: &str, url: &str) -> Result<SessionReport, SessionError> {
        let mut state = SessionState::LinkShown;
        let mut guess = None;
        loop {
            self.log(
                LogLevel::Debug,
                "feedback.session.state",
                json!({ "url": url, "state": state.name() }),
            );
            state = match state {
                SessionState::LinkShown => {
                    self.prompter
                        .notify(Notice::Link {
                            title: title.to_owned(),
                            url: url.to_owned(),
                        })
                        .await;
                    SessionState::AwaitingLinkChoice
                }
                SessionState::AwaitingLinkChoice => {
                    match self.ask(PromptKind::Link, vec![Choice::Open, Choice::Discard]).await? {
                        Choice::Open => SessionState::DocumentOpened,
                        _ => SessionState::Terminal(SessionOutcome::LinkDiscarded),
                    }
                }
                SessionState::DocumentOpened => {
                    self.opener.open(url).await;
                    SessionState::AwaitingDocumentChoice
                }
                SessionState::AwaitingDocumentChoice => {
                    match self
                        .ask(PromptKind::Document, vec![Choice::Analyze, Choice::Discard])
                        .await?
                    {
                        Choice::Analyze => SessionState::DocumentAnalyzed(self.analyze(url).await?),
                        _ => SessionState::Terminal(SessionOutcome::DocumentDiscarded),
                    }
                }
                SessionState::DocumentAnalyzed(analysis) => {
                    self.prompter
                        .notify(Notice::Keywords(analysis.keywords.clone()))
                        .await;
                    self.event(
                        "feedback.document.analyzed",
                        json!({
                            "url": url,
                            "tokens": analysis.token_count,
                            "keywords": analysis.keywords,
                        }),
                    )
                    .await;
                    SessionState::AwaitingJudgment {
                        analysis,
                        guess_available: true,
                    }
                }
                SessionState::AwaitingJudgment {
                    analysis,
                    guess_available,
                } => {
                    let mut options = vec![Choice::Good, Choice::Bad];
                    if guess_available {
                        options.push(Choice::Guess);
                    }
                    match self.ask(PromptKind::Judgment, options).await? {
                        Choice::Guess => {
                            let outcome = self.context.guess(&analysis.signature);
                            SessionState::GuessShown { analysis, outcome }
                        }
                        Choice::Good => self.judge(url, analysis, Label::Interesting).await,
                        _ => self.judge(url, analysis, Label::NotInteresting).await,
                    }
                }
                SessionState::GuessShown { analysis, outcome } => {
                    self.prompter.notify(Notice::Guess(outcome)).await;
                    self.event("feedback.guess.shown", json!({ "url": url, "guess": outcome }))
                        .await;
                    guess = Some(outcome);
                    SessionState::AwaitingJudgment {
                        analysis,
                        guess_available: false,
                    }
                }
                SessionState::Terminal(outcome) => {
                    self.log(
                        LogLevel::Info,
                        "feedback.session.completed",
                        json!({ "url": url, "outcome": outcome }),
                    );
                    return Ok(SessionReport {
                        url: url.to_owned(),
                        outcome,
                        guess,
                    });
                }
            };
        }
    }

    async fn ask(&self, kind: PromptKind, options: Vec<Choice>) -> Result<Choice, SessionError> {
        let prompt = Prompt::new(kind, options);
        let index = self.prompter.choose(&prompt).await?;
        prompt
            .options
            .get(index)
            .copied()
            .ok_or(SessionError::InvalidChoice {
                index,
                offered: prompt.options.len(),
            })
    }

    async fn analyze(&mut self, url: &str) -> Result<Analysis, SessionError> {
        self.prompter
            .notify(Notice::Analyzing {
                url: url.to_owned(),
            })
            .await;
        let tokens = self.reader.read(url).await?;
        Ok(self.context.analyze(url, tokens)?)
    }

    async fn judge(&mut self, url: &str, analysis: Analysis, label: Label) -> SessionState {
        let record = self.context.record_judgment(analysis.signature, label).await;
        let persisted = record.persisted.is_ok();
        self.prompter
            .notify(Notice::Recorded { label, persisted })
            .await;
        if let Err(err) = &record.persisted {
            self.prompter
                .notify(Notice::Failure {
                    url: Some(url.to_owned()),
                    message: format!("judgment kept in memory but not saved: {err}"),
                })
                .await;
        }
        self.event(
            "feedback.judgment.recorded",
            json!({
                "url": url,
                "label": label,
                "model_updated": record.model_updated,
                "persisted": persisted,
            }),
        )
        .await;
        SessionState::Terminal(SessionOutcome::Judged { label, persisted })
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        telemetry::log(self.telemetry.as_ref(), level, message, metadata);
    }

    pub(crate) async fn event(&self, event_type: &str, payload: serde_json::Value) {
        telemetry::event(self.telemetry.as_ref(), event_type, payload).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::FeedbackSettings,
        testkit::{FixedReader, RecordingOpener, ScriptedPrompter},
    };
    use guesser_corpus::CorpusStore;
    use shared_event_bus::MemoryEventBus;
    use std::sync::Arc;
    use tempfile::tempdir;

    const URL: &str = "http://pets/b";

    fn seeded_context() -> FeedbackContext {
        let mut store = CorpusStore::detached();
        store.upsert_document(
            "http://pets/a",
            vec!["cat".into(), "dog".into(), "cat".into()],
        );
        FeedbackContext::new(store, FeedbackSettings::default())
    }

    fn reader() -> FixedReader {
        FixedReader::default().with_document(URL, &["dog", "dog", "fish"])
    }

    #[tokio::test]
    async fn discarding_the_link_leaves_everything_untouched() {
        let mut context = seeded_context();
        let reader = reader();
        let prompter = ScriptedPrompter::new([Choice::Discard]);
        let opener = RecordingOpener::default();
        let report = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap();
        assert_eq!(report.outcome, SessionOutcome::LinkDiscarded);
        assert_eq!(context.store().len(), 1);
        assert_eq!(context.store().training_count(), 0);
        assert!(opener.opened().is_empty());
        assert_eq!(reader.reads(), 0);
    }

    #[tokio::test]
    async fn discarding_the_document_skips_analysis() {
        let mut context = seeded_context();
        let reader = reader();
        let prompter = ScriptedPrompter::new([Choice::Open, Choice::Discard]);
        let opener = RecordingOpener::default();
        let report = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap();
        assert_eq!(report.outcome, SessionOutcome::DocumentDiscarded);
        assert_eq!(opener.opened(), vec![URL.to_string()]);
        assert_eq!(context.store().len(), 1);
    }

    #[tokio::test]
    async fn guess_without_training_reports_insufficient_data_once() {
        let mut context = seeded_context();
        let reader = reader();
        let prompter = ScriptedPrompter::new([
            Choice::Open,
            Choice::Analyze,
            Choice::Guess,
            Choice::Good,
        ]);
        let opener = RecordingOpener::default();
        let report = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap();

        assert_eq!(
            report.guess,
            Some(GuessOutcome::InsufficientData {
                available: 0,
                required: 1
            })
        );
        assert_eq!(
            report.outcome,
            SessionOutcome::Judged {
                label: Label::Interesting,
                persisted: true
            }
        );
        let judgments: Vec<_> = prompter
            .prompts()
            .into_iter()
            .filter(|prompt| prompt.kind == PromptKind::Judgment)
            .collect();
        assert_eq!(judgments.len(), 2);
        assert!(judgments[0].options.contains(&Choice::Guess));
        assert!(!judgments[1].options.contains(&Choice::Guess));
        assert_eq!(context.store().len(), 2);
        assert_eq!(context.store().training_count(), 1);
    }

    #[tokio::test]
    async fn judgment_persists_and_emits_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repository.json");
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = FeedbackTelemetry::builder("feedback")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let mut store = CorpusStore::open(&path).await.unwrap();
        store.upsert_document(
            "http://pets/a",
            vec!["cat".into(), "dog".into(), "cat".into()],
        );
        let mut context =
            FeedbackContext::new(store, FeedbackSettings::default()).with_telemetry(telemetry);
        let reader = reader();
        let prompter = ScriptedPrompter::new([Choice::Open, Choice::Analyze, Choice::Bad]);
        let opener = RecordingOpener::default();
        let report = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SessionOutcome::Judged {
                label: Label::NotInteresting,
                persisted: true
            }
        );
        let reloaded = CorpusStore::open(&path).await.unwrap();
        assert_eq!(reloaded.training_count(), 1);
        assert_eq!(reloaded.document(URL).unwrap().len(), 3);
        assert_eq!(bus.events_of("feedback.document.analyzed").len(), 1);
        assert_eq!(bus.events_of("feedback.judgment.recorded").len(), 1);
        assert!(prompter
            .notices()
            .iter()
            .any(|notice| matches!(notice, Notice::Keywords(keywords) if keywords[0].term == "fish")));
    }

    #[tokio::test]
    async fn persist_failure_still_completes_the_session() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repository.json");
        let store = CorpusStore::open(&path).await.unwrap();
        // A directory where the record belongs makes the write fail.
        std::fs::create_dir(&path).unwrap();
        let mut context = FeedbackContext::new(store, FeedbackSettings::default());
        let reader = reader();
        let prompter = ScriptedPrompter::new([Choice::Open, Choice::Analyze, Choice::Good]);
        let opener = RecordingOpener::default();
        let report = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap();
        assert_eq!(
            report.outcome,
            SessionOutcome::Judged {
                label: Label::Interesting,
                persisted: false
            }
        );
        assert_eq!(context.store().training_count(), 1);
        assert!(prompter
            .notices()
            .iter()
            .any(|notice| matches!(notice, Notice::Failure { .. })));
    }

    #[tokio::test]
    async fn fetch_failure_aborts_without_mutation() {
        let mut context = seeded_context();
        let reader = FixedReader::default();
        let prompter = ScriptedPrompter::new([Choice::Open, Choice::Analyze]);
        let opener = RecordingOpener::default();
        let err = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Read(_)));
        assert_eq!(context.store().len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_choice_is_rejected() {
        let mut context = seeded_context();
        let reader = reader();
        let prompter = ScriptedPrompter::from_indices([7]);
        let opener = RecordingOpener::default();
        let err = SessionController::new(&mut context, &reader, &prompter, &opener)
            .run("pets", URL)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidChoice {
                index: 7,
                offered: 2
            }
        ));
    }
}
