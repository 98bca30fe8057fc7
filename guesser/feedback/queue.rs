use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    collaborators::{Link, LinkSource, LinkSourceError, Notice, PromptError},
    session::{SessionController, SessionError, SessionOutcome},
};

/// Tally of a finished queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueReport {
    /// Sessions started.
    pub sessions: usize,
    /// Links skipped for lack of a url.
    pub skipped: usize,
    /// Sessions ending in a judgment.
    pub judged: usize,
    /// Sessions ending in a discard.
    pub discarded: usize,
    /// Sessions aborted by an error.
    pub failed: usize,
    /// Guesses shown.
    pub guesses: usize,
    /// Judgments that did not reach disk.
    pub unsaved: usize,
    /// True when input closed before the queue was exhausted.
    pub interrupted: bool,
}

/// Runs one session per link, strictly in order.
pub struct QueueDriver<'a> {
    controller: SessionController<'a>,
}

impl<'a> QueueDriver<'a> {
    /// Creates a driver around `controller`.
    #[must_use]
    pub fn new(controller: SessionController<'a>) -> Self {
        Self { controller }
    }

    /// Pulls every link from `source` and runs them.
    pub async fn run_source(
        &mut self,
        source: &dyn LinkSource,
    ) -> Result<QueueReport, LinkSourceError> {
        let links = source.links().await?;
        Ok(self.run(links).await)
    }

    /// Runs `links` in order. A failed session is reported and the queue moves on; closed
    /// input stops the queue.
    pub async fn run(&mut self, links: Vec<Link>) -> QueueReport {
        let mut report = QueueReport::default();
        let total = links.len();
        for link in links {
            let Some(url) = link.href.as_deref() else {
                report.skipped += 1;
                self.controller.log(
                    LogLevel::Debug,
                    "feedback.queue.skipped",
                    json!({ "title": link.title }),
                );
                continue;
            };
            report.sessions += 1;
            match self.controller.run(&link.title, url).await {
                Ok(session) => {
                    if session.guess.is_some() {
                        report.guesses += 1;
                    }
                    match session.outcome {
                        SessionOutcome::Judged { persisted, .. } => {
                            report.judged += 1;
                            if !persisted {
                                report.unsaved += 1;
                            }
                        }
                        SessionOutcome::LinkDiscarded | SessionOutcome::DocumentDiscarded => {
                            report.discarded += 1;
                        }
                    }
                }
                Err(SessionError::Prompt(PromptError::Closed)) => {
                    report.interrupted = true;
                    self.controller.log(
                        LogLevel::Warn,
                        "feedback.queue.interrupted",
                        json!({ "url": url }),
                    );
                    break;
                }
                Err(err) => {
                    report.failed += 1;
                    self.controller.log(
                        LogLevel::Warn,
                        "feedback.session.failed",
                        json!({ "url": url, "error": err.to_string() }),
                    );
                    self.controller
                        .event(
                            "feedback.session.failed",
                            json!({ "url": url, "error": err.to_string() }),
                        )
                        .await;
                    self.controller
                        .prompter()
                        .notify(Notice::Failure {
                            url: Some(url.to_owned()),
                            message: err.to_string(),
                        })
                        .await;
                }
            }
        }
        self.controller.log(
            LogLevel::Info,
            "feedback.queue.completed",
            json!({ "links": total, "report": report }),
        );
        self.controller
            .event("feedback.queue.completed", json!(report))
            .await;
        report
    }
}
