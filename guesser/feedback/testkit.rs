//! Scripted collaborator fakes shared by the session and queue tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::collaborators::{
    Choice, DocumentReader, FetchError, Notice, Opener, Prompt, PromptError, Prompter,
    ReaderError,
};

enum Answer {
    Pick(Choice),
    Index(usize),
}

/// Replays a fixed script of answers and records everything it was shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    script: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<Prompt>>,
    notices: Mutex<Vec<Notice>>,
}

impl ScriptedPrompter {
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            script: Mutex::new(choices.into_iter().map(Answer::Pick).collect()),
            ..Self::default()
        }
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: Mutex::new(indices.into_iter().map(Answer::Index).collect()),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn choose(&self, prompt: &Prompt) -> Result<usize, PromptError> {
        self.prompts.lock().push(prompt.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(Answer::Index(index)) => Ok(index),
            Some(Answer::Pick(choice)) => Ok(prompt
                .options
                .iter()
                .position(|option| *option == choice)
                .unwrap_or_else(|| panic!("{choice:?} not offered in {prompt:?}"))),
            None => Err(PromptError::Closed),
        }
    }

    async fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

/// Serves fixed token lists; unknown urls fail with a 404.
#[derive(Default)]
pub struct FixedReader {
    documents: HashMap<String, Vec<String>>,
    reads: Mutex<usize>,
}

impl FixedReader {
    pub fn with_document(mut self, url: &str, tokens: &[&str]) -> Self {
        self.documents.insert(
            url.to_string(),
            tokens.iter().map(|token| (*token).to_string()).collect(),
        );
        self
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock()
    }
}

#[async_trait]
impl DocumentReader for FixedReader {
    async fn read(&self, url: &str) -> Result<Vec<String>, ReaderError> {
        *self.reads.lock() += 1;
        self.documents.get(url).cloned().ok_or_else(|| {
            FetchError::Status {
                url: url.to_string(),
                status: 404,
            }
            .into()
        })
    }
}

/// Remembers every url it was asked to open.
#[derive(Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl Opener for RecordingOpener {
    async fn open(&self, url: &str) {
        self.opened.lock().push(url.to_string());
    }
}
