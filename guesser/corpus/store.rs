use std::{
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    model::{FeatureSignature, Keyword, Label, TrainingExample},
    tfidf::{rank_terms, TfIdfError},
};

/// Errors that make a persisted corpus unusable. Startup must stop on these.
#[derive(Debug, Error)]
pub enum CorpusLoadError {
    /// The record exists but could not be read.
    #[error("reading corpus {path}: {source}")]
    Io {
        /// Record location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The record is not valid corpus JSON.
    #[error("corpus {path} is corrupt: {source}")]
    Corrupt {
        /// Record location.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The record parsed but breaks the url/document pairing.
    #[error("corpus {path} is inconsistent: {reason}")]
    Inconsistent {
        /// Record location.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },
}

/// Failure to write the corpus. Reported, never fatal.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Serialization failed.
    #[error("encoding corpus: {0}")]
    Encode(#[from] serde_json::Error),
    /// The write or rename failed.
    #[error("writing corpus {path}: {source}")]
    Io {
        /// Record location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Whether an upsert created or replaced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The url was new and the document was appended.
    Inserted,
    /// The url existed; its tokens were replaced in place.
    Replaced,
}

/// On-disk layout: index-aligned `urls` / `documents` plus the training log.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RepositoryRecord {
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    trains: Vec<TrainingExample>,
}

/// Restartable, in-order view of the training log.
pub type TrainingExamples<'a> = std::slice::Iter<'a, TrainingExample>;

/// Documents keyed by url in insertion order, plus the append-only training log.
#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    path: Option<PathBuf>,
    documents: IndexMap<String, Vec<String>>,
    trains: Vec<TrainingExample>,
}

impl CorpusStore {
    /// Loads the corpus stored at `path`. A missing file yields an empty corpus.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CorpusLoadError> {
        let path = path.into();
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    path: Some(path),
                    ..Self::default()
                });
            }
            Err(source) => return Err(CorpusLoadError::Io { path, source }),
        };
        let record: RepositoryRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(source) => return Err(CorpusLoadError::Corrupt { path, source }),
        };
        Self::from_record(path, record)
    }

    /// Creates an empty corpus that is never written to disk.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Copy of this corpus with no backing file.
    #[must_use]
    pub fn detached_copy(&self) -> Self {
        Self {
            path: None,
            documents: self.documents.clone(),
            trains: self.trains.clone(),
        }
    }

    fn from_record(path: PathBuf, record: RepositoryRecord) -> Result<Self, CorpusLoadError> {
        if record.urls.len() != record.documents.len() {
            return Err(CorpusLoadError::Inconsistent {
                reason: format!(
                    "{} urls but {} documents",
                    record.urls.len(),
                    record.documents.len()
                ),
                path,
            });
        }
        let mut documents = IndexMap::with_capacity(record.urls.len());
        for (url, tokens) in record.urls.into_iter().zip(record.documents) {
            if documents.contains_key(&url) {
                return Err(CorpusLoadError::Inconsistent {
                    reason: format!("duplicate url {url}"),
                    path,
                });
            }
            documents.insert(url, tokens);
        }
        Ok(Self {
            path: Some(path),
            documents,
            trains: record.trains,
        })
    }

    /// Where `persist` writes, if anywhere.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Inserts or replaces the tokens stored for `url`. Replacement keeps position.
    pub fn upsert_document(&mut self, url: impl Into<String>, tokens: Vec<String>) -> UpsertOutcome {
        match self.documents.insert(url.into(), tokens) {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Inserted,
        }
    }

    /// Tokens stored for `url`.
    #[must_use]
    pub fn document(&self, url: &str) -> Option<&[String]> {
        self.documents.get(url).map(Vec::as_slice)
    }

    /// Stored urls in insertion order.
    pub fn urls(&self) -> impl Iterator<Item = &str> + '_ {
        self.documents.keys().map(String::as_str)
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no documents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The training log in registration order. Clone the iterator to replay it again.
    pub fn training_examples(&self) -> TrainingExamples<'_> {
        self.trains.iter()
    }

    /// Number of registered training examples.
    #[must_use]
    pub fn training_count(&self) -> usize {
        self.trains.len()
    }

    /// Appends a judgment to the training log.
    pub fn register_training_example(&mut self, features: FeatureSignature, label: Label) {
        self.trains.push(TrainingExample::new(features, label));
    }

    /// Ranks the terms of `tokens` against the stored documents.
    pub fn keywords_for(
        &self,
        tokens: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Keyword>, TfIdfError> {
        rank_terms(tokens, &self.blobs(), limit)
    }

    /// Ranks the concatenation of every stored document: the corpus background keywords.
    pub fn top_keywords(&self, limit: Option<usize>) -> Result<Vec<Keyword>, TfIdfError> {
        let everything: Vec<String> = self.documents.values().flatten().cloned().collect();
        rank_terms(&everything, &self.blobs(), limit)
    }

    fn blobs(&self) -> Vec<&[String]> {
        self.documents.values().map(Vec::as_slice).collect()
    }

    /// Writes the whole corpus to its path. Detached stores have nothing to write.
    ///
    /// The record is written to a sibling temporary file and renamed into place.
    pub async fn persist(&self) -> Result<(), PersistenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let record = RepositoryRecord {
            urls: self.documents.keys().cloned().collect(),
            documents: self.documents.values().cloned().collect(),
            trains: self.trains.clone(),
        };
        let data = serde_json::to_vec(&record)?;
        let io_err = |source: io::Error| PersistenceError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }
        let staging = staging_path(path);
        tokio::fs::write(&staging, data).await.map_err(io_err)?;
        if let Err(source) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(io_err(source));
        }
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = CorpusStore::open(dir.path().join("repository.json"))
            .await
            .unwrap();
        assert!(store.is_empty());
        assert_eq!(store.training_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repository.json");
        std::fs::write(&path, b"{\"urls\": [\"a\"], \"documents\": [[\"x\"]").unwrap();
        let err = CorpusStore::open(&path).await.unwrap_err();
        assert!(matches!(err, CorpusLoadError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn misaligned_record_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repository.json");
        std::fs::write(&path, br#"{"urls":["a","b"],"documents":[["x"]],"trains":[]}"#).unwrap();
        let err = CorpusStore::open(&path).await.unwrap_err();
        assert!(matches!(err, CorpusLoadError::Inconsistent { .. }));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut store = CorpusStore::detached();
        assert_eq!(
            store.upsert_document("http://a", tokens(&["cat"])),
            UpsertOutcome::Inserted
        );
        store.upsert_document("http://b", tokens(&["dog"]));
        assert_eq!(
            store.upsert_document("http://a", tokens(&["fish", "cat"])),
            UpsertOutcome::Replaced
        );
        let urls: Vec<_> = store.urls().collect();
        assert_eq!(urls, vec!["http://a", "http://b"]);
        assert_eq!(store.document("http://a").unwrap(), tokens(&["fish", "cat"]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn training_log_is_restartable() {
        let mut store = CorpusStore::detached();
        store.register_training_example(
            [("cat", 0.3)].into_iter().collect(),
            Label::Interesting,
        );
        store.register_training_example(
            [("dog", -0.1)].into_iter().collect(),
            Label::NotInteresting,
        );
        let log = store.training_examples();
        let first_pass: Vec<_> = log.clone().map(|e| e.output).collect();
        let second_pass: Vec<_> = log.map(|e| e.output).collect();
        assert_eq!(first_pass, vec![Label::Interesting, Label::NotInteresting]);
        assert_eq!(first_pass, second_pass);
        assert!(store.is_empty());
    }

    #[test]
    fn keywords_rank_against_corpus() {
        let mut store = CorpusStore::detached();
        store.upsert_document("d1", tokens(&["cat", "dog", "cat"]));
        store.upsert_document("d2", tokens(&["dog", "dog", "fish"]));
        let doc = tokens(&["cat", "dog", "cat"]);
        let keywords = store.keywords_for(&doc, Some(1)).unwrap();
        assert_eq!(keywords.len(), 1);
        assert_eq!(keywords[0].term, "cat");

        let background = store.top_keywords(None).unwrap();
        let terms: Vec<_> = background.iter().map(|k| k.term.as_str()).collect();
        // cat (2/6 * ln2) outranks fish (1/6 * ln2); dog saturates at zero.
        assert_eq!(terms, vec!["cat", "fish", "dog"]);
    }

    #[test]
    fn empty_corpus_has_no_background() {
        let store = CorpusStore::detached();
        assert!(store.top_keywords(Some(10)).unwrap().is_empty());
        assert_eq!(
            store.keywords_for(&tokens(&["cat"]), Some(10)),
            Err(TfIdfError::EmptyCorpus)
        );
    }

    #[tokio::test]
    async fn persist_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("repository.json");
        let mut store = CorpusStore::open(&path).await.unwrap();
        store.upsert_document("http://b", tokens(&["rust", "async"]));
        store.upsert_document("http://a", tokens(&["python"]));
        store.register_training_example(
            [("rust", 0.2), ("python", -0.4)].into_iter().collect(),
            Label::Interesting,
        );
        store.persist().await.unwrap();
        assert!(!staging_path(&path).exists());

        let reloaded = CorpusStore::open(&path).await.unwrap();
        assert_eq!(reloaded.urls().collect::<Vec<_>>(), vec!["http://b", "http://a"]);
        assert_eq!(reloaded.document("http://b"), store.document("http://b"));
        assert_eq!(
            reloaded.training_examples().collect::<Vec<_>>(),
            store.training_examples().collect::<Vec<_>>()
        );

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["urls"][0], "http://b");
        assert_eq!(raw["trains"][0]["output"], 1);
    }

    #[tokio::test]
    async fn failed_rename_reports_and_clears_staging() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("repository.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let mut store = CorpusStore::open(&path).await.unwrap_or_default();
        store.path = Some(path.clone());
        store.upsert_document("http://a", tokens(&["cat"]));
        let err = store.persist().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
        assert!(!staging_path(&path).exists());
    }
}
