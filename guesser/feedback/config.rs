use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shared_logging::LogLevel;

use guesser_corpus::SignatureBuilder;
use guesser_learning::WinnowParams;

use crate::context::FeedbackSettings;

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct GuesserConfig {
    /// Location of the persisted corpus.
    #[serde(default = "default_repository")]
    pub repository: PathBuf,
    /// Logging and event sinks.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Winnow hyperparameters and guess gating.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Keyword counts feeding signatures and displays.
    #[serde(default)]
    pub keywords: KeywordConfig,
    /// Reference document reader settings.
    #[serde(default)]
    pub reader: ReaderConfig,
}

impl Default for GuesserConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            logging: LoggingConfig::default(),
            classifier: ClassifierConfig::default(),
            keywords: KeywordConfig::default(),
            reader: ReaderConfig::default(),
        }
    }
}

impl GuesserConfig {
    /// Loads configuration from a TOML file. Relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.resolve_paths(&base);
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns validated defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |candidate: &mut PathBuf| {
            if candidate.is_relative() {
                *candidate = base.join(&*candidate);
            }
        };
        resolve(&mut self.repository);
        if let Some(log_path) = self.logging.log_path.as_mut() {
            resolve(log_path);
        }
        if let Some(event_log) = self.logging.event_log.as_mut() {
            resolve(event_log);
        }
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.classifier.winnow_params()?;
        if self.keywords.background == 0 || self.keywords.local == 0 {
            bail!("keyword counts must be at least 1");
        }
        if self.reader.timeout_ms == 0 {
            bail!("reader timeout must be positive");
        }
        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub fn feedback_settings(&self) -> Result<FeedbackSettings> {
        Ok(FeedbackSettings {
            winnow: self.classifier.winnow_params()?,
            signature: SignatureBuilder::new(self.keywords.background, self.keywords.local),
            min_training_examples: self.classifier.min_training_examples,
        })
    }
}

/// Logging sinks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// JSON-lines log file. No file means no structured log.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// Lowest level written to the log.
    #[serde(default)]
    pub min_level: LogLevel,
    /// JSON-lines event log.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

/// Classifier hyperparameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Promotion factor (alpha), > 1.
    #[serde(default = "default_promotion")]
    pub promotion: f64,
    /// Demotion factor (beta), in (0, 1).
    #[serde(default = "default_demotion")]
    pub demotion: f64,
    /// Decision threshold (theta).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Judgments required corpus-wide before a guess is offered.
    #[serde(default = "default_min_training_examples")]
    pub min_training_examples: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            promotion: default_promotion(),
            demotion: default_demotion(),
            threshold: default_threshold(),
            min_training_examples: default_min_training_examples(),
        }
    }
}

impl ClassifierConfig {
    /// Validated Winnow parameters.
    pub fn winnow_params(&self) -> Result<WinnowParams> {
        WinnowParams::new(self.promotion, self.demotion, self.threshold)
            .context("invalid classifier settings")
    }
}

/// Keyword counts.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    /// Corpus-wide keywords seeding each signature.
    #[serde(default = "default_keyword_count")]
    pub background: usize,
    /// Document keywords shown and folded into each signature.
    #[serde(default = "default_keyword_count")]
    pub local: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            background: default_keyword_count(),
            local: default_keyword_count(),
        }
    }
}

/// Settings for the HTTP document reader.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Shorter tokens are dropped.
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    /// Extra stopwords on top of the built-in list.
    #[serde(default)]
    pub stopwords: Vec<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            min_token_len: default_min_token_len(),
            stopwords: Vec::new(),
        }
    }
}

fn default_repository() -> PathBuf {
    PathBuf::from("repository.json")
}

const fn default_promotion() -> f64 {
    1.5
}

const fn default_demotion() -> f64 {
    0.5
}

const fn default_threshold() -> f64 {
    1.0
}

const fn default_min_training_examples() -> usize {
    1
}

const fn default_keyword_count() -> usize {
    guesser_corpus::DEFAULT_KEYWORDS
}

fn default_user_agent() -> String {
    format!("interest-guesser/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_timeout_ms() -> u64 {
    15_000
}

const fn default_min_token_len() -> usize {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_with_defaults_and_resolves_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guesser.toml");
        fs::write(
            &path,
            r#"
repository = "data/repository.json"

[logging]
log_path = "logs/guesser.jsonl"
min_level = "WARN"

[classifier]
promotion = 2.0

[reader]
stopwords = ["lorem"]
"#,
        )
        .unwrap();
        let config = GuesserConfig::load(&path).unwrap();
        assert_eq!(config.repository, dir.path().join("data/repository.json"));
        assert_eq!(
            config.logging.log_path.as_deref(),
            Some(dir.path().join("logs/guesser.jsonl").as_path())
        );
        assert_eq!(config.logging.min_level, LogLevel::Warn);
        assert_eq!(config.classifier.promotion, 2.0);
        assert_eq!(config.classifier.demotion, 0.5);
        assert_eq!(config.keywords.local, 10);
        assert_eq!(config.reader.stopwords, vec!["lorem".to_string()]);
        assert_eq!(config.reader.timeout_ms, 15_000);

        let settings = config.feedback_settings().unwrap();
        assert_eq!(settings.winnow.promotion(), 2.0);
        assert_eq!(settings.min_training_examples, 1);
    }

    #[test]
    fn rejects_invalid_classifier_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guesser.toml");
        fs::write(&path, "[classifier]\ndemotion = 1.5\n").unwrap();
        assert!(GuesserConfig::load(&path).is_err());
    }

    #[test]
    fn rejects_zero_keywords() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guesser.toml");
        fs::write(&path, "[keywords]\nlocal = 0\n").unwrap();
        assert!(GuesserConfig::load(&path).is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let config = GuesserConfig::load_or_default(None).unwrap();
        assert_eq!(config.repository, PathBuf::from("repository.json"));
        assert_eq!(config.classifier.min_training_examples, 1);
    }
}
