use std::path::{Path, PathBuf};

use async_trait::async_trait;

use guesser_feedback::{Link, LinkSource, LinkSourceError};

/// Reads links from a JSON array of `{ "title": .., "href": .. }` objects.
#[derive(Debug, Clone)]
pub struct JsonLinkSource {
    path: PathBuf,
}

impl JsonLinkSource {
    /// Source backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LinkSource for JsonLinkSource {
    async fn links(&self) -> Result<Vec<Link>, LinkSourceError> {
        let raw = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_search_results() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "Rust 1.80 released", "href": "https://blog.rust-lang.org/"},
                {"title": "Sponsored", "href": null}
            ]"#,
        )
        .unwrap();
        let links = JsonLinkSource::new(&path).links().await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href.as_deref(), Some("https://blog.rust-lang.org/"));
        assert!(links[1].href.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("links.json");
        std::fs::write(&path, r#"{"title": "not a list"}"#).unwrap();
        let err = JsonLinkSource::new(&path).links().await.unwrap_err();
        assert!(matches!(err, LinkSourceError::Parse(_)));
    }
}
