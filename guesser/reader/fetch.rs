use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use shared_logging::LogLevel;

use guesser_feedback::{
    AnnotationError, DocumentReader, FeedbackTelemetry, FetchError, ReaderConfig, ReaderError,
};

use crate::{extract::extract_text, tokenize::Tokenizer};

/// Downloads pages over HTTP and turns them into content tokens.
#[derive(Debug, Clone)]
pub struct HttpDocumentReader {
    client: Client,
    tokenizer: Tokenizer,
    telemetry: Option<FeedbackTelemetry>,
}

impl HttpDocumentReader {
    /// Builds a reader from configuration.
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let tokenizer = Tokenizer::new(config.min_token_len).with_stopwords(&config.stopwords);
        Ok(Self {
            client,
            tokenizer,
            telemetry: None,
        })
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: FeedbackTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Raw body of `url`.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.to_owned(),
            message: err.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }

    /// Content tokens of an already downloaded page.
    pub fn annotate(&self, url: &str, html: &str) -> Result<Vec<String>, AnnotationError> {
        let text = extract_text(html);
        if text.trim().is_empty() {
            return Err(AnnotationError::EmptyText {
                url: url.to_owned(),
            });
        }
        let tokens = self.tokenizer.tokenize(&text);
        if tokens.is_empty() {
            return Err(AnnotationError::NoTokens {
                url: url.to_owned(),
            });
        }
        Ok(tokens)
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(tel) = &self.telemetry {
            let _ = tel.log(level, message, metadata);
        }
    }
}

#[async_trait]
impl DocumentReader for HttpDocumentReader {
    async fn read(&self, url: &str) -> Result<Vec<String>, ReaderError> {
        let html = match self.fetch(url).await {
            Ok(html) => html,
            Err(err) => {
                self.log(
                    LogLevel::Warn,
                    "reader.fetch.failed",
                    json!({ "url": url, "error": err.to_string() }),
                );
                return Err(err.into());
            }
        };
        let tokens = self.annotate(url, &html)?;
        self.log(
            LogLevel::Debug,
            "reader.document.tokenized",
            json!({ "url": url, "bytes": html.len(), "tokens": tokens.len() }),
        );
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serves one canned HTTP response and returns the url to request.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0_u8; 4096];
            let _ = socket.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/article")
    }

    fn reader() -> HttpDocumentReader {
        HttpDocumentReader::new(&ReaderConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn reads_and_tokenizes_a_page() {
        let url = serve_once(
            "200 OK",
            "<html><body><h1>Gatos</h1><p>O gato subiu 30 % no ranking.</p></body></html>",
        )
        .await;
        let tokens = reader().read(&url).await.unwrap();
        assert_eq!(tokens, vec!["gatos", "gato", "subiu", "30%", "ranking"]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let url = serve_once("404 Not Found", "missing").await;
        let err = reader().read(&url).await.unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Fetch(FetchError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn empty_pages_and_stopword_pages_are_annotation_errors() {
        let reader = reader();
        assert!(matches!(
            reader.annotate("http://a", "<html><body><div>menu</div></body></html>"),
            Err(AnnotationError::EmptyText { .. })
        ));
        assert!(matches!(
            reader.annotate("http://a", "<p>o a de que e</p>"),
            Err(AnnotationError::NoTokens { .. })
        ));
    }
}
