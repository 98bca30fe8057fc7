use std::process::Stdio;

use async_trait::async_trait;
use serde_json::json;
use shared_logging::LogLevel;
use tokio::process::Command;

use guesser_feedback::{FeedbackTelemetry, Opener};

/// Hands urls to the platform's default browser.
#[derive(Debug, Clone, Default)]
pub struct SystemOpener {
    telemetry: Option<FeedbackTelemetry>,
}

impl SystemOpener {
    /// Creates an opener.
    #[must_use]
    pub const fn new() -> Self {
        Self { telemetry: None }
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: FeedbackTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

/// Platform command that opens `url`.
pub(crate) fn open_command(url: &str) -> Command {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

#[async_trait]
impl Opener for SystemOpener {
    async fn open(&self, url: &str) {
        let outcome = open_command(url).spawn();
        if let (Err(err), Some(tel)) = (&outcome, &self.telemetry) {
            let _ = tel.log(
                LogLevel::Warn,
                "reader.open.failed",
                json!({ "url": url, "error": err.to_string() }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ends_with_the_url() {
        let command = open_command("http://example.com/a b");
        let args: Vec<_> = command.as_std().get_args().collect();
        assert_eq!(
            args.last().and_then(|arg| arg.to_str()),
            Some("http://example.com/a b")
        );
    }
}
