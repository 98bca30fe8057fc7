//! Terminal rendering and line-based answers.

use std::{fmt::Write as _, io::Write as _};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin},
    sync::Mutex,
};

use guesser_feedback::{GuessOutcome, Notice, Prompt, PromptError, Prompter};

/// Terminal width the output is laid out for.
pub const COLUMNS: usize = 80;

/// Shortens `text` to `width` characters, ending in `...` when cut.
pub fn ellipsis(text: &str, width: usize) -> String {
    if width <= 3 || text.chars().count() <= width {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(width - 3).collect();
    cut.push_str("...");
    cut
}

/// Startup banner.
pub fn banner() -> String {
    let rule = format!("+{}+", "-".repeat(COLUMNS - 2));
    let inner = COLUMNS - 2;
    format!(
        "{rule}\n|{:^inner$}|\n|{:^inner$}|\n{rule}",
        "I N T E R E S T   G U E S S E R", "judge a few links and I will learn to guess the rest",
    )
}

/// Question and numbered options, ending in the input marker.
pub fn render_prompt(prompt: &Prompt) -> String {
    let mut out = format!("\n{}\n", prompt.kind.question());
    for (index, choice) in prompt.options.iter().enumerate() {
        let _ = writeln!(out, " {}) {}", index + 1, choice.label());
    }
    out.push_str(": ");
    out
}

/// One-based answer to a zero-based index, if in range.
pub fn parse_choice(input: &str, options: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(answer) if (1..=options).contains(&answer) => Some(answer - 1),
        _ => None,
    }
}

/// Text shown for `notice`.
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Link { title, url } => format!(
            "\n{}\n\n{title}\n{}\n",
            "=".repeat(COLUMNS),
            ellipsis(url, COLUMNS)
        ),
        Notice::Analyzing { url } => format!("Reading {}", ellipsis(url, COLUMNS - 8)),
        Notice::Keywords(keywords) => {
            let mut out =
                String::from("\nTop keywords for this document, according to the corpus:\n");
            for keyword in keywords {
                let _ = writeln!(out, " - {} ({:.4})", keyword.term, keyword.relevancy);
            }
            out
        }
        Notice::Guess(GuessOutcome::Predicted { label }) => {
            format!("\nI guess this document is {label}.")
        }
        Notice::Guess(GuessOutcome::InsufficientData {
            available,
            required,
        }) => format!(
            "\nMe neither. Not enough data to guess yet ({available} of {required} judgments)."
        ),
        Notice::Recorded { label, persisted } => {
            if *persisted {
                format!("Noted: {label}.")
            } else {
                format!("Noted: {label} (not saved).")
            }
        }
        Notice::Failure { url: Some(url), message } => {
            format!("! {}: {message}", ellipsis(url, COLUMNS / 2))
        }
        Notice::Failure { url: None, message } => format!("! {message}"),
    }
}

/// Prompter reading numbered answers line by line; invalid answers are asked again.
pub struct TerminalPrompter<R> {
    lines: Mutex<Lines<BufReader<R>>>,
}

impl TerminalPrompter<Stdin> {
    /// Prompter on standard input.
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin> TerminalPrompter<R> {
    /// Prompter reading answers from `input`.
    pub fn new(input: R) -> Self {
        Self {
            lines: Mutex::new(BufReader::new(input).lines()),
        }
    }
}

#[async_trait]
impl<R> Prompter for TerminalPrompter<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn choose(&self, prompt: &Prompt) -> Result<usize, PromptError> {
        let mut lines = self.lines.lock().await;
        loop {
            print!("{}", render_prompt(prompt));
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                return Err(PromptError::Closed);
            };
            if let Some(index) = parse_choice(&line, prompt.options.len()) {
                return Ok(index);
            }
            println!(
                "Please answer with a number from 1 to {}.",
                prompt.options.len()
            );
        }
    }

    async fn notify(&self, notice: Notice) {
        println!("{}", render_notice(&notice));
    }
}
