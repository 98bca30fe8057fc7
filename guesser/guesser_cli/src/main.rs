use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use shared_event_bus::FileEventPublisher;
use shared_logging::LogLevel;
use tokio::runtime::Runtime;

use guesser_corpus::{CorpusStore, Label};
use guesser_feedback::{
    DocumentReader, FeedbackContext, FeedbackTelemetry, GuesserConfig, Notice, QueueDriver,
    QueueReport, SessionController,
};
use guesser_reader::{HttpDocumentReader, JsonLinkSource, SystemOpener};

mod terminal;

use terminal::{banner, render_notice, TerminalPrompter};

#[derive(Parser, Debug)]
#[command(
    name = "guesser",
    version,
    about = "Judge links, and let the guesser learn what you find interesting"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Corpus file, overriding the configured one.
    #[arg(long, global = true)]
    repository: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walks a link file, one interactive session per link.
    Triage {
        /// JSON array of `{ "title": .., "href": .. }` objects.
        #[arg(long)]
        links: PathBuf,
    },
    /// Prints the corpus-wide keywords.
    Keywords {
        /// Number of keywords to display.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Prints corpus and training-log counts.
    Stats,
    /// Guesses whether a page is interesting without storing it.
    Guess {
        /// Page to fetch.
        #[arg(long)]
        url: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = GuesserConfig::load_or_default(cli.config.as_deref())?;
    if let Some(repository) = cli.repository {
        config.repository = repository;
    }
    let runtime = Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        match cli.command {
            Commands::Triage { links } => handle_triage(&config, links).await,
            Commands::Keywords { limit } => handle_keywords(&config, limit).await,
            Commands::Stats => handle_stats(&config).await,
            Commands::Guess { url } => handle_guess(&config, &url).await,
        }
    })
}

fn build_telemetry(config: &GuesserConfig) -> Result<Option<FeedbackTelemetry>> {
    let logging = &config.logging;
    if logging.log_path.is_none() && logging.event_log.is_none() {
        return Ok(None);
    }
    let mut builder = FeedbackTelemetry::builder("guesser").min_level(logging.min_level);
    if let Some(path) = &logging.log_path {
        builder = builder.log_path(path);
    }
    if let Some(path) = &logging.event_log {
        let publisher = FileEventPublisher::new(path)
            .with_context(|| format!("opening event log {}", path.display()))?;
        builder = builder.event_publisher(Arc::new(publisher));
    }
    builder.build().map(Some)
}

async fn open_context(
    config: &GuesserConfig,
    telemetry: Option<FeedbackTelemetry>,
) -> Result<FeedbackContext> {
    FeedbackContext::open(config, telemetry)
        .await
        .with_context(|| format!("loading corpus {}", config.repository.display()))
}

fn build_reader(
    config: &GuesserConfig,
    telemetry: Option<&FeedbackTelemetry>,
) -> Result<HttpDocumentReader> {
    let reader = HttpDocumentReader::new(&config.reader).context("building http client")?;
    Ok(match telemetry {
        Some(tel) => reader.with_telemetry(tel.clone()),
        None => reader,
    })
}

async fn handle_triage(config: &GuesserConfig, links: PathBuf) -> Result<()> {
    println!("{}", banner());
    let telemetry = build_telemetry(config)?;
    let mut context = open_context(config, telemetry.clone()).await?;
    let reader = build_reader(config, telemetry.as_ref())?;
    let opener = match &telemetry {
        Some(tel) => SystemOpener::new().with_telemetry(tel.clone()),
        None => SystemOpener::new(),
    };
    let prompter = TerminalPrompter::stdin();
    let source = JsonLinkSource::new(&links);
    println!(
        "{} documents, {} judgments so far. Now it's time to look at the links...",
        context.store().len(),
        context.store().training_count()
    );

    let report = {
        let controller = SessionController::new(&mut context, &reader, &prompter, &opener);
        QueueDriver::new(controller)
            .run_source(&source)
            .await
            .with_context(|| format!("reading links from {}", links.display()))?
    };

    if let Err(err) = context.close().await {
        println!(
            "{}",
            render_notice(&Notice::Failure {
                url: None,
                message: format!("final save failed: {err}"),
            })
        );
    }
    println!("\n{}", summary(&report));
    if let Some(tel) = &telemetry {
        let _ = tel.log(LogLevel::Info, "guesser.triage.finished", json!(report));
    }
    Ok(())
}

fn summary(report: &QueueReport) -> String {
    let mut line = format!(
        "{} links: {} judged, {} discarded, {} failed, {} skipped, {} guesses shown",
        report.sessions + report.skipped,
        report.judged,
        report.discarded,
        report.failed,
        report.skipped,
        report.guesses
    );
    if report.unsaved > 0 {
        line.push_str(&format!(", {} not saved", report.unsaved));
    }
    if report.interrupted {
        line.push_str(" (input closed early)");
    }
    line
}

async fn handle_keywords(config: &GuesserConfig, limit: usize) -> Result<()> {
    let store = CorpusStore::open(&config.repository)
        .await
        .with_context(|| format!("loading corpus {}", config.repository.display()))?;
    print_lines(&keyword_lines(&store, limit)?);
    Ok(())
}

fn keyword_lines(store: &CorpusStore, limit: usize) -> Result<Vec<String>> {
    if store.is_empty() {
        return Ok(vec!["The corpus is empty.".to_owned()]);
    }
    Ok(store
        .top_keywords(Some(limit))?
        .iter()
        .enumerate()
        .map(|(rank, keyword)| {
            format!("{:>3}. {:<32} {:.4}", rank + 1, keyword.term, keyword.relevancy)
        })
        .collect())
}

async fn handle_stats(config: &GuesserConfig) -> Result<()> {
    let context = open_context(config, None).await?;
    print_lines(&stats_lines(config, &context));
    Ok(())
}

fn stats_lines(config: &GuesserConfig, context: &FeedbackContext) -> Vec<String> {
    let store = context.store();
    let interesting = store
        .training_examples()
        .filter(|example| example.output == Label::Interesting)
        .count();
    vec![
        format!("corpus:      {}", config.repository.display()),
        format!("documents:   {}", store.len()),
        format!(
            "judgments:   {} ({} interesting, {} not interesting)",
            store.training_count(),
            interesting,
            store.training_count() - interesting
        ),
        format!("model terms: {}", context.classifier().weights().len()),
    ]
}

async fn handle_guess(config: &GuesserConfig, url: &str) -> Result<()> {
    print_lines(&guess_lines(config, url).await?);
    Ok(())
}

async fn guess_lines(config: &GuesserConfig, url: &str) -> Result<Vec<String>> {
    let telemetry = build_telemetry(config)?;
    let context = open_context(config, telemetry.clone()).await?;
    let reader = build_reader(config, telemetry.as_ref())?;
    let tokens = reader.read(url).await?;
    let analysis = context.preview(url, tokens)?;
    let outcome = context.guess(&analysis.signature);
    Ok(vec![
        render_notice(&Notice::Keywords(analysis.keywords)),
        render_notice(&Notice::Guess(outcome)),
    ])
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
