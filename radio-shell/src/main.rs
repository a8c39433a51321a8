//! radio-shell - Run the Radiocast section shell against live endpoints

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use libradiocast::config::Config;
use libradiocast::document::{require_element, Document, HeadlessDocument};
use libradiocast::feed::FeedClient;
use libradiocast::fetch::HttpFetcher;
use libradiocast::logging::{LogFormat, LoggingConfig};
use libradiocast::media::HeadlessStreamEngine;
use libradiocast::shell::{Shell, DEFAULT_HOST_PAGE};
use libradiocast::{CardRecord, RadiocastError, Result, SectionId};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "radio-shell")]
#[command(version)]
#[command(about = "Load Radiocast sections into a headless page", long_about = None)]
struct Cli {
    /// Section to display after boot (defaults to the configured section)
    #[arg(short, long)]
    section: Option<String>,

    /// Print the programme feed cards instead of loading a section
    #[arg(long, conflicts_with = "section")]
    cards: bool,

    /// Configuration file (defaults to RADIOCAST_CONFIG or the XDG location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Log format (text, json or pretty)
    #[arg(long, env = "RADIOCAST_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = RadiocastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(RadiocastError::InvalidInput(format!(
                "Invalid format '{}'. Valid options: text, json",
                other
            ))),
        }
    }
}

#[derive(Serialize)]
struct SectionOutput {
    section: Option<String>,
    generation: Option<u64>,
    markup: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse()?;
    let log_format: LogFormat = cli
        .log_format
        .parse()
        .map_err(RadiocastError::InvalidInput)?;
    LoggingConfig::new(log_format, "warn".to_string(), cli.verbose).init();

    let section = cli.section.map(SectionId::new).transpose()?;

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_default()?,
    };

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);

    if cli.cards {
        let cards = FeedClient::new(fetcher, config.feed.url.clone())
            .fetch_cards()
            .await?;
        print_cards(&cards, format)?;
        return Ok(());
    }

    let document = Arc::new(HeadlessDocument::from_markup(DEFAULT_HOST_PAGE)?);
    let shell = Shell::new(
        &config,
        document.clone(),
        fetcher,
        Arc::new(HeadlessStreamEngine::unsupported()),
    )?;

    match (shell.boot().await, section) {
        (Ok(_), Some(section)) if shell.displayed().section.as_ref() != Some(&section) => {
            shell.load(section, None).await?;
        }
        (Err(e), Some(section)) => {
            tracing::warn!(error = %e, "Default section failed to load");
            shell.load(section, None).await?;
        }
        (result, _) => {
            result?;
        }
    }
    shell.settle().await;

    let container = require_element(document.as_ref(), &config.shell.container_id)?;
    let displayed = shell.displayed();
    let output = SectionOutput {
        section: displayed.section.map(String::from),
        generation: displayed.token.map(|t| t.generation()),
        markup: document.inner_markup(container)?,
    };
    print_section(&output, format)
}

fn print_cards(cards: &[CardRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(&cards)?),
        OutputFormat::Text => {
            for card in cards {
                let target = if card.is_actionable() {
                    card.target_url.as_str()
                } else {
                    "-"
                };
                println!("{}\t{}\t{}", card.title, card.image_url, target);
            }
        }
    }
    Ok(())
}

fn print_section(output: &SectionOutput, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(output)?),
        OutputFormat::Text => {
            println!("section: {}", output.section.as_deref().unwrap_or("-"));
            println!("{}", output.markup);
        }
    }
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RadiocastError::InvalidInput(format!("Failed to encode output: {}", e)))
}
