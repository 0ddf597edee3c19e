use anyhow::Context;
use clap::{Parser, ValueEnum};
use news_digest::{DigestConfig, NewsAggregator};
#[cfg(test)]
use news_digest::PublishConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Build a keyword-filtered news digest from syndicated feeds
#[derive(Debug, Parser)]
#[command(name = "news-digest", version)]
struct Cli {
    /// Output file, overwritten on every run
    #[arg(short, long, env = "DIGEST_OUTPUT")]
    output: Option<PathBuf>,

    /// Maximum number of items in the digest
    #[arg(long, env = "DIGEST_MAX_ITEMS")]
    max_items: Option<usize>,

    /// Feed URL, in priority order (replaces the built-in list)
    #[arg(long = "feed", env = "DIGEST_FEEDS", value_delimiter = ',')]
    feeds: Vec<String>,

    /// Keyword to match (replaces the built-in list)
    #[arg(long = "keyword", env = "DIGEST_KEYWORDS", value_delimiter = ',')]
    keywords: Vec<String>,

    /// Image used when no picture can be found or uploaded
    #[arg(long, env = "DIGEST_PLACEHOLDER")]
    placeholder: Option<String>,

    /// Feed service request timeout in seconds
    #[arg(long, env = "DIGEST_FETCH_TIMEOUT")]
    fetch_timeout: Option<u64>,

    /// Image upload timeout in seconds
    #[arg(long, env = "DIGEST_PUBLISH_TIMEOUT")]
    publish_timeout: Option<u64>,

    #[arg(long, value_enum, default_value = "pretty", env = "LOG_FORMAT")]
    log_format: LogFormat,
}

impl Cli {
    fn apply(self, config: &mut DigestConfig) {
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(max_items) = self.max_items {
            config.max_items = max_items;
        }
        if !self.feeds.is_empty() {
            config.feeds = self.feeds;
        }
        if !self.keywords.is_empty() {
            config.keywords = self.keywords;
        }
        if let Some(placeholder) = self.placeholder {
            config.placeholder_image = placeholder;
        }
        if let Some(seconds) = self.fetch_timeout {
            config.fetch.timeout_seconds = seconds;
        }
        if let Some(seconds) = self.publish_timeout {
            config.publish.timeout_seconds = seconds;
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: DigestConfig) -> anyhow::Result<()> {
    let aggregator = NewsAggregator::new(&config).context("invalid configuration")?;
    let run = aggregator
        .run()
        .await
        .with_context(|| format!("failed to write {}", config.output_path.display()))?;

    info!(
        run_id = %run.run_id,
        items = run.items.len(),
        published = run.stats.published,
        "Digest complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loads `.env` too, so it must precede parsing for env-backed options.
    let mut config = DigestConfig::from_env();
    let cli = Cli::parse();
    init_logging(cli.log_format);
    cli.apply(&mut config);

    info!("Starting news digest");
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
