use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use secrecy::SecretString;
use std::path::PathBuf;

use feedsink::config::Config;
use feedsink::pipeline::{IngestConfig, Orchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "feedsink",
    version,
    about = "Fetch every feed listed in an OPML file and store its entries",
    after_help = "Example: feedsink -s subscriptions.opml -d sqlite://feeds.db"
)]
struct Args {
    /// OPML subscription file
    #[arg(short, long, value_name = "FILE")]
    source: Option<PathBuf>,

    /// Storage connection string (sqlite URL or file path)
    #[arg(short, long, value_name = "URL", env = "DATABASE_URL", hide_env_values = true)]
    database: Option<String>,

    /// TOML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of feeds processed at once (overrides the config file)
    #[arg(short = 'j', long, value_name = "N")]
    concurrency: Option<usize>,
}

/// Loads settings and applies CLI overrides. Returns `None` when either the
/// OPML source or a storage connection string is missing.
fn resolve_run(args: Args) -> Result<Option<IngestConfig>> {
    let mut settings = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
        settings.validate().context("Invalid --concurrency")?;
    }

    let database_url = args.database.or_else(|| settings.database_url.clone());

    let (Some(source), Some(database_url)) = (args.source, database_url) else {
        return Ok(None);
    };

    Ok(Some(IngestConfig {
        source,
        database_url: SecretString::from(database_url),
        settings,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feedsink=info")),
        )
        .init();

    let args = Args::parse();

    // Missing inputs print usage and do no work; this is not an error.
    let Some(config) = resolve_run(args)? else {
        Args::command()
            .print_help()
            .context("Failed to print usage")?;
        println!();
        return Ok(());
    };

    let orchestrator = Orchestrator::open(config)
        .await
        .context("Failed to open storage")?;

    let result = orchestrator.run().await;
    orchestrator.close().await;

    let summary = result.context("Ingestion run aborted")?;
    println!("{}", summary);
    Ok(())
}
