//! Run orchestration: schema, OPML extraction, then fetch → parse → store
//! for every feed URL.
//!
//! A run only fails as a whole when storage cannot be prepared or the OPML
//! file yields no URL list. Everything after that is isolated per URL (fetch
//! and parse failures) or per entry (write failures), logged, and counted in
//! the returned [`RunSummary`].

use futures::stream::{self, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;
use crate::feed::{
    extract_urls, parse_feed, FeedSource, FetchError, Fetcher, OpmlError, ParseError,
};
use crate::storage::{Database, StorageError, StoreReport};

/// Fatal run errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Opml(#[from] OpmlError),
}

/// Everything a run needs, resolved up front by the caller.
#[derive(Debug)]
pub struct IngestConfig {
    pub source: PathBuf,
    pub database_url: SecretString,
    pub settings: Config,
}

/// Run phases, logged as the orchestrator moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SchemaReady,
    Extracting,
    Processing,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::SchemaReady => "schema-ready",
            RunState::Extracting => "extracting",
            RunState::Processing => "processing",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a single URL ended.
#[derive(Debug)]
pub enum UrlOutcome {
    Stored(StoreReport),
    FetchFailed(FetchError),
    ParseFailed(ParseError),
    StoreFailed(StorageError),
}

/// Counts for one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds_attempted: usize,
    pub feeds_succeeded: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    pub store_failures: usize,
    pub entries_seen: usize,
    pub entries_stored: usize,
    pub entries_duplicate: usize,
    pub entries_failed: usize,
}

impl RunSummary {
    pub fn feeds_failed(&self) -> usize {
        self.fetch_failures + self.parse_failures + self.store_failures
    }

    fn record(&mut self, outcome: &UrlOutcome) {
        self.feeds_attempted += 1;
        match outcome {
            UrlOutcome::Stored(report) => {
                self.feeds_succeeded += 1;
                self.entries_seen += report.attempted();
                self.entries_stored += report.inserted;
                self.entries_duplicate += report.duplicates;
                self.entries_failed += report.failed;
            }
            UrlOutcome::FetchFailed(_) => self.fetch_failures += 1,
            UrlOutcome::ParseFailed(_) => self.parse_failures += 1,
            UrlOutcome::StoreFailed(_) => self.store_failures += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} feeds attempted ({} ok, {} failed); {} entries seen, {} stored, {} already present, {} failed",
            self.feeds_attempted,
            self.feeds_succeeded,
            self.feeds_failed(),
            self.entries_seen,
            self.entries_stored,
            self.entries_duplicate,
            self.entries_failed
        )
    }
}

/// Composes the extractor, fetcher, parser and storage gateway.
pub struct Orchestrator {
    source: PathBuf,
    concurrency: usize,
    fetcher: Fetcher,
    db: Database,
}

impl Orchestrator {
    /// Build the HTTP client and open the storage pool.
    pub async fn open(config: IngestConfig) -> Result<Self, PipelineError> {
        let fetcher = Fetcher::new(&config.settings).map_err(PipelineError::Client)?;
        let db = Database::open(
            config.database_url.expose_secret(),
            config.settings.max_connections,
        )
        .await?;

        Ok(Self {
            source: config.source,
            concurrency: config.settings.concurrency.max(1),
            fetcher,
            db,
        })
    }

    /// Assemble from parts that are already open.
    pub fn from_parts(source: PathBuf, concurrency: usize, fetcher: Fetcher, db: Database) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            fetcher,
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Perform one ingestion run.
    ///
    /// # Errors
    ///
    /// Only the fatal cases: schema setup fails, or the OPML file is missing
    /// or malformed. Per-URL and per-entry failures end up in the summary.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let mut state = RunState::Idle;
        tracing::debug!(state = %state, "Starting run");

        self.db.ensure_schema().await?;
        state = transition(state, RunState::SchemaReady);

        state = transition(state, RunState::Extracting);
        let sources = extract_urls(&self.source)?;

        state = transition(state, RunState::Processing);
        let outcomes: Vec<UrlOutcome> = stream::iter(sources)
            .map(|source| self.process_url(source))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for outcome in &outcomes {
            summary.record(outcome);
        }

        transition(state, RunState::Done);
        tracing::info!(
            feeds = summary.feeds_attempted,
            failed_feeds = summary.feeds_failed(),
            stored = summary.entries_stored,
            duplicates = summary.entries_duplicate,
            failed_entries = summary.entries_failed,
            "Run complete"
        );
        Ok(summary)
    }

    /// Fetch, parse and store one feed. Never fails the run.
    pub async fn process_url(&self, source: FeedSource) -> UrlOutcome {
        let url = source.url;

        let document = match self.fetcher.fetch(&url).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Fetch failed, skipping feed");
                return UrlOutcome::FetchFailed(e);
            }
        };

        let feed = match parse_feed(&document.body) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Parse failed, skipping feed");
                return UrlOutcome::ParseFailed(e);
            }
        };
        drop(document);

        tracing::info!(
            url = %url,
            title = feed.title.as_deref().unwrap_or(""),
            entries = feed.entries.len(),
            "Fetched entries"
        );

        match self.db.store_entries(&feed.entries).await {
            Ok(report) => {
                if report.failed > 0 {
                    tracing::warn!(url = %url, failed = report.failed, "Some entries could not be stored");
                }
                UrlOutcome::Stored(report)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Write session failed, skipping feed");
                UrlOutcome::StoreFailed(e)
            }
        }
    }

    /// Close the storage pool.
    pub async fn close(self) {
        self.db.close().await;
    }
}

fn transition(from: RunState, to: RunState) -> RunState {
    tracing::debug!(from = %from, to = %to, "Run state");
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary_records_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(&UrlOutcome::Stored(StoreReport {
            inserted: 2,
            duplicates: 1,
            failed: 1,
        }));
        summary.record(&UrlOutcome::FetchFailed(FetchError::HttpStatus(404)));
        summary.record(&UrlOutcome::ParseFailed(ParseError::Unparsable("bad".into())));

        assert_eq!(
            summary,
            RunSummary {
                feeds_attempted: 3,
                feeds_succeeded: 1,
                fetch_failures: 1,
                parse_failures: 1,
                store_failures: 0,
                entries_seen: 4,
                entries_stored: 2,
                entries_duplicate: 1,
                entries_failed: 1,
            }
        );
        assert_eq!(summary.feeds_failed(), 2);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            feeds_attempted: 2,
            feeds_succeeded: 1,
            fetch_failures: 1,
            entries_seen: 2,
            entries_stored: 2,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "2 feeds attempted (1 ok, 1 failed); 2 entries seen, 2 stored, 0 already present, 0 failed"
        );
    }

    #[test]
    fn test_ingest_config_debug_hides_database_url() {
        let config = IngestConfig {
            source: PathBuf::from("feeds.opml"),
            database_url: SecretString::from("postgres://user:hunter2@db/feeds".to_string()),
            settings: Config::default(),
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_missing_opml_is_fatal_after_schema() {
        let db = Database::open(":memory:", 1).await.unwrap();
        let orchestrator = Orchestrator::from_parts(
            std::env::temp_dir().join("feedsink_pipeline_missing.opml"),
            1,
            Fetcher::new(&Config::default()).unwrap(),
            db,
        );

        let result = orchestrator.run().await;
        assert!(matches!(
            result,
            Err(PipelineError::Opml(OpmlError::NotFound(_)))
        ));
        // Schema step ran before extraction
        assert_eq!(orchestrator.database().count_entries().await.unwrap(), 0);
    }
}
