//! Crawler module for session-gated listing crawls
//!
//! This module contains the core crawling logic, including:
//! - Session verification and HTTP fetching
//! - Link extraction and deduplication
//! - Page-by-page pagination with pacing and in-place retries
//! - Event discovery and overall crawl coordination

mod coordinator;
mod dedup;
mod discovery;
mod fetcher;
mod pacer;
mod paginator;
mod parser;
mod session;

pub use coordinator::Coordinator;
pub use dedup::{Deduplicator, HistoryLedger, SeenSet};
pub use discovery::{discover_parents, plan_parents, DiscoveryOutcome};
pub use fetcher::{build_http_client, HttpFetcher, PageContent, PageFetcher};
pub use pacer::{BackoffPolicy, Pacer};
pub use paginator::{
    Completion, PaginationOutcome, PaginationPolicy, Paginator, PartialReason,
};
pub use parser::{extract_links, Listing, MatchRule};
pub use session::{
    is_login_wall, load_cookie_header, CookieSession, SessionHandle, SessionProvider,
    SESSION_COOKIE_ENV,
};

use crate::config::Config;
use crate::output::{CrawlReport, CsvExport, SessionLog};
use crate::storage::open_history;
use crate::HarvestError;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Options for one harvest session
#[derive(Debug, Clone, Default)]
pub struct HarvestOptions {
    /// Start from an empty history
    pub fresh: bool,

    /// Hash of the configuration, stored on the run record
    pub config_hash: String,

    /// Cancelled to stop between events
    pub shutdown: CancellationToken,
}

/// Runs a complete harvest session
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Load the history (before anything touches the network)
/// 2. Verify the stored session
/// 3. Open the HTTP fetcher
/// 4. Discover events and merge them with the configured seeds
/// 5. Crawl every event not processed by an earlier session
/// 6. Close the fetcher and return the report
///
/// A discovery cut short by a fault still contributes the events it found.
pub async fn harvest<S: SessionProvider + ?Sized>(
    config: Config,
    session: &S,
    options: HarvestOptions,
) -> Result<CrawlReport, HarvestError> {
    let (store, history) = open_history(Path::new(&config.output.history_path), options.fresh)?;

    let handle = session.ensure_authenticated().await?;
    let fetcher = HttpFetcher::open(&config.client, &handle)?;
    let pacer = BackoffPolicy::from_config(&config.pacing);

    let discovery = discover_parents(&config, &fetcher, &pacer).await;
    let parents = plan_parents(&config, &discovery.parents);

    let sink = CsvExport::new(&config.output.csv_path);
    let log = SessionLog::new(&config.output.log_path);

    let mut coordinator = Coordinator::from_history(config, fetcher, pacer, Box::new(store), history)
        .with_sink(Box::new(sink))
        .with_session_log(log)
        .with_config_hash(options.config_hash)
        .with_cancellation(options.shutdown);

    let result = coordinator.run(&parents).await;

    if let Err(e) = coordinator.shutdown().await {
        tracing::warn!("Failed to close fetcher: {}", e);
    }

    result
}
