//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main loop over parent units, including:
//! - Skipping units completed by earlier sessions
//! - Paginating each unit through the persistent deduplicator
//! - Checkpointing history after every unit
//! - A single retry pass over failed units
//! - Cooldowns, interruption and the final report

use crate::config::Config;
use crate::crawler::dedup::HistoryLedger;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::pacer::Pacer;
use crate::crawler::paginator::{Completion, PaginationPolicy, Paginator};
use crate::crawler::parser::MatchRule;
use crate::output::{CrawlReport, NullSink, OutputSink, SessionLog};
use crate::state::{FailedUnit, UnitState};
use crate::storage::{CrawlHistory, HistoryStore, RunStatus};
use crate::url::{ListingTemplate, PageLocator, ParentId};
use crate::HarvestError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a single attempt at a unit ended
#[derive(Debug)]
enum UnitOutcome {
    Completed,
    Failed(FailedUnit),
}

/// Main crawler coordinator structure
///
/// Owns the fetcher and the history store exclusively for the duration of
/// a run. Units are processed strictly one after another.
pub struct Coordinator<F, P> {
    config: Arc<Config>,
    fetcher: F,
    pacer: P,
    store: Box<dyn HistoryStore>,
    history: CrawlHistory,
    sink: Box<dyn OutputSink>,
    session_log: Option<SessionLog>,
    config_hash: String,
    shutdown: CancellationToken,
    listing: ListingTemplate,
    rule: MatchRule,
    policy: PaginationPolicy,
    attempted: u32,
}

impl<F, P> Coordinator<F, P>
where
    F: PageFetcher,
    P: Pacer,
{
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `fetcher` - The opened page fetcher
    /// * `pacer` - Pacing between requests
    /// * `store` - Where the history is loaded from and persisted to
    /// * `fresh` - Ignore the stored history and start empty
    pub fn new(
        config: Config,
        fetcher: F,
        pacer: P,
        store: Box<dyn HistoryStore>,
        fresh: bool,
    ) -> Result<Self, HarvestError> {
        let history = if fresh {
            tracing::info!("Starting fresh, ignoring history at {}", store.location());
            CrawlHistory::new()
        } else {
            store.load()?
        };

        Ok(Self::from_history(config, fetcher, pacer, store, history))
    }

    /// Creates a coordinator around an already loaded history
    pub fn from_history(
        config: Config,
        fetcher: F,
        pacer: P,
        store: Box<dyn HistoryStore>,
        history: CrawlHistory,
    ) -> Self {
        tracing::info!(
            "History at {}: {} events processed, {} profiles known",
            store.location(),
            history.processed_count(),
            history.child_count()
        );

        Self {
            listing: ListingTemplate::new(config.source.listing_url.as_str()),
            rule: MatchRule::profiles(&config.source),
            policy: PaginationPolicy::for_parents(&config),
            config: Arc::new(config),
            fetcher,
            pacer,
            store,
            history,
            sink: Box::new(NullSink),
            session_log: None,
            config_hash: String::new(),
            shutdown: CancellationToken::new(),
            attempted: 0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_session_log(mut self, log: SessionLog) -> Self {
        self.session_log = Some(log);
        self
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Uses `token` to stop the run between units
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn history(&self) -> &CrawlHistory {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one session over `parents`
    ///
    /// Parents are attempted in input order; duplicates collapse to their
    /// first occurrence and parents completed by earlier sessions are
    /// skipped without a fetch. Failures are retried once after the sweep.
    pub async fn run(&mut self, parents: &[ParentId]) -> Result<CrawlReport, HarvestError> {
        let mut report = CrawlReport::new(Utc::now());
        let children_before = self.history.child_count();
        let run = self.history.begin_run(&self.config_hash);
        self.persist()?;

        let mut queued = HashSet::new();
        let mut pending = Vec::new();
        for parent in parents {
            if !queued.insert(parent) {
                continue;
            }
            if self.history.is_processed(parent) {
                tracing::debug!("Skipping already processed event {}", parent);
                report.skipped += 1;
                continue;
            }
            pending.push(parent.clone());
        }

        tracing::info!(
            "Starting session: {} events to crawl, {} already processed",
            pending.len(),
            report.skipped
        );
        self.note(&format!(
            "Session started: {} events queued, {} skipped",
            pending.len(),
            report.skipped
        ));

        let mut interrupted = false;
        let mut failures = Vec::new();

        for (index, parent) in pending.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                interrupted = true;
                report.not_attempted = pending.len() - index;
                break;
            }

            let state = UnitState::Pending.transition(UnitState::InProgress)?;
            match self.attempt(parent, state, 1).await? {
                UnitOutcome::Completed => report.processed_this_run += 1,
                UnitOutcome::Failed(unit) => failures.push(unit),
            }
        }

        let (retryable, permanent): (Vec<_>, Vec<_>) =
            failures.into_iter().partition(|unit| unit.retryable);
        report.failed.extend(permanent);

        if !retryable.is_empty() && !interrupted {
            tracing::info!("Retrying {} failed events", retryable.len());
        }

        for unit in retryable {
            if interrupted || self.shutdown.is_cancelled() {
                interrupted = true;
                report.failed.push(unit);
                continue;
            }

            let state = unit.state().transition(UnitState::InProgress)?;
            match self.attempt(&unit.parent, state, unit.attempts + 1).await? {
                UnitOutcome::Completed => report.processed_this_run += 1,
                UnitOutcome::Failed(still_failing) => report.failed.push(still_failing),
            }
        }

        report.status = if interrupted {
            tracing::warn!("Session interrupted, progress saved");
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        report.finished_at = Some(Utc::now());
        report.total_processed = self.history.processed_count();
        report.total_children = self.history.child_count();
        report.new_children = report.total_children.saturating_sub(children_before);

        self.history.finish_run(
            run,
            report.status,
            report.processed_this_run,
            report.new_children,
        );
        self.persist()?;

        if let Some(log) = &self.session_log {
            if let Err(e) = log.record_report(&report) {
                tracing::warn!("Failed to write session log: {}", e);
            }
        }

        Ok(report)
    }

    /// Closes the fetcher
    pub async fn shutdown(&self) -> Result<(), HarvestError> {
        self.fetcher.close().await?;
        Ok(())
    }

    /// Attempts one unit and checkpoints the result
    async fn attempt(
        &mut self,
        parent: &ParentId,
        state: UnitState,
        attempt: u32,
    ) -> Result<UnitOutcome, HarvestError> {
        self.cooldown_if_due().await;
        self.attempted += 1;

        tracing::info!("Crawling event {} (attempt {})", parent, attempt);

        let locator = match PageLocator::for_parent(&self.listing, parent) {
            Ok(locator) => locator,
            Err(e) => {
                return self.fail(parent, state, e.to_string(), false, attempt);
            }
        };

        let result = {
            let paginator = Paginator::new(&self.fetcher, &self.pacer, self.policy.clone());
            let mut ledger = HistoryLedger::new(&mut self.history, parent);
            paginator.paginate(&locator, &self.rule, &mut ledger).await
        };

        match result {
            Ok(outcome) => match outcome.completion {
                Completion::Exhaustive => {
                    state.transition(UnitState::Completed)?;
                    self.history.mark_processed(parent);
                    self.persist()?;
                    self.publish();

                    let new_children = outcome.children.len();
                    tracing::info!(
                        "Completed event {}: {} new profiles over {} pages",
                        parent,
                        new_children,
                        outcome.pages_fetched
                    );
                    self.note(&format!(
                        "Completed {}: {} new profiles",
                        parent, new_children
                    ));

                    Ok(UnitOutcome::Completed)
                }
                Completion::Partial(reason) => self.fail(
                    parent,
                    state,
                    format!("stopped early: {}", reason),
                    true,
                    attempt,
                ),
            },
            Err(e) => {
                let retryable = e.is_transient();
                self.fail(parent, state, e.to_string(), retryable, attempt)
            }
        }
    }

    /// Records a failed attempt; progress made before the failure is kept
    fn fail(
        &mut self,
        parent: &ParentId,
        state: UnitState,
        reason: String,
        retryable: bool,
        attempt: u32,
    ) -> Result<UnitOutcome, HarvestError> {
        state.transition(UnitState::Failed)?;
        self.persist()?;
        self.publish();

        tracing::warn!("Event {} failed: {}", parent, reason);
        self.note(&format!("Failed {}: {}", parent, reason));

        let mut unit = FailedUnit::new(parent.clone(), reason, retryable);
        unit.attempts = attempt;
        Ok(UnitOutcome::Failed(unit))
    }

    async fn cooldown_if_due(&self) {
        let every = self.config.crawler.cooldown_every_n_parents;
        if every > 0 && self.attempted > 0 && self.attempted % every == 0 {
            tracing::debug!("Cooldown after {} events", self.attempted);
            self.pacer.cooldown().await;
        }
    }

    fn persist(&mut self) -> Result<(), HarvestError> {
        self.store.persist(&self.history)?;
        Ok(())
    }

    fn publish(&mut self) {
        if let Err(e) = self.sink.publish(&self.history) {
            tracing::warn!("Failed to publish output: {}", e);
        }
    }

    fn note(&self, message: &str) {
        if let Some(log) = &self.session_log {
            if let Err(e) = log.record(message) {
                tracing::warn!("Failed to write session log: {}", e);
            }
        }
    }
}
