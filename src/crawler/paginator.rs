//! Page-by-page walk of a single listing
//!
//! # Termination
//!
//! The walk ends in a terminal pagination state when `max_consecutive_empty`
//! pages in a row yield nothing new, either because they carry the explicit
//! "no results" marker or because every id on them was seen before. A
//! wall-clock ceiling or a page cap may stop it earlier, in which case the
//! outcome is `Partial` and the caller must not treat the unit as complete.

use crate::config::Config;
use crate::crawler::dedup::Deduplicator;
use crate::crawler::fetcher::{PageContent, PageFetcher};
use crate::crawler::pacer::Pacer;
use crate::crawler::parser::{extract_links, Listing, MatchRule};
use crate::state::PaginationState;
use crate::url::{CanonicalId, PageLocator};
use crate::FetchError;
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

/// Termination and retry policy for one listing walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// Consecutive pages without new ids that end the walk
    pub max_consecutive_empty: u32,

    /// In-place retries of a page after a transient fault
    pub page_retries: u32,

    /// New ids that trigger a long pause
    pub pause_every: u32,

    /// Optional cap on fetched pages
    pub max_pages: Option<u32>,

    /// Optional wall-clock ceiling
    pub time_limit: Option<Duration>,
}

impl PaginationPolicy {
    /// Policy for walking an event's attendee listing
    pub fn for_parents(config: &Config) -> Self {
        Self {
            max_consecutive_empty: config.crawler.max_consecutive_empty,
            page_retries: config.crawler.page_retries,
            pause_every: config.pacing.pause_every_n_discoveries,
            max_pages: config.crawler.max_pages,
            time_limit: None,
        }
    }

    /// Policy for walking the event listing during discovery
    pub fn for_discovery(config: &Config) -> Self {
        Self {
            time_limit: Some(Duration::from_secs(config.source.discovery_timeout_secs)),
            max_pages: None,
            ..Self::for_parents(config)
        }
    }
}

/// Why a walk stopped before reaching a terminal pagination state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialReason {
    TimeLimit(Duration),
    PageLimit(u32),

    /// A page kept failing after its in-place retries
    Fault,
}

impl fmt::Display for PartialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeLimit(limit) => write!(f, "time limit of {}s reached", limit.as_secs()),
            Self::PageLimit(pages) => write!(f, "page limit of {} reached", pages),
            Self::Fault => f.write_str("page fetch failed"),
        }
    }
}

/// How a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Terminal pagination state reached
    Exhaustive,

    /// Stopped early; more results may exist
    Partial(PartialReason),
}

impl Completion {
    pub fn is_exhaustive(&self) -> bool {
        matches!(self, Self::Exhaustive)
    }
}

/// Result of one listing walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOutcome<I> {
    /// Ids recorded for the first time, in discovery order
    pub children: Vec<I>,

    pub pages_fetched: u32,

    pub completion: Completion,
}

/// Drives the walk of a listing through a fetcher, pacing every request
pub struct Paginator<'a, F: ?Sized, P: ?Sized> {
    fetcher: &'a F,
    pacer: &'a P,
    policy: PaginationPolicy,
}

impl<'a, F, P> Paginator<'a, F, P>
where
    F: PageFetcher + ?Sized,
    P: Pacer + ?Sized,
{
    pub fn new(fetcher: &'a F, pacer: &'a P, policy: PaginationPolicy) -> Self {
        Self {
            fetcher,
            pacer,
            policy,
        }
    }

    pub fn policy(&self) -> &PaginationPolicy {
        &self.policy
    }

    /// Walks `locator` page by page, recording every matching id in `dedup`
    ///
    /// Ids claimed before a fault stay claimed. The fault itself propagates
    /// once in-place retries are exhausted.
    pub async fn paginate<I, D>(
        &self,
        locator: &PageLocator,
        rule: &MatchRule,
        dedup: &mut D,
    ) -> Result<PaginationOutcome<I>, FetchError>
    where
        I: CanonicalId,
        D: Deduplicator<I> + ?Sized,
    {
        let started = Instant::now();
        let mut state = PaginationState::new();
        let mut children = Vec::new();
        let mut pages_fetched = 0u32;

        let completion = loop {
            if let Some(limit) = self.policy.time_limit {
                if started.elapsed() >= limit {
                    break Completion::Partial(PartialReason::TimeLimit(limit));
                }
            }

            if let Some(max) = self.policy.max_pages {
                if pages_fetched >= max {
                    break Completion::Partial(PartialReason::PageLimit(max));
                }
            }

            let url = locator
                .page(state.page_index)
                .map_err(|e| FetchError::permanent(locator.describe(), e.to_string()))?;

            let content = self.fetch_with_retries(&url).await?;
            pages_fetched += 1;

            let listing = extract_links::<I>(&content, rule).unwrap_or_else(|e| {
                tracing::warn!("Extraction failed on {}: {}", url, e);
                Listing::Links(Vec::new())
            });

            match listing {
                Listing::NoResults => {
                    tracing::debug!("Page {} of {}: no results", state.page_index, locator.describe());
                    state.record_no_results();
                }
                Listing::Links(ids) => {
                    let found = ids.len();
                    let mut new_count = 0u32;
                    for id in ids {
                        if dedup.record(&id) {
                            children.push(id);
                            new_count += 1;
                        }
                    }
                    tracing::debug!(
                        "Page {} of {}: {} links, {} new",
                        state.page_index,
                        locator.describe(),
                        found,
                        new_count
                    );
                    state.record_page(new_count);
                }
            }

            self.pacer.pace().await;

            if state.pause_due(self.policy.pause_every) {
                self.pacer.long_pause().await;
                state.reset_pause_counter();
            }

            if state.is_exhausted(self.policy.max_consecutive_empty) {
                break Completion::Exhaustive;
            }

            state.advance();
        };

        Ok(PaginationOutcome {
            children,
            pages_fetched,
            completion,
        })
    }

    /// Fetches one page, retrying transient faults in place
    async fn fetch_with_retries(&self, url: &Url) -> Result<PageContent, FetchError> {
        let mut retries = 0;
        loop {
            match self.fetcher.fetch(url).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_transient() && retries < self.policy.page_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{} (retry {}/{})",
                        e,
                        retries,
                        self.policy.page_retries
                    );
                    self.pacer.pace().await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
