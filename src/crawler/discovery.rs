//! Event discovery
//!
//! Walks the configured event listing with the same paginator used for
//! attendee listings, deduplicating in memory, under a wall-clock ceiling.

use crate::config::Config;
use crate::crawler::dedup::SeenSet;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::pacer::Pacer;
use crate::crawler::paginator::{Completion, PaginationPolicy, Paginator, PartialReason};
use crate::crawler::parser::MatchRule;
use crate::url::{ListingTemplate, PageLocator, ParentId};
use crate::FetchError;
use std::collections::HashSet;

/// Events found on the event listing
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    /// Events in the order the listing linked to them
    pub parents: Vec<ParentId>,

    pub completion: Completion,

    /// The fault that ended the walk, if any
    pub fault: Option<FetchError>,
}

/// Walks the event listing and returns the events it links to
///
/// Returns an empty outcome when no `events-url` is configured. A page that
/// keeps failing ends the walk early, the same way the time limit does:
/// events found on earlier pages are kept.
pub async fn discover_parents<F, P>(config: &Config, fetcher: &F, pacer: &P) -> DiscoveryOutcome
where
    F: PageFetcher + ?Sized,
    P: Pacer + ?Sized,
{
    let Some(events_url) = &config.source.events_url else {
        tracing::debug!("No events-url configured, skipping discovery");
        return DiscoveryOutcome {
            parents: Vec::new(),
            completion: Completion::Exhaustive,
            fault: None,
        };
    };

    let locator = PageLocator::unkeyed(&ListingTemplate::new(events_url.as_str()));
    let rule = MatchRule::events(&config.source);
    let paginator = Paginator::new(fetcher, pacer, PaginationPolicy::for_discovery(config));
    let mut seen = SeenSet::new();

    tracing::info!("Discovering events from {}", locator.describe());
    match paginator.paginate(&locator, &rule, &mut seen).await {
        Ok(outcome) => {
            match outcome.completion {
                Completion::Exhaustive => tracing::info!(
                    "Discovered {} events across {} pages",
                    outcome.children.len(),
                    outcome.pages_fetched
                ),
                Completion::Partial(reason) => tracing::warn!(
                    "Event discovery stopped early ({}), {} events found",
                    reason,
                    outcome.children.len()
                ),
            }

            DiscoveryOutcome {
                parents: outcome.children,
                completion: outcome.completion,
                fault: None,
            }
        }
        Err(e) => {
            tracing::warn!(
                "Event discovery stopped early ({}), keeping {} events found",
                e,
                seen.len()
            );

            DiscoveryOutcome {
                parents: seen.into_ids(),
                completion: Completion::Partial(PartialReason::Fault),
                fault: Some(e),
            }
        }
    }
}

/// Builds the parent sequence for a run: configured seeds first, then
/// discovered events, duplicates collapsed to their first occurrence
///
/// Seeds that are not valid URLs are skipped with a warning.
pub fn plan_parents(config: &Config, discovered: &[ParentId]) -> Vec<ParentId> {
    let mut seen = HashSet::new();
    let mut plan = Vec::new();

    let seeds = config
        .crawler
        .parents
        .iter()
        .filter_map(|raw| match ParentId::parse(raw) {
            Ok(parent) => Some(parent),
            Err(e) => {
                tracing::warn!("Skipping seed event {}: {}", raw, e);
                None
            }
        });

    for parent in seeds.chain(discovered.iter().cloned()) {
        if seen.insert(parent.clone()) {
            plan.push(parent);
        }
    }

    plan
}
