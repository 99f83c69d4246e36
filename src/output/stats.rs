//! Statistics generation from the crawl history
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from a stored history.

use crate::storage::{CrawlHistory, RunRecord};
use crate::url::ParentId;

/// How many events to list in the per-event breakdown
const TOP_EVENTS: usize = 10;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Number of fully processed events
    pub processed_events: usize,

    /// Number of unique profiles discovered
    pub unique_profiles: usize,

    /// Processed events that yielded no new profile
    pub events_without_profiles: usize,

    /// Events with profiles on record that never completed
    pub incomplete_events: usize,

    /// Events with the most attributed profiles, descending
    pub top_events: Vec<(ParentId, usize)>,

    /// Number of recorded sessions
    pub total_runs: usize,

    pub last_run: Option<RunRecord>,
}

/// Loads statistics from a history
pub fn load_statistics(history: &CrawlHistory) -> HarvestStatistics {
    let events_without_profiles = history
        .processed_parents()
        .iter()
        .filter(|parent| history.children_of(parent).is_empty())
        .count();

    let incomplete_events = history
        .parent_results()
        .iter()
        .filter(|(parent, children)| !children.is_empty() && !history.is_processed(parent))
        .count();

    let mut top_events: Vec<_> = history
        .parent_results()
        .iter()
        .map(|(parent, children)| (parent.clone(), children.len()))
        .filter(|(_, count)| *count > 0)
        .collect();
    top_events.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_events.truncate(TOP_EVENTS);

    HarvestStatistics {
        processed_events: history.processed_count(),
        unique_profiles: history.child_count(),
        events_without_profiles,
        incomplete_events,
        top_events,
        total_runs: history.runs().len(),
        last_run: history.last_run().cloned(),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Events processed: {}", stats.processed_events);
    println!("  Unique profiles: {}", stats.unique_profiles);
    println!("  Events with no new profiles: {}", stats.events_without_profiles);
    println!("  Incomplete events: {}", stats.incomplete_events);
    println!();

    if !stats.top_events.is_empty() {
        println!("Top Events by Profiles:");
        for (parent, count) in &stats.top_events {
            println!("  {}: {}", parent, count);
        }
        println!();
    }

    println!("Sessions: {}", stats.total_runs);
    if let Some(run) = &stats.last_run {
        println!(
            "Last session: {} ({}), {} events, {} new profiles",
            run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            run.status.as_str(),
            run.parents_processed,
            run.children_discovered
        );
    }
}
