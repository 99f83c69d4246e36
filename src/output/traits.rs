//! Output sink traits and types
//!
//! This module defines the trait interface for output sinks and the
//! report produced at the end of a crawl.

use crate::state::FailedUnit;
use crate::storage::{CrawlHistory, RunStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives the crawl history after every completed or failed unit
///
/// Sinks render from the full history rather than from deltas, so a
/// publish after a crash reproduces everything recorded so far.
pub trait OutputSink: Send {
    fn publish(&mut self, history: &CrawlHistory) -> OutputResult<()>;
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn publish(&mut self, _history: &CrawlHistory) -> OutputResult<()> {
        Ok(())
    }
}

/// Summary of one crawl session
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,

    /// Parents completed during this session
    pub processed_this_run: usize,

    /// Parents skipped because an earlier session completed them
    pub skipped: usize,

    /// Parents left untouched because the session was interrupted
    pub not_attempted: usize,

    /// Parents completed across all sessions
    pub total_processed: usize,

    /// Unique children across all sessions
    pub total_children: usize,

    /// Children first discovered during this session
    pub new_children: usize,

    /// Parents still failing after the retry pass, with reasons
    pub failed: Vec<FailedUnit>,
}

impl CrawlReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            status: RunStatus::Running,
            processed_this_run: 0,
            skipped: 0,
            not_attempted: 0,
            total_processed: 0,
            total_children: 0,
            new_children: 0,
            failed: Vec::new(),
        }
    }

    /// Returns true if no parent failed and nothing was left unattempted
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.not_attempted == 0
    }

    /// Session duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}
