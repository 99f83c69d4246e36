//! Storage traits and error types
//!
//! This module defines the trait interface for history backends and
//! associated error types.

use crate::storage::CrawlHistory;
use thiserror::Error;

/// Errors that can occur while loading or persisting the crawl history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported history version: {0}")]
    UnsupportedVersion(u64),

    #[error("Malformed history document: {0}")]
    Malformed(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Trait for history backend implementations
///
/// The orchestrator owns exactly one store for the duration of a run and
/// calls `persist` after every unit, so implementations must leave either
/// the previous or the new document behind if the process dies mid-write.
pub trait HistoryStore: Send {
    /// Loads the history, returning an empty one if nothing was stored yet
    fn load(&self) -> HistoryResult<CrawlHistory>;

    /// Replaces the stored history with `history`
    fn persist(&mut self, history: &CrawlHistory) -> HistoryResult<()>;

    /// Where the history lives, for logs
    fn location(&self) -> String;
}
