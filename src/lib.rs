//! Attendee-Harvest: a resumable event attendee crawler
//!
//! This crate walks a session-gated, paginated source one event at a time,
//! collecting attendee profile URLs. Progress is checkpointed after every
//! event so an interrupted run resumes without re-fetching completed work.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod url;

use thiserror::Error;

/// Main error type for Attendee-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("History error: {0}")]
    History(#[from] storage::HistoryError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::UnitState,
        to: state::UnitState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Faults raised by the fetch capability
///
/// Transient faults (timeouts, temporary unavailability) may succeed when
/// retried; permanent faults abort the current unit.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Transient failure fetching {locator}: {message}")]
    Transient { locator: String, message: String },

    #[error("Permanent failure fetching {locator}: {message}")]
    Permanent { locator: String, message: String },
}

impl FetchError {
    pub fn transient(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            locator: locator.into(),
            message: message.into(),
        }
    }

    pub fn permanent(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Session acquisition errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No session cookie configured (set HARVEST_SESSION_COOKIE or session.cookie-file)")]
    MissingCredentials,

    #[error("Failed to read cookie file {path}: {message}")]
    CookieFile { path: String, message: String },

    #[error("Failed to build session client: {0}")]
    Client(String),

    #[error("Session rejected after {attempts} attempts: {reason}")]
    Rejected { attempts: u32, reason: String },
}

/// Errors raised while extracting links from fetched content
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use state::{FailedUnit, UnitState};
pub use storage::CrawlHistory;
pub use crate::url::{normalize_url, ChildId, ParentId};
