//! Storage module for persisting crawl progress
//!
//! This module handles the crawl history, including:
//! - The in-memory history model and its invariants
//! - Versioned JSON persistence with atomic replacement
//! - Migration of the legacy unversioned document
//! - Run tracking and resumption support

mod history;
mod json;
mod traits;

pub use history::{CrawlHistory, RunRecord, RunStatus, HISTORY_VERSION};
pub use json::{decode_history, JsonHistoryStore};
pub use traits::{HistoryError, HistoryResult, HistoryStore};

use std::io::Write;
use std::path::Path;

/// Opens the JSON history store at `path`
///
/// With `fresh` the stored history is ignored and an empty one is returned;
/// the old file is replaced on the first persist.
pub fn open_history(path: &Path, fresh: bool) -> HistoryResult<(JsonHistoryStore, CrawlHistory)> {
    let store = JsonHistoryStore::new(path);
    let history = if fresh {
        CrawlHistory::new()
    } else {
        store.load()?
    };
    Ok((store, history))
}

/// Atomically replaces `path` with `contents`
///
/// The data is written to a temp file in the destination directory and
/// renamed over the target, so readers see either the old or the new file.
pub(crate) fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::ParentId;
    use tempfile::TempDir;

    #[test]
    fn test_run_status_serialization() {
        for status in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let parsed: RunStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_replace_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        replace_file(&path, b"first").unwrap();
        replace_file(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_open_history_fresh_ignores_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut history = CrawlHistory::new();
        history.mark_processed(&ParentId::parse("https://example.com/events/1").unwrap());
        let (mut store, _) = open_history(&path, false).unwrap();
        store.persist(&history).unwrap();

        let (_, resumed) = open_history(&path, false).unwrap();
        assert_eq!(resumed.processed_count(), 1);

        let (_, fresh) = open_history(&path, true).unwrap();
        assert_eq!(fresh.processed_count(), 0);
    }
}
