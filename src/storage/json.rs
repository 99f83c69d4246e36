//! JSON file history backend
//!
//! The document is rewritten in full after every unit through a temp file
//! in the same directory followed by a rename.

use crate::storage::history::{CrawlHistory, HistoryDocument, HISTORY_VERSION};
use crate::storage::replace_file;
use crate::storage::traits::{HistoryError, HistoryResult, HistoryStore};
use crate::url::{ChildId, ParentId};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// History stored as a single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> HistoryResult<CrawlHistory> {
        if !self.path.exists() {
            tracing::debug!("No history at {}, starting empty", self.path.display());
            return Ok(CrawlHistory::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(CrawlHistory::new());
        }

        decode_history(&raw)
    }

    fn persist(&mut self, history: &CrawlHistory) -> HistoryResult<()> {
        let encoded = serde_json::to_vec_pretty(&history.to_document())?;
        replace_file(&self.path, &encoded)?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Decodes a history document of any supported shape
pub fn decode_history(raw: &str) -> HistoryResult<CrawlHistory> {
    let value: Value = serde_json::from_str(raw)?;

    let object = value
        .as_object()
        .ok_or_else(|| HistoryError::Malformed("expected a JSON object".to_string()))?;

    match object.get("version") {
        Some(version) => {
            let version = version.as_u64().ok_or_else(|| {
                HistoryError::Malformed(format!("version is not an integer: {}", version))
            })?;
            if version != u64::from(HISTORY_VERSION) {
                return Err(HistoryError::UnsupportedVersion(version));
            }
            let document: HistoryDocument = serde_json::from_value(value)?;
            Ok(CrawlHistory::from_document(document))
        }
        None if object.contains_key("events") => migrate_legacy(&value),
        None => Err(HistoryError::Malformed(
            "missing version field".to_string(),
        )),
    }
}

/// Migrates the unversioned `{"events": {url: {"profiles": [..]}}}` shape
///
/// Every event in the legacy file was complete, so each becomes a processed
/// parent owning the profiles listed under it.
fn migrate_legacy(value: &Value) -> HistoryResult<CrawlHistory> {
    let events = value
        .get("events")
        .and_then(Value::as_object)
        .ok_or_else(|| HistoryError::Malformed("legacy events is not an object".to_string()))?;

    let mut history = CrawlHistory::new();
    let mut skipped = 0usize;

    for (raw_parent, entry) in events {
        let parent = match ParentId::parse(raw_parent) {
            Ok(parent) => parent,
            Err(e) => {
                tracing::warn!("Dropping legacy event {}: {}", raw_parent, e);
                skipped += 1;
                continue;
            }
        };

        let profiles = entry
            .get("profiles")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for raw_child in profiles.iter().filter_map(Value::as_str) {
            match ChildId::parse(raw_child) {
                Ok(child) => {
                    history.claim_child(&parent, &child);
                }
                Err(e) => {
                    tracing::warn!("Dropping legacy profile {}: {}", raw_child, e);
                    skipped += 1;
                }
            }
        }

        history.mark_processed(&parent);
    }

    tracing::info!(
        "Migrated legacy history: {} events, {} profiles ({} entries dropped)",
        history.processed_count(),
        history.child_count(),
        skipped
    );

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RunStatus;
    use tempfile::TempDir;

    fn parent(n: u32) -> ParentId {
        ParentId::parse(&format!("https://example.com/events/{}", n)).unwrap()
    }

    fn child(name: &str) -> ChildId {
        ChildId::parse(&format!("https://example.com/in/{}", name)).unwrap()
    }

    fn sample_history() -> CrawlHistory {
        let mut history = CrawlHistory::new();
        let run = history.begin_run("deadbeef");
        history.claim_child(&parent(1), &child("a"));
        history.claim_child(&parent(1), &child("b"));
        history.mark_processed(&parent(1));
        history.claim_child(&parent(2), &child("c"));
        history.finish_run(run, RunStatus::Completed, 1, 3);
        history
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));
        let history = store.load().unwrap();
        assert_eq!(history.processed_count(), 0);
        assert_eq!(history.child_count(), 0);
    }

    #[test]
    fn test_persist_reload_twice_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let mut store = JsonHistoryStore::new(&path);

        let history = sample_history();
        store.persist(&history).unwrap();
        let first = store.load().unwrap();
        let first_bytes = std::fs::read(&path).unwrap();

        store.persist(&first).unwrap();
        let second = store.load().unwrap();
        let second_bytes = std::fs::read(&path).unwrap();

        assert_eq!(first, history);
        assert_eq!(second, first);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_persist_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let mut store = JsonHistoryStore::new(&path);
        store.persist(&sample_history()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_persist_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonHistoryStore::new(dir.path().join("history.json"));
        store.persist(&sample_history()).unwrap();
        store.persist(&sample_history()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_document_has_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let mut store = JsonHistoryStore::new(&path);
        store.persist(&sample_history()).unwrap();

        let value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["processed_parents"][0], "https://example.com/events/1");
        assert_eq!(value["runs"][0]["status"], "completed");
    }

    #[test]
    fn test_unknown_version_rejected() {
        let err = decode_history(r#"{"version": 7, "processed_parents": []}"#).unwrap_err();
        assert!(matches!(err, HistoryError::UnsupportedVersion(7)));
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = decode_history(r#"{"processed_parents": []}"#).unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));
    }

    #[test]
    fn test_not_an_object_rejected() {
        let err = decode_history("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, HistoryError::Malformed(_)));
    }

    #[test]
    fn test_corrupt_json_rejected() {
        let err = decode_history("{ not json").unwrap_err();
        assert!(matches!(err, HistoryError::Json(_)));
    }

    #[test]
    fn test_migrate_legacy_shape() {
        let legacy = r#"{
            "events": {
                "https://example.com/events/1/": {
                    "profiles": ["https://example.com/in/a?trk=x", "https://example.com/in/b"]
                },
                "https://example.com/events/2": {
                    "profiles": ["https://example.com/in/b", "https://example.com/in/c"]
                }
            }
        }"#;

        let history = decode_history(legacy).unwrap();
        assert_eq!(history.processed_count(), 2);
        assert_eq!(history.child_count(), 3);
        assert!(history.is_processed(&parent(1)));
        assert!(history.is_known_child(&child("a")));
        assert_eq!(history.children_of(&parent(2)), &[child("c")]);
    }

    #[test]
    fn test_migrated_history_persists_as_current_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"{"events": {"https://example.com/events/9": {"profiles": []}}}"#,
        )
        .unwrap();

        let mut store = JsonHistoryStore::new(&path);
        let history = store.load().unwrap();
        store.persist(&history).unwrap();

        let value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(store.load().unwrap(), history);
    }
}
