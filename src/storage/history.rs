//! The crawl history: what has been completed and what has been found
//!
//! The history is the single source of truth for resumption. It is loaded
//! once per run, mutated after each unit, and persisted after every
//! mutation.

use crate::url::{ChildId, ParentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Current schema version of the persisted history document
pub const HISTORY_VERSION: u32 = 1;

/// Status of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

/// One crawl session recorded in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub status: RunStatus,
    #[serde(default)]
    pub parents_processed: usize,
    #[serde(default)]
    pub children_discovered: usize,
}

/// Persistent record of crawl progress
///
/// Invariants:
/// - every processed parent was fully paginated before being recorded
/// - each child appears once in `discovered_children` and is attributed to
///   exactly one parent, the first one that discovered it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlHistory {
    processed_parents: Vec<ParentId>,
    processed_index: HashSet<ParentId>,
    discovered_children: Vec<ChildId>,
    child_index: HashSet<ChildId>,
    parent_results: BTreeMap<ParentId, Vec<ChildId>>,
    attribution: HashMap<ChildId, ParentId>,
    runs: Vec<RunRecord>,
}

impl CrawlHistory {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Parents =====

    pub fn is_processed(&self, parent: &ParentId) -> bool {
        self.processed_index.contains(parent)
    }

    /// Marks a fully paginated parent as processed
    ///
    /// Returns false if it was already processed; recording twice has no
    /// further effect.
    pub fn mark_processed(&mut self, parent: &ParentId) -> bool {
        if !self.processed_index.insert(parent.clone()) {
            return false;
        }
        self.processed_parents.push(parent.clone());
        self.parent_results.entry(parent.clone()).or_default();
        true
    }

    /// Processed parents in completion order
    pub fn processed_parents(&self) -> &[ParentId] {
        &self.processed_parents
    }

    pub fn processed_count(&self) -> usize {
        self.processed_parents.len()
    }

    // ===== Children =====

    pub fn is_known_child(&self, child: &ChildId) -> bool {
        self.child_index.contains(child)
    }

    /// Claims a child for `parent` if nobody has claimed it before
    ///
    /// Returns true only for the first claim of a given child. Later claims,
    /// from the same or any other parent, change nothing.
    pub fn claim_child(&mut self, parent: &ParentId, child: &ChildId) -> bool {
        if !self.child_index.insert(child.clone()) {
            return false;
        }
        self.discovered_children.push(child.clone());
        self.attribute(parent, child);
        true
    }

    fn attribute(&mut self, parent: &ParentId, child: &ChildId) {
        self.attribution.insert(child.clone(), parent.clone());
        self.parent_results
            .entry(parent.clone())
            .or_default()
            .push(child.clone());
    }

    /// All discovered children in discovery order
    pub fn discovered_children(&self) -> &[ChildId] {
        &self.discovered_children
    }

    pub fn child_count(&self) -> usize {
        self.discovered_children.len()
    }

    /// Children attributed to one parent, in discovery order
    pub fn children_of(&self, parent: &ParentId) -> &[ChildId] {
        self.parent_results
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parent_results(&self) -> &BTreeMap<ParentId, Vec<ChildId>> {
        &self.parent_results
    }

    /// Parent that first discovered `child`
    pub fn parent_of(&self, child: &ChildId) -> Option<&ParentId> {
        self.attribution.get(child)
    }

    /// Every (parent, child) attribution, in child discovery order
    pub fn pairs(&self) -> impl Iterator<Item = (&ParentId, &ChildId)> {
        self.discovered_children
            .iter()
            .filter_map(|child| self.attribution.get(child).map(|parent| (parent, child)))
    }

    // ===== Runs =====

    /// Opens a new run record and returns its index
    pub fn begin_run(&mut self, config_hash: &str) -> usize {
        self.runs.push(RunRecord {
            started_at: Utc::now(),
            finished_at: None,
            config_hash: config_hash.to_string(),
            status: RunStatus::Running,
            parents_processed: 0,
            children_discovered: 0,
        });
        self.runs.len() - 1
    }

    /// Closes the run record opened by `begin_run`
    pub fn finish_run(
        &mut self,
        run: usize,
        status: RunStatus,
        parents_processed: usize,
        children_discovered: usize,
    ) {
        if let Some(record) = self.runs.get_mut(run) {
            record.finished_at = Some(Utc::now());
            record.status = status;
            record.parents_processed = parents_processed;
            record.children_discovered = children_discovered;
        }
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    pub fn last_run(&self) -> Option<&RunRecord> {
        self.runs.last()
    }

    // ===== Serialization =====

    pub(crate) fn to_document(&self) -> HistoryDocument {
        HistoryDocument {
            version: HISTORY_VERSION,
            processed_parents: self.processed_parents.clone(),
            discovered_children: self.discovered_children.clone(),
            parent_results: self.parent_results.clone(),
            runs: self.runs.clone(),
        }
    }

    pub(crate) fn from_document(document: HistoryDocument) -> Self {
        let mut history = Self {
            runs: document.runs,
            ..Self::default()
        };

        for parent in &document.processed_parents {
            if history.processed_index.insert(parent.clone()) {
                history.processed_parents.push(parent.clone());
            }
        }

        for child in &document.discovered_children {
            if history.child_index.insert(child.clone()) {
                history.discovered_children.push(child.clone());
            }
        }

        // a child listed under several parents stays with the first
        for (parent, children) in &document.parent_results {
            history.parent_results.entry(parent.clone()).or_default();
            for child in children {
                if history.attribution.contains_key(child) {
                    continue;
                }
                if history.child_index.insert(child.clone()) {
                    history.discovered_children.push(child.clone());
                }
                history.attribute(parent, child);
            }
        }

        for parent in &history.processed_parents {
            history.parent_results.entry(parent.clone()).or_default();
        }

        history
    }
}

/// On-disk shape of the history, version 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HistoryDocument {
    pub version: u32,
    #[serde(default)]
    pub processed_parents: Vec<ParentId>,
    #[serde(default)]
    pub discovered_children: Vec<ChildId>,
    #[serde(default)]
    pub parent_results: BTreeMap<ParentId, Vec<ChildId>>,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}
