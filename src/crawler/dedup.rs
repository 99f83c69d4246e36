//! Deduplication of discovered identifiers
//!
//! A `Deduplicator` answers "have we ever seen this id" and records ids at
//! most once. `HistoryLedger` is the persistent variant backed by the
//! crawl history; `SeenSet` is an in-memory set for event discovery.

use crate::storage::CrawlHistory;
use crate::url::{ChildId, ParentId};
use std::collections::HashSet;
use std::hash::Hash;

/// Set abstraction over previously seen identifiers
pub trait Deduplicator<I> {
    /// Returns true if `id` has never been recorded
    fn is_new(&self, id: &I) -> bool;

    /// Records `id`, returning true only on the first call for that id
    fn record(&mut self, id: &I) -> bool;
}

/// Child deduplicator backed by the persistent crawl history
///
/// Claims made through the ledger are attributed to `parent`.
pub struct HistoryLedger<'a> {
    history: &'a mut CrawlHistory,
    parent: &'a ParentId,
}

impl<'a> HistoryLedger<'a> {
    pub fn new(history: &'a mut CrawlHistory, parent: &'a ParentId) -> Self {
        Self { history, parent }
    }
}

impl Deduplicator<ChildId> for HistoryLedger<'_> {
    fn is_new(&self, id: &ChildId) -> bool {
        !self.history.is_known_child(id)
    }

    fn record(&mut self, id: &ChildId) -> bool {
        self.history.claim_child(self.parent, id)
    }
}

/// In-memory deduplicator, forgotten when dropped
///
/// Remembers the order ids were first recorded in, so whatever a walk
/// found survives even if the walk itself ends in a fault.
#[derive(Debug, Clone)]
pub struct SeenSet<I> {
    seen: HashSet<I>,
    order: Vec<I>,
}

impl<I: Eq + Hash> SeenSet<I> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Recorded ids in first-seen order
    pub fn ids(&self) -> &[I] {
        &self.order
    }

    pub fn into_ids(self) -> Vec<I> {
        self.order
    }
}

impl<I: Eq + Hash> Default for SeenSet<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Clone + Eq + Hash> Deduplicator<I> for SeenSet<I> {
    fn is_new(&self, id: &I) -> bool {
        !self.seen.contains(id)
    }

    fn record(&mut self, id: &I) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.order.push(id.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> ChildId {
        ChildId::parse(&format!("https://example.com/in/{}", name)).unwrap()
    }

    #[test]
    fn test_seen_set_record_idempotent() {
        let mut set = SeenSet::new();
        assert!(set.is_new(&child("a")));
        assert!(set.record(&child("a")));
        assert!(!set.record(&child("a")));
        assert!(!set.is_new(&child("a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_seen_set_keeps_first_seen_order() {
        let mut set = SeenSet::new();
        for name in ["c", "a", "c", "b", "a"] {
            set.record(&child(name));
        }
        assert_eq!(set.ids(), &[child("c"), child("a"), child("b")]);
        assert_eq!(set.into_ids().len(), 3);
    }

    #[test]
    fn test_history_ledger_attributes_claims() {
        let mut history = CrawlHistory::new();
        let p1 = ParentId::parse("https://example.com/events/1").unwrap();
        let p2 = ParentId::parse("https://example.com/events/2").unwrap();

        {
            let mut ledger = HistoryLedger::new(&mut history, &p1);
            assert!(ledger.record(&child("a")));
            assert!(!ledger.record(&child("a")));
        }
        {
            let mut ledger = HistoryLedger::new(&mut history, &p2);
            assert!(!ledger.is_new(&child("a")));
            assert!(!ledger.record(&child("a")));
            assert!(ledger.record(&child("b")));
        }

        assert_eq!(history.children_of(&p1), &[child("a")]);
        assert_eq!(history.children_of(&p2), &[child("b")]);
    }
}
