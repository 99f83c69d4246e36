/// Unit state definitions for tracking per-event crawl progress
///
/// Every parent unit moves through a small state machine during a run:
///
/// ```text
/// Pending ──▶ InProgress ──▶ Completed
///                 │  ▲
///                 ▼  │ (single retry pass)
///                Failed
/// ```
use crate::url::ParentId;
use crate::HarvestError;
use std::fmt;

/// Represents the current state of a parent unit within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    /// Unit is queued and has not been attempted in this run
    Pending,

    /// Unit's listing is being paginated
    InProgress,

    /// Listing reached a terminal pagination state and was checkpointed
    Completed,

    /// Last attempt ended in a fault or an early stop
    Failed,
}

impl UnitState {
    /// Returns true if `next` is a permitted successor of this state
    pub fn can_transition_to(&self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::Failed, Self::InProgress)
        )
    }

    /// Moves to `next`, rejecting transitions outside the state machine
    pub fn transition(self, next: UnitState) -> Result<UnitState, HarvestError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible unit states
    pub fn all_states() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parent whose attempt failed, awaiting the retry pass or final report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUnit {
    pub parent: ParentId,

    /// Human-readable cause of the last failure
    pub reason: String,

    /// False for permanent faults, which are never retried
    pub retryable: bool,

    /// Number of attempts made in this run
    pub attempts: u32,
}

impl FailedUnit {
    pub fn new(parent: ParentId, reason: impl Into<String>, retryable: bool) -> Self {
        Self {
            parent,
            reason: reason.into(),
            retryable,
            attempts: 1,
        }
    }

    /// State of a failed unit, the starting point of its retry
    pub fn state(&self) -> UnitState {
        UnitState::Failed
    }
}
