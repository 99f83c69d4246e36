//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UnitState`: per-event state machine (pending, in progress, completed, failed)
//! - `FailedUnit`: an event queued for the retry pass or the failure report
//! - `PaginationState`: transient counters for one listing walk

mod pagination;
mod unit_state;

pub use pagination::PaginationState;
pub use unit_state::{FailedUnit, UnitState};
