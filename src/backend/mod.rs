//! Abstract task service the planner core talks to.
//!
//! The real service lives outside this crate; [`MemoryBackend`] backs the
//! desktop binary with a dataset file and stands in for it in tests.

pub mod memory;

pub use memory::MemoryBackend;

use crate::error::BackendError;
use crate::model::{LoadRange, RawFields, RawRecord, SourceKind, TaskId};

/// What happened to a row. Listeners only learn that something changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: SourceKind,
    pub kind: ChangeKind,
}

/// Handle returned by [`TaskBackend::subscribe_to_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub type ChangeCallback = Box<dyn FnMut(&ChangeEvent)>;

pub trait TaskBackend {
    /// Scheduled rows of both tables whose dates intersect `range`.
    fn fetch_tasks_in_range(&self, range: &LoadRange) -> Result<Vec<RawRecord>, BackendError>;

    /// Every scheduled row of both tables.
    fn fetch_all_tasks(&self) -> Result<Vec<RawRecord>, BackendError>;

    /// Backlog rows, regardless of dates.
    fn fetch_unscheduled_tasks(&self) -> Result<Vec<RawRecord>, BackendError>;

    /// Merge `fields` into one row.
    fn update_task(&self, kind: SourceKind, id: &TaskId, fields: RawFields)
        -> Result<(), BackendError>;

    fn subscribe_to_changes(
        &self,
        tables: &[SourceKind],
        on_event: ChangeCallback,
    ) -> Result<SubscriptionId, BackendError>;

    fn unsubscribe(&self, id: SubscriptionId);
}
