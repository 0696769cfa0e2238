//! The planner's in-memory state, owned explicitly by the caller.
//!
//! # Fetch sequencing
//! Anything that invalidates the task set calls [`PlannerStore::request_refetch`],
//! which only raises a flag. [`PlannerStore::begin_fetch`] drains the flag
//! and hands out a numbered request, so several triggers in one tick cost a
//! single fetch. Responses may resolve in any order; a response older than
//! the newest one already applied is dropped. Each applied response replaces
//! the whole set; nothing is merged. While the last applied scope lags the
//! window (a fetch after an expansion failed), navigation asks again.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::backend::TaskBackend;
use crate::error::{BackendError, MutationError};
use crate::io::normalize::normalize_batch;
use crate::layout::{pack_by_owner, OwnerLane};
use crate::model::{LoadRange, OwnerId, RawRecord, Task, TaskKey, WeekWindow};

use super::mutation::{self, MutationOutcome, RescheduleCommand};
use super::window::{DateWindow, FetchScope};

/// A numbered fetch handed out by [`PlannerStore::begin_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub scope: FetchScope,
}

/// Raw rows returned for one fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedRecords {
    pub scheduled: Vec<RawRecord>,
    pub unscheduled: Vec<RawRecord>,
}

/// What [`PlannerStore::complete_fetch`] did with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchApplied {
    Replaced {
        seq: u64,
        scheduled: usize,
        unscheduled: usize,
        skipped: usize,
    },
    /// A newer response was already applied.
    Stale { seq: u64, applied: u64 },
    /// The previous task set was kept.
    Failed { seq: u64, message: String },
}

/// Notifications delivered to store observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TasksReplaced { seq: u64 },
    FetchFailed { seq: u64, message: String },
    WindowChanged { range: LoadRange, all_loaded: bool },
    TaskRescheduled { key: TaskKey },
    RescheduleRolledBack { key: TaskKey, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub type Observer = Box<dyn FnMut(&StoreEvent)>;

pub struct PlannerStore {
    window: DateWindow,
    tasks: Vec<Task>,
    backlog: Vec<Task>,
    issued_seq: u64,
    applied_seq: u64,
    /// Scope of the newest applied response.
    loaded_scope: Option<FetchScope>,
    refetch_pending: bool,
    last_error: Option<String>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl PlannerStore {
    /// An empty store with a first fetch already pending.
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            tasks: Vec::new(),
            backlog: Vec::new(),
            issued_seq: 0,
            applied_seq: 0,
            loaded_scope: None,
            refetch_pending: true,
            last_error: None,
            observers: Vec::new(),
            next_observer: 1,
        }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Scheduled tasks within the loaded range.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Unscheduled tasks.
    pub fn backlog(&self) -> &[Task] {
        &self.backlog
    }

    pub fn task(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| t.has_key(key))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_refetch_pending(&self) -> bool {
        self.refetch_pending
    }

    /// Sequence number of the newest applied response (0 before any).
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    pub fn subscribe(&mut self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.observers.retain(|(observer, _)| *observer != id);
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    /// Mark the task set stale. Coalesces until the next [`Self::begin_fetch`].
    pub fn request_refetch(&mut self, reason: &str) {
        if !self.refetch_pending {
            tracing::debug!(reason, "re-fetch requested");
        }
        self.refetch_pending = true;
    }

    pub fn expand_to_include(&mut self, date: NaiveDate) -> bool {
        let changed = self.window.expand_to_include(date);
        if changed {
            self.window_changed("load range expanded");
        } else {
            self.retry_unloaded_scope();
        }
        changed
    }

    /// Make sure both ends of `week` are loaded.
    pub fn show_week(&mut self, week: &WeekWindow) -> bool {
        let changed = self.window.expand_to_include(week.start) | self.window.expand_to_include(week.end());
        if changed {
            self.window_changed("week outside load range");
        } else {
            self.retry_unloaded_scope();
        }
        changed
    }

    pub fn load_all(&mut self) -> bool {
        let changed = self.window.load_all();
        if changed {
            self.window_changed("load all");
        } else {
            self.retry_unloaded_scope();
        }
        changed
    }

    /// Whether the applied task set answers the window's current scope.
    pub fn is_scope_loaded(&self) -> bool {
        self.loaded_scope == Some(self.window.fetch_scope())
    }

    fn retry_unloaded_scope(&mut self) {
        if !self.is_scope_loaded() {
            self.request_refetch("load range not fetched yet");
        }
    }

    fn window_changed(&mut self, reason: &str) {
        self.request_refetch(reason);
        let event = StoreEvent::WindowChanged {
            range: self.window.range(),
            all_loaded: self.window.is_all_loaded(),
        };
        self.notify(event);
    }

    /// Take the pending re-fetch, if any, as a numbered request.
    pub fn begin_fetch(&mut self) -> Option<FetchRequest> {
        if !self.refetch_pending {
            return None;
        }
        self.refetch_pending = false;
        self.issued_seq += 1;
        let request = FetchRequest {
            seq: self.issued_seq,
            scope: self.window.fetch_scope(),
        };
        tracing::debug!(seq = request.seq, scope = ?request.scope, "issuing fetch");
        Some(request)
    }

    /// Apply the response to `request`.
    pub fn complete_fetch(
        &mut self,
        request: FetchRequest,
        result: Result<FetchedRecords, BackendError>,
    ) -> FetchApplied {
        if request.seq <= self.applied_seq {
            tracing::debug!(
                seq = request.seq,
                applied = self.applied_seq,
                "discarding stale fetch response"
            );
            return FetchApplied::Stale {
                seq: request.seq,
                applied: self.applied_seq,
            };
        }

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(seq = request.seq, "fetch failed, keeping previous tasks: {message}");
                self.last_error = Some(message.clone());
                self.notify(StoreEvent::FetchFailed {
                    seq: request.seq,
                    message: message.clone(),
                });
                return FetchApplied::Failed {
                    seq: request.seq,
                    message,
                };
            }
        };

        let (normalized, skipped) =
            normalize_batch(records.scheduled.iter().chain(records.unscheduled.iter()));

        let mut seen: HashSet<TaskKey> = HashSet::with_capacity(normalized.len());
        let mut tasks: Vec<Task> = Vec::new();
        let mut backlog: Vec<Task> = Vec::new();
        let mut out_of_range = 0usize;
        for task in normalized {
            if !seen.insert(task.key()) {
                continue;
            }
            if task.is_unscheduled {
                backlog.push(task);
            } else if task.span.is_some_and(|span| request.scope.covers(&span)) {
                tasks.push(task);
            } else {
                out_of_range += 1;
            }
        }
        if out_of_range > 0 {
            tracing::debug!(seq = request.seq, out_of_range, "dropped tasks outside the load range");
        }

        tracing::info!(
            seq = request.seq,
            scheduled = tasks.len(),
            unscheduled = backlog.len(),
            skipped,
            "task set replaced"
        );

        let applied = FetchApplied::Replaced {
            seq: request.seq,
            scheduled: tasks.len(),
            unscheduled: backlog.len(),
            skipped,
        };
        self.tasks = tasks;
        self.backlog = backlog;
        self.applied_seq = request.seq;
        self.loaded_scope = Some(request.scope);
        self.last_error = None;
        self.notify(StoreEvent::TasksReplaced { seq: request.seq });
        applied
    }

    /// Run the pending fetch, if any, against `backend`. Call once per tick.
    pub fn pump(&mut self, backend: &dyn TaskBackend) -> Option<FetchApplied> {
        let request = self.begin_fetch()?;
        let result = fetch_records(backend, request.scope);
        Some(self.complete_fetch(request, result))
    }

    /// Lanes for the visible week over the current task set.
    pub fn week_layout(&self, week: &WeekWindow) -> Vec<OwnerLane<'_>> {
        pack_by_owner(&self.tasks, week)
    }

    /// Reschedule from a drag-and-drop and persist it.
    pub fn reschedule(
        &mut self,
        backend: &dyn TaskBackend,
        key: &TaskKey,
        new_owner: &OwnerId,
        new_date: NaiveDate,
    ) -> Result<MutationOutcome, MutationError> {
        let command = mutation::reschedule(&self.tasks, key, new_owner, new_date)?;
        Ok(self.commit_reschedule(backend, command))
    }

    /// Apply `command` optimistically, then persist it.
    ///
    /// On failure the inverse is applied right away and a re-fetch is
    /// requested, so the grid snaps back even if the failure was partial.
    pub fn commit_reschedule(
        &mut self,
        backend: &dyn TaskBackend,
        command: RescheduleCommand,
    ) -> MutationOutcome {
        command.apply(&mut self.tasks);
        self.notify(StoreEvent::TaskRescheduled {
            key: command.key.clone(),
        });

        match backend.update_task(command.key.kind, &command.key.id, command.patch()) {
            Ok(()) => {
                tracing::info!(
                    task = %command.key,
                    start = %command.after.span.start,
                    end = %command.after.span.end,
                    "rescheduled task"
                );
                self.expand_to_include(command.after.span.start);
                self.expand_to_include(command.after.span.end);
                MutationOutcome::Committed(command)
            }
            Err(error) => {
                tracing::warn!(task = %command.key, "reschedule failed, rolling back: {error}");
                command.inverse().apply(&mut self.tasks);
                self.request_refetch("reschedule rolled back");
                self.notify(StoreEvent::RescheduleRolledBack {
                    key: command.key.clone(),
                    message: error.to_string(),
                });
                MutationOutcome::RolledBack { command, error }
            }
        }
    }
}

/// Query `backend` for everything a fetch of `scope` needs.
pub fn fetch_records(
    backend: &dyn TaskBackend,
    scope: FetchScope,
) -> Result<FetchedRecords, BackendError> {
    let scheduled = match scope {
        FetchScope::Range(range) => backend.fetch_tasks_in_range(&range)?,
        FetchScope::All => backend.fetch_all_tasks()?,
    };
    let unscheduled = backend.fetch_unscheduled_tasks()?;
    Ok(FetchedRecords {
        scheduled,
        unscheduled,
    })
}
