use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque task identifier as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a person a task can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The backend table a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Content calendar items (snake_case field naming).
    ContentItem,
    /// Generic team tasks (camelCase field naming).
    GenericTask,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::ContentItem, SourceKind::GenericTask];

    /// Table name used by the dataset file and change notifications.
    pub fn table(self) -> &'static str {
        match self {
            SourceKind::ContentItem => "content_items",
            SourceKind::GenericTask => "tasks",
        }
    }

    pub fn from_table(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "content_items" | "content_item" | "content" => Some(SourceKind::ContentItem),
            "tasks" | "task" | "generic_task" | "generic_tasks" => Some(SourceKind::GenericTask),
            _ => None,
        }
    }
}

/// A task's identity. Ids are only unique within one source table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub kind: SourceKind,
    pub id: TaskId,
}

impl TaskKey {
    pub fn new(kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: TaskId::new(id),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.table(), self.id)
    }
}

/// Inclusive calendar span. `end` is never earlier than `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    /// Build a span, clamping `end` up to `start` when inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of calendar days covered, counting both ends.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && self.end >= start
    }

    /// Same length, moved so that it starts on `start`.
    pub fn shifted_to(&self, start: NaiveDate) -> Self {
        let length = self.end - self.start;
        Self {
            start,
            end: start + length,
        }
    }
}

/// Owner role buckets. Layout only cares about the flattened set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owners {
    pub assignees: Vec<OwnerId>,
    pub idea_owners: Vec<OwnerId>,
    pub editors: Vec<OwnerId>,
}

/// Which bucket an owner was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerRole {
    Assignee,
    IdeaOwner,
    Editor,
}

impl Owners {
    pub fn single(owner: OwnerId) -> Self {
        Self {
            assignees: vec![owner],
            ..Default::default()
        }
    }

    /// Every distinct owner, in bucket order then first-seen order.
    pub fn flatten(&self) -> Vec<OwnerId> {
        let mut out: Vec<OwnerId> = Vec::new();
        for owner in self
            .assignees
            .iter()
            .chain(&self.idea_owners)
            .chain(&self.editors)
        {
            if !out.contains(owner) {
                out.push(owner.clone());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignees.is_empty() && self.idea_owners.is_empty() && self.editors.is_empty()
    }

    pub fn contains(&self, owner: &OwnerId) -> bool {
        self.role_of(owner).is_some()
    }

    pub fn role_of(&self, owner: &OwnerId) -> Option<OwnerRole> {
        if self.assignees.contains(owner) {
            Some(OwnerRole::Assignee)
        } else if self.idea_owners.contains(owner) {
            Some(OwnerRole::IdeaOwner)
        } else if self.editors.contains(owner) {
            Some(OwnerRole::Editor)
        } else {
            None
        }
    }

    /// Replace the whole set with one owner, kept in `role`'s bucket.
    pub fn replaced_with(owner: OwnerId, role: OwnerRole) -> Self {
        let mut owners = Owners::default();
        match role {
            OwnerRole::Assignee => owners.assignees.push(owner),
            OwnerRole::IdeaOwner => owners.idea_owners.push(owner),
            OwnerRole::Editor => owners.editors.push(owner),
        }
        owners
    }
}

/// One review round attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSession {
    pub round: u32,
    pub status: Option<String>,
    pub reviewer: Option<OwnerId>,
}

/// A single planner task, normalized from either source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: SourceKind,
    pub title: String,
    /// `None` only for unscheduled backlog items.
    pub span: Option<DateSpan>,
    pub owners: Owners,
    /// Lives in the backlog, never on the timeline.
    pub is_unscheduled: bool,
    /// Team-pool tasks are reassigned elsewhere and cannot be dragged.
    pub is_team_pool: bool,
    pub status: Option<String>,
    pub platforms: Vec<String>,
    /// Sorted by round, ascending.
    pub review_sessions: Vec<ReviewSession>,
}

impl Task {
    /// Create a scheduled task with sensible defaults.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        owners: Owners,
    ) -> Self {
        Self {
            id: TaskId::new(id),
            kind: SourceKind::GenericTask,
            title: title.into(),
            span: Some(DateSpan::new(start, end)),
            owners,
            is_unscheduled: false,
            is_team_pool: false,
            status: None,
            platforms: Vec::new(),
            review_sessions: Vec::new(),
        }
    }

    /// Create a backlog item without dates.
    pub fn new_unscheduled(id: impl Into<String>, title: impl Into<String>, owners: Owners) -> Self {
        Self {
            id: TaskId::new(id),
            kind: SourceKind::GenericTask,
            title: title.into(),
            span: None,
            owners,
            is_unscheduled: true,
            is_team_pool: false,
            status: None,
            platforms: Vec::new(),
            review_sessions: Vec::new(),
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            kind: self.kind,
            id: self.id.clone(),
        }
    }

    /// Whether this is the task `key` names.
    pub fn has_key(&self, key: &TaskKey) -> bool {
        self.kind == key.kind && self.id == key.id
    }

    /// The span to lay out, if this task belongs on the timeline.
    pub fn scheduled_span(&self) -> Option<DateSpan> {
        if self.is_unscheduled {
            None
        } else {
            self.span
        }
    }

    pub fn duration_days(&self) -> i64 {
        self.span.map(|s| s.duration_days()).unwrap_or(0)
    }

    /// Only single-owner, non-pool, scheduled tasks can be dragged.
    pub fn is_individually_draggable(&self) -> bool {
        !self.is_team_pool && self.scheduled_span().is_some() && self.owners.flatten().len() == 1
    }
}
