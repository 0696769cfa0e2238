//! Drag-and-drop rescheduling as invertible commands.
//!
//! A reschedule never checks for overlaps. Two tasks of the same person on
//! the same day is a layout concern; the packer gives them separate rows.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{BackendError, MutationError};
use crate::model::{DateSpan, OwnerId, OwnerRole, Owners, RawFields, SourceKind, Task, TaskKey};

/// The parts of a task a reschedule is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub span: DateSpan,
    pub owners: Owners,
}

/// One reschedule, with enough state to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescheduleCommand {
    pub key: TaskKey,
    pub before: Slot,
    pub after: Slot,
}

impl RescheduleCommand {
    /// Write `after` into the matching task. Returns false if it is gone.
    pub fn apply(&self, tasks: &mut [Task]) -> bool {
        match tasks.iter_mut().find(|t| t.has_key(&self.key)) {
            Some(task) => {
                task.span = Some(self.after.span);
                task.owners = self.after.owners.clone();
                true
            }
            None => false,
        }
    }

    /// The command that puts things back.
    pub fn inverse(&self) -> Self {
        Self {
            key: self.key.clone(),
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }

    pub fn owner_changed(&self) -> bool {
        self.before.owners != self.after.owners
    }

    /// Partial row for `update_task`, in the source table's field naming.
    pub fn patch(&self) -> RawFields {
        let names = FieldNames::for_kind(self.key.kind);
        let mut fields = RawFields::new();
        fields.insert(names.start.into(), date_value(self.after.span.start));
        fields.insert(names.end.into(), date_value(self.after.span.end));
        if self.owner_changed() {
            let owners = &self.after.owners;
            fields.insert(names.assignees.into(), owner_values(&owners.assignees));
            fields.insert(names.idea_owners.into(), owner_values(&owners.idea_owners));
            fields.insert(names.editors.into(), owner_values(&owners.editors));
        }
        fields
    }
}

/// How a commit attempt ended. The caller never has to guess.
#[derive(Debug)]
pub enum MutationOutcome {
    /// Persisted; the optimistic state stands until the next re-fetch.
    Committed(RescheduleCommand),
    /// Persisting failed; the inverse has already been applied locally.
    RolledBack {
        command: RescheduleCommand,
        error: BackendError,
    },
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }
}

/// Build the command for dropping the task under `key` on (`new_owner`, `new_date`).
///
/// The task keeps its length and starts on `new_date`. A single-owner task
/// changes hands to `new_owner`, staying in the same role bucket; a
/// multi-owner task only moves in time. Team-pool tasks are reassigned
/// through another flow and are refused here.
pub fn reschedule(
    tasks: &[Task],
    key: &TaskKey,
    new_owner: &OwnerId,
    new_date: NaiveDate,
) -> Result<RescheduleCommand, MutationError> {
    let task = tasks
        .iter()
        .find(|t| t.has_key(key))
        .ok_or_else(|| MutationError::UnknownTask(key.clone()))?;
    if task.is_team_pool {
        return Err(MutationError::NotDraggable(key.clone()));
    }
    let span = task
        .scheduled_span()
        .ok_or_else(|| MutationError::Unscheduled(key.clone()))?;

    let current = task.owners.flatten();
    let owners = match current.as_slice() {
        [only] => {
            let role = task.owners.role_of(only).unwrap_or(OwnerRole::Assignee);
            Owners::replaced_with(new_owner.clone(), role)
        }
        _ => task.owners.clone(),
    };

    Ok(RescheduleCommand {
        key: task.key(),
        before: Slot {
            span,
            owners: task.owners.clone(),
        },
        after: Slot {
            span: span.shifted_to(new_date),
            owners,
        },
    })
}

struct FieldNames {
    start: &'static str,
    end: &'static str,
    assignees: &'static str,
    idea_owners: &'static str,
    editors: &'static str,
}

impl FieldNames {
    fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::ContentItem => Self {
                start: "start_date",
                end: "end_date",
                assignees: "assignee_ids",
                idea_owners: "idea_owner_ids",
                editors: "editor_ids",
            },
            SourceKind::GenericTask => Self {
                start: "startDate",
                end: "endDate",
                assignees: "assigneeIds",
                idea_owners: "ideaOwnerIds",
                editors: "editorIds",
            },
        }
    }
}

fn date_value(date: NaiveDate) -> Value {
    Value::String(date.format("%Y-%m-%d").to_string())
}

fn owner_values(owners: &[OwnerId]) -> Value {
    Value::Array(
        owners
            .iter()
            .map(|o| Value::String(o.as_str().to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::normalize::normalize;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn key(id: &str) -> TaskKey {
        TaskKey::new(SourceKind::GenericTask, id)
    }

    fn ana() -> OwnerId {
        OwnerId::new("ana")
    }

    fn tasks() -> Vec<Task> {
        let mut shared = Task::new("shared", "Shared", d(2024, 3, 4), d(2024, 3, 4), Owners::single(ana()));
        shared.owners.editors.push(OwnerId::new("bo"));
        let mut pool = Task::new("pool", "Pool", d(2024, 3, 4), d(2024, 3, 4), Owners::single(ana()));
        pool.is_team_pool = true;
        vec![
            Task::new("mon-wed", "Mon-Wed", d(2024, 3, 4), d(2024, 3, 6), Owners::single(ana())),
            shared,
            pool,
            Task::new_unscheduled("later", "Later", Owners::single(ana())),
        ]
    }

    #[test]
    fn moving_three_day_task_keeps_duration() {
        let mut tasks = tasks();
        let cmd = reschedule(&tasks, &key("mon-wed"), &ana(), d(2024, 3, 6)).unwrap();
        assert_eq!(cmd.after.span, DateSpan::new(d(2024, 3, 6), d(2024, 3, 8)));
        assert!(!cmd.owner_changed());

        assert!(cmd.apply(&mut tasks));
        assert_eq!(tasks[0].duration_days(), 3);
        assert_eq!(tasks[0].span.unwrap().start, d(2024, 3, 6));
    }

    #[test]
    fn single_owner_task_changes_hands() {
        let tasks = tasks();
        let cy = OwnerId::new("cy");
        let cmd = reschedule(&tasks, &key("mon-wed"), &cy, d(2024, 3, 4)).unwrap();
        assert_eq!(cmd.after.owners, Owners::single(cy));
        assert!(cmd.owner_changed());
    }

    #[test]
    fn multi_owner_task_only_moves_in_time() {
        let tasks = tasks();
        let cmd = reschedule(&tasks, &key("shared"), &OwnerId::new("cy"), d(2024, 3, 5)).unwrap();
        assert_eq!(cmd.after.owners, cmd.before.owners);
        assert_eq!(cmd.after.span, DateSpan::single(d(2024, 3, 5)));
    }

    #[test]
    fn refused_drags() {
        let tasks = tasks();
        assert_eq!(
            reschedule(&tasks, &key("pool"), &ana(), d(2024, 3, 5)),
            Err(MutationError::NotDraggable(key("pool")))
        );
        assert_eq!(
            reschedule(&tasks, &key("later"), &ana(), d(2024, 3, 5)),
            Err(MutationError::Unscheduled(key("later")))
        );
        assert_eq!(
            reschedule(&tasks, &key("ghost"), &ana(), d(2024, 3, 5)),
            Err(MutationError::UnknownTask(key("ghost")))
        );
    }

    #[test]
    fn inverse_restores_original() {
        let mut tasks = tasks();
        let original = tasks[0].clone();
        let cmd = reschedule(&tasks, &key("mon-wed"), &OwnerId::new("cy"), d(2024, 3, 11)).unwrap();
        cmd.apply(&mut tasks);
        cmd.inverse().apply(&mut tasks);
        assert_eq!(tasks[0], original);
    }

    #[test]
    fn same_id_in_other_table_is_left_alone() {
        let mut content = Task::new("7", "Post", d(2024, 3, 4), d(2024, 3, 4), Owners::single(ana()));
        content.kind = SourceKind::ContentItem;
        let generic = Task::new("7", "Task", d(2024, 3, 5), d(2024, 3, 5), Owners::single(OwnerId::new("bo")));
        let mut tasks = vec![content, generic];

        let cmd = reschedule(&tasks, &key("7"), &OwnerId::new("cy"), d(2024, 3, 8)).unwrap();
        assert_eq!(cmd.key.kind, SourceKind::GenericTask);
        assert_eq!(cmd.before.owners, Owners::single(OwnerId::new("bo")));
        assert!(cmd.patch().contains_key("startDate"));

        cmd.apply(&mut tasks);
        assert_eq!(tasks[0].span, Some(DateSpan::single(d(2024, 3, 4))));
        assert_eq!(tasks[0].owners, Owners::single(ana()));
        assert_eq!(tasks[1].span, Some(DateSpan::single(d(2024, 3, 8))));
    }

    #[test]
    fn owner_change_survives_a_migrated_editor_column() {
        let raw = serde_json::json!({
            "id": "t", "startDate": "2024-03-04", "assigneeIds": ["ana"], "editor_ids": ["ana"]
        });
        let mut row = raw.as_object().cloned().unwrap();
        let tasks = vec![normalize(&row, SourceKind::GenericTask).unwrap()];

        let cmd = reschedule(&tasks, &key("t"), &OwnerId::new("cy"), d(2024, 3, 4)).unwrap();
        row.extend(cmd.patch());
        let reloaded = normalize(&row, SourceKind::GenericTask).unwrap();
        assert_eq!(reloaded.owners.flatten(), vec![OwnerId::new("cy")]);
    }

    #[test]
    fn patch_uses_table_naming_and_normalizes_back() {
        let tasks = tasks();
        let cmd = reschedule(&tasks, &key("mon-wed"), &OwnerId::new("cy"), d(2024, 3, 11)).unwrap();
        let mut patch = cmd.patch();
        assert!(patch.contains_key("startDate"));
        assert!(patch.contains_key("assigneeIds"));

        patch.insert("id".into(), Value::String("mon-wed".into()));
        let task = normalize(&patch, SourceKind::GenericTask).unwrap();
        assert_eq!(task.span, Some(cmd.after.span));
        assert_eq!(task.owners, cmd.after.owners);
    }
}
