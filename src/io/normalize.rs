//! Raw backend rows to canonical [`Task`]s.
//!
//! The two source tables went through several schema migrations, so the same
//! attribute can appear under snake_case, camelCase or an older name. Each
//! attribute has an alias list below; the first non-blank alias wins, trying
//! the table's own naming before the other one.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::error::NormalizeError;
use crate::model::{
    DateSpan, OwnerId, Owners, RawFields, RawRecord, ReviewSession, SourceKind, Task, TaskId,
};

const ID_KEYS: &[&str] = &["id", "uuid", "task_id", "taskId"];
const TITLE_KEYS: &[&str] = &["title", "name", "task_name", "taskName", "label"];
const START_KEYS: &[&str] = &[
    "start_date",
    "startDate",
    "start",
    "scheduled_date",
    "scheduledDate",
    "publish_date",
    "publishDate",
];
const END_KEYS: &[&str] = &["end_date", "endDate", "end", "due_date", "dueDate", "deadline"];
const ASSIGNEE_KEYS: &[&str] = &[
    "assignee_ids",
    "assigneeIds",
    "assignees",
    "assignee_id",
    "assigneeId",
    "assigned_to",
    "assignedTo",
];
const IDEA_OWNER_KEYS: &[&str] = &[
    "idea_owner_ids",
    "ideaOwnerIds",
    "idea_owners",
    "ideaOwners",
    "idea_owner_id",
    "ideaOwnerId",
];
const EDITOR_KEYS: &[&str] = &["editor_ids", "editorIds", "editors", "editor_id", "editorId"];
const UNSCHEDULED_KEYS: &[&str] = &["is_unscheduled", "isUnscheduled", "unscheduled"];
const TEAM_POOL_KEYS: &[&str] = &["is_team_task", "isTeamTask", "team_pool", "teamPool"];
const STATUS_KEYS: &[&str] = &["status", "state"];
const PLATFORM_KEYS: &[&str] = &["platforms", "platform", "target_platforms", "targetPlatforms"];
const REVIEW_KEYS: &[&str] = &["review_sessions", "reviewSessions"];
const ROUND_KEYS: &[&str] = &["round", "round_number", "roundNumber"];
const REVIEWER_KEYS: &[&str] = &["reviewer_id", "reviewerId", "reviewer"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Map one raw row into a [`Task`].
pub fn normalize(fields: &RawFields, kind: SourceKind) -> Result<Task, NormalizeError> {
    let row = Lookup::new(fields, kind);
    let id = row.string(ID_KEYS).ok_or(NormalizeError::MissingId)?;

    let is_unscheduled = row.flag(UNSCHEDULED_KEYS).unwrap_or(false);
    let start = row.date(START_KEYS, "start date", &id)?;
    let end = row.date(END_KEYS, "end date", &id)?;

    let span = match (start, end) {
        (Some(start), Some(end)) => {
            if end < start {
                tracing::warn!(task = %id, %start, %end, "end date before start date, clamping to start");
            }
            Some(DateSpan::new(start, end))
        }
        (Some(day), None) | (None, Some(day)) => Some(DateSpan::single(day)),
        (None, None) if is_unscheduled => None,
        (None, None) => return Err(NormalizeError::MissingDates { id }),
    };

    let owners = Owners {
        assignees: row.owners(ASSIGNEE_KEYS),
        idea_owners: row.owners(IDEA_OWNER_KEYS),
        editors: row.owners(EDITOR_KEYS),
    };
    if owners.is_empty() {
        return Err(NormalizeError::NoOwners { id });
    }

    Ok(Task {
        title: row.string(TITLE_KEYS).unwrap_or_else(|| "Untitled".to_string()),
        id: TaskId::new(id),
        kind,
        span,
        owners,
        is_unscheduled,
        is_team_pool: row.flag(TEAM_POOL_KEYS).unwrap_or(false),
        status: row.string(STATUS_KEYS),
        platforms: string_list(row.value(PLATFORM_KEYS)),
        review_sessions: row.review_sessions(),
    })
}

/// Normalize a batch, dropping and logging records that fail.
///
/// Returns the tasks that made it and the number of records skipped.
pub fn normalize_batch<'a, I>(records: I) -> (Vec<Task>, usize)
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut tasks = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        match normalize(&record.fields, record.kind) {
            Ok(task) => tasks.push(task),
            Err(e) => {
                tracing::warn!(
                    table = record.kind.table(),
                    record = record.id().as_deref().unwrap_or("?"),
                    "skipping record: {e}"
                );
                skipped += 1;
            }
        }
    }
    (tasks, skipped)
}

/// Parse a date in any of the accepted formats, including RFC 3339 timestamps.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.date_naive());
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // "2024-03-04T10:00:00" without an offset, or a "2024-03-04 10:00" variant.
    let (day, time) = (s.get(..10)?, s.get(10..)?);
    if !time.starts_with(['T', ' ']) {
        return None;
    }
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Alias lookups over one row.
///
/// When a row carries the same attribute under both namings, the source
/// table's own naming wins: camelCase for generic tasks, snake_case for
/// content items. Writes go out in that naming, so this is what keeps a
/// reschedule from being shadowed by a stale migrated column.
struct Lookup<'f> {
    fields: &'f RawFields,
    kind: SourceKind,
}

impl<'f> Lookup<'f> {
    fn new(fields: &'f RawFields, kind: SourceKind) -> Self {
        Self { fields, kind }
    }

    /// `keys` reordered so the table's own naming comes first.
    fn ordered<'k>(&self, keys: &'k [&'k str]) -> impl Iterator<Item = &'k str> {
        let native_camel = self.kind == SourceKind::GenericTask;
        let is_camel = |key: &&&str| key.chars().any(|c| c.is_ascii_uppercase());
        let native = keys.iter().filter(move |k| is_camel(k) == native_camel);
        let foreign = keys.iter().filter(move |k| is_camel(k) != native_camel);
        native.chain(foreign).copied()
    }

    fn value(&self, keys: &[&str]) -> Option<&'f Value> {
        self.ordered(keys)
            .filter_map(|key| self.fields.get(key))
            .find(|value| !is_blank(value))
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        self.value(keys).and_then(scalar_string)
    }

    fn flag(&self, keys: &[&str]) -> Option<bool> {
        self.value(keys).and_then(|value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" | "y" => Some(true),
                "false" | "no" | "0" | "n" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    fn date(
        &self,
        keys: &[&str],
        field: &'static str,
        id: &str,
    ) -> Result<Option<NaiveDate>, NormalizeError> {
        let Some(value) = self.value(keys) else {
            return Ok(None);
        };
        let raw = scalar_string(value).unwrap_or_else(|| value.to_string());
        match parse_date(&raw) {
            Some(date) => Ok(Some(date)),
            None => Err(NormalizeError::InvalidDate {
                id: id.to_string(),
                field,
                value: raw,
            }),
        }
    }

    /// Owner ids for one role bucket.
    ///
    /// An empty list under the table's primary column is an explicit "no
    /// owners in this role" and hides older migrated columns.
    fn owners(&self, keys: &[&str]) -> Vec<OwnerId> {
        let primary = self.ordered(keys).next().and_then(|key| self.fields.get(key));
        if matches!(primary, Some(Value::Array(items)) if items.is_empty()) {
            return Vec::new();
        }
        string_list(self.value(keys))
            .into_iter()
            .map(OwnerId::new)
            .collect()
    }

    fn review_sessions(&self) -> Vec<ReviewSession> {
        let Some(Value::Array(items)) = self.value(REVIEW_KEYS) else {
            return Vec::new();
        };
        let mut sessions: Vec<ReviewSession> = items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let session = Lookup::new(obj, self.kind);
                ReviewSession {
                    round: session
                        .value(ROUND_KEYS)
                        .and_then(|v| v.as_u64().or_else(|| v.as_str()?.trim().parse().ok()))
                        .and_then(|n| u32::try_from(n).ok())
                        .unwrap_or(0),
                    status: session.string(STATUS_KEYS),
                    reviewer: session.string(REVIEWER_KEYS).map(OwnerId::new),
                }
            })
            .collect();
        sessions.sort_by_key(|s| s.round);
        sessions
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A scalar, an array, or a comma-separated string, coerced to a list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |s: String| {
        for part in s.split(',') {
            let part = part.trim();
            if !part.is_empty() && !out.iter().any(|existing| existing == part) {
                out.push(part.to_string());
            }
        }
    };
    match value {
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(s) = scalar_string(item).or_else(|| object_id(item)) {
                    push(s);
                }
            }
        }
        Some(other) => {
            if let Some(s) = scalar_string(other).or_else(|| object_id(other)) {
                push(s);
            }
        }
        None => {}
    }
    out
}

/// Owner entries are sometimes embedded profile objects; use their id.
fn object_id(value: &Value) -> Option<String> {
    value
        .as_object()
        .and_then(|obj| Lookup::new(obj, SourceKind::ContentItem).string(&["id", "user_id", "userId"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> RawFields {
        value.as_object().cloned().unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn snake_case_content_item() {
        let raw = fields(json!({
            "id": "c-1",
            "title": "Launch reel",
            "start_date": "2024-03-04",
            "end_date": "2024-03-06",
            "assignee_ids": ["ana"],
            "idea_owner_id": "bo",
            "platform": "instagram",
            "review_sessions": [
                {"round_number": 2, "status": "approved"},
                {"round_number": 1, "status": "changes", "reviewer_id": "cy"}
            ]
        }));
        let task = normalize(&raw, SourceKind::ContentItem).unwrap();

        assert_eq!(task.id.as_str(), "c-1");
        assert_eq!(task.kind, SourceKind::ContentItem);
        assert_eq!(task.span, Some(DateSpan::new(d(2024, 3, 4), d(2024, 3, 6))));
        assert_eq!(task.owners.flatten().len(), 2);
        assert_eq!(task.platforms, vec!["instagram"]);
        assert_eq!(task.review_sessions[0].round, 1);
        assert_eq!(task.review_sessions[0].reviewer, Some(OwnerId::new("cy")));
        assert_eq!(task.review_sessions[1].round, 2);
    }

    #[test]
    fn camel_case_generic_task() {
        let raw = fields(json!({
            "taskId": 42,
            "name": "Write brief",
            "startDate": "2024-03-04T09:30:00+02:00",
            "dueDate": "06/03/2024",
            "assigneeIds": "ana, bo",
            "targetPlatforms": ["web", "web", "ios"],
            "isTeamTask": "yes"
        }));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();

        assert_eq!(task.id.as_str(), "42");
        assert_eq!(task.title, "Write brief");
        assert_eq!(task.span, Some(DateSpan::new(d(2024, 3, 4), d(2024, 3, 6))));
        assert_eq!(task.owners.assignees.len(), 2);
        assert_eq!(task.platforms, vec!["web", "ios"]);
        assert!(task.is_team_pool);
    }

    #[test]
    fn one_date_makes_single_day_task() {
        let raw = fields(json!({"id": "t", "deadline": "2024-03-08", "editorId": "cy"}));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();
        assert_eq!(task.span, Some(DateSpan::single(d(2024, 3, 8))));
    }

    #[test]
    fn missing_dates_rejected_unless_unscheduled() {
        let raw = fields(json!({"id": "t", "assignees": ["ana"]}));
        assert_eq!(
            normalize(&raw, SourceKind::GenericTask),
            Err(NormalizeError::MissingDates { id: "t".into() })
        );

        let raw = fields(json!({"id": "t", "assignees": ["ana"], "is_unscheduled": true}));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();
        assert!(task.is_unscheduled);
        assert!(task.scheduled_span().is_none());
    }

    #[test]
    fn garbage_date_is_an_error() {
        let raw = fields(json!({"id": "t", "start_date": "soon", "assignees": ["ana"]}));
        assert!(matches!(
            normalize(&raw, SourceKind::ContentItem),
            Err(NormalizeError::InvalidDate { field: "start date", .. })
        ));
    }

    #[test]
    fn ownerless_and_idless_records_rejected() {
        let raw = fields(json!({"id": "t", "start_date": "2024-03-04"}));
        assert_eq!(
            normalize(&raw, SourceKind::ContentItem),
            Err(NormalizeError::NoOwners { id: "t".into() })
        );
        let raw = fields(json!({"start_date": "2024-03-04", "assignees": ["ana"]}));
        assert_eq!(normalize(&raw, SourceKind::ContentItem), Err(NormalizeError::MissingId));
    }

    #[test]
    fn inverted_range_is_clamped() {
        let raw = fields(json!({
            "id": "t", "start": "2024-03-06", "end": "2024-03-04", "assignees": [{"id": "ana"}]
        }));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();
        assert_eq!(task.span, Some(DateSpan::single(d(2024, 3, 6))));
        assert_eq!(task.owners.assignees, vec![OwnerId::new("ana")]);
    }

    #[test]
    fn native_naming_wins_over_migrated_column() {
        let raw = fields(json!({
            "id": "t",
            "start_date": "2024-01-01",
            "startDate": "2024-03-04",
            "assignee_ids": ["old"],
            "assigneeIds": ["new"]
        }));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();
        assert_eq!(task.span, Some(DateSpan::single(d(2024, 3, 4))));
        assert_eq!(task.owners.assignees, vec![OwnerId::new("new")]);

        let task = normalize(&raw, SourceKind::ContentItem).unwrap();
        assert_eq!(task.span, Some(DateSpan::new(d(2024, 1, 1), d(2024, 1, 1))));
        assert_eq!(task.owners.assignees, vec![OwnerId::new("old")]);
    }

    #[test]
    fn emptied_primary_owner_column_hides_migrated_one() {
        let raw = fields(json!({
            "id": "t",
            "startDate": "2024-03-04",
            "assigneeIds": ["cy"],
            "editorIds": [],
            "editor_ids": ["ana"]
        }));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();
        assert_eq!(task.owners.flatten(), vec![OwnerId::new("cy")]);

        // Without the primary column the migrated one still counts.
        let raw = fields(json!({
            "id": "t", "startDate": "2024-03-04", "editor_ids": ["ana"]
        }));
        let task = normalize(&raw, SourceKind::GenericTask).unwrap();
        assert_eq!(task.owners.editors, vec![OwnerId::new("ana")]);
    }

    #[test]
    fn timestamp_prefix_needs_a_time_separator() {
        assert_eq!(parse_date("2024-03-04T10:00:00"), Some(d(2024, 3, 4)));
        assert_eq!(parse_date("2024-03-04 10:00"), Some(d(2024, 3, 4)));
        assert_eq!(parse_date("2024-03-04oops"), None);
        assert_eq!(parse_date("2024-03-0"), None);
    }

    #[test]
    fn batch_skips_bad_records() {
        let records = vec![
            RawRecord::new(
                SourceKind::ContentItem,
                fields(json!({"id": "ok", "start_date": "2024-03-04", "assignee_id": "ana"})),
            ),
            RawRecord::new(SourceKind::GenericTask, fields(json!({"id": "bad"}))),
        ];
        let (tasks, skipped) = normalize_batch(&records);
        assert_eq!(tasks.len(), 1);
        assert_eq!(skipped, 1);
    }
}
