use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::SourceKind;

/// Untyped backend row, keyed by whatever field names its table uses.
pub type RawFields = Map<String, Value>;

/// A raw row tagged with the table it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: SourceKind,
    pub fields: RawFields,
}

impl RawRecord {
    pub fn new(kind: SourceKind, fields: RawFields) -> Self {
        Self { kind, fields }
    }

    /// Best-effort id lookup used for logging and updates.
    pub fn id(&self) -> Option<String> {
        ["id", "uuid", "task_id", "taskId"]
            .iter()
            .find_map(|key| match self.fields.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// Both source tables plus metadata, as stored in a dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub content_items: Vec<RawFields>,
    #[serde(default)]
    pub tasks: Vec<RawFields>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

fn default_name() -> String {
    "Untitled Planner".to_string()
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            name: default_name(),
            content_items: Vec::new(),
            tasks: Vec::new(),
            created: Utc::now(),
            modified: Utc::now(),
        }
    }
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn table(&self, kind: SourceKind) -> &Vec<RawFields> {
        match kind {
            SourceKind::ContentItem => &self.content_items,
            SourceKind::GenericTask => &self.tasks,
        }
    }

    pub fn table_mut(&mut self, kind: SourceKind) -> &mut Vec<RawFields> {
        match kind {
            SourceKind::ContentItem => &mut self.content_items,
            SourceKind::GenericTask => &mut self.tasks,
        }
    }

    /// Every row of both tables, tagged with its source.
    pub fn records(&self) -> Vec<RawRecord> {
        SourceKind::ALL
            .iter()
            .flat_map(|kind| {
                self.table(*kind)
                    .iter()
                    .map(|fields| RawRecord::new(*kind, fields.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.content_items.len() + self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}
