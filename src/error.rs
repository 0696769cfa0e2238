//! Error types for the planner core.

use std::path::PathBuf;

use crate::model::{SourceKind, TaskKey};

/// Why a raw record could not become a [`crate::model::Task`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("record has no id")]
    MissingId,

    #[error("record {id} has neither a start nor an end date")]
    MissingDates { id: String },

    #[error("record {id} has an unparseable {field}: '{value}'")]
    InvalidDate {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("record {id} has no assignees, idea owners or editors")]
    NoOwners { id: String },
}

/// Failures reported by a [`crate::backend::TaskBackend`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("no {} record with id {id}", kind.table())]
    NotFound { kind: SourceKind, id: String },

    #[error("failed to persist dataset: {0}")]
    Persist(#[from] DatasetError),
}

/// Rejected drag-and-drop reschedules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("task {0} is not loaded")]
    UnknownTask(TaskKey),

    #[error("task {0} belongs to a team pool and cannot be dragged")]
    NotDraggable(TaskKey),

    #[error("task {0} is unscheduled")]
    Unscheduled(TaskKey),
}

/// Loading or saving dataset files.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dataset JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV {path} is empty or has no data rows")]
    EmptyCsv { path: PathBuf },
}

/// Loading or saving the settings file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
