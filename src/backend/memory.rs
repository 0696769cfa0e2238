use std::cell::{Cell, RefCell};
use std::path::PathBuf;

use crate::error::BackendError;
use crate::io::{file, normalize};
use crate::model::{Dataset, LoadRange, RawFields, RawRecord, SourceKind, Task, TaskId};

use super::{ChangeCallback, ChangeEvent, ChangeKind, SubscriptionId, TaskBackend};

struct Subscriber {
    id: SubscriptionId,
    tables: Vec<SourceKind>,
    callback: ChangeCallback,
}

/// Two in-memory tables with change notifications.
///
/// Single-threaded: state sits behind `RefCell`s and callbacks run inline on
/// every write. Callbacks must not call back into the backend.
pub struct MemoryBackend {
    dataset: RefCell<Dataset>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_subscription: Cell<u64>,
    persist_to: Option<PathBuf>,
    offline: Cell<bool>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Dataset::default())
    }
}

impl MemoryBackend {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: RefCell::new(dataset),
            subscribers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(1),
            persist_to: None,
            offline: Cell::new(false),
        }
    }

    /// Write the dataset back to `path` after every change.
    pub fn persisting_to(mut self, path: PathBuf) -> Self {
        self.persist_to = Some(path);
        self
    }

    pub fn persist_path(&self) -> Option<&PathBuf> {
        self.persist_to.as_ref()
    }

    /// Simulate a network outage: every call fails until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn snapshot(&self) -> Dataset {
        self.dataset.borrow().clone()
    }

    pub fn insert(&self, kind: SourceKind, fields: RawFields) -> Result<(), BackendError> {
        self.ensure_online()?;
        {
            let mut dataset = self.dataset.borrow_mut();
            dataset.table_mut(kind).push(fields);
            dataset.touch();
        }
        self.persist()?;
        self.emit(ChangeEvent {
            table: kind,
            kind: ChangeKind::Insert,
        });
        Ok(())
    }

    pub fn delete(&self, kind: SourceKind, id: &TaskId) -> Result<(), BackendError> {
        self.ensure_online()?;
        {
            let mut dataset = self.dataset.borrow_mut();
            let table = dataset.table_mut(kind);
            let before = table.len();
            table.retain(|row| row_id(kind, row).as_deref() != Some(id.as_str()));
            if table.len() == before {
                return Err(BackendError::NotFound {
                    kind,
                    id: id.to_string(),
                });
            }
            dataset.touch();
        }
        self.persist()?;
        self.emit(ChangeEvent {
            table: kind,
            kind: ChangeKind::Delete,
        });
        Ok(())
    }

    fn ensure_online(&self) -> Result<(), BackendError> {
        if self.offline.get() {
            Err(BackendError::Unavailable("backend is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn persist(&self) -> Result<(), BackendError> {
        if let Some(path) = &self.persist_to {
            file::save_dataset(&self.dataset.borrow(), path)?;
        }
        Ok(())
    }

    fn emit(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers.borrow_mut();
        for sub in subscribers.iter_mut() {
            if sub.tables.contains(&event.table) {
                (sub.callback)(&event);
            }
        }
    }

    /// Rows of both tables matching `keep`, judged on their normalized form.
    ///
    /// Rows that fail normalization are returned as-is so the caller sees and
    /// reports them; they never match the backlog query.
    fn select(&self, keep: impl Fn(&Task) -> bool, keep_broken: bool) -> Vec<RawRecord> {
        self.dataset
            .borrow()
            .records()
            .into_iter()
            .filter(|record| match normalize::normalize(&record.fields, record.kind) {
                Ok(task) => keep(&task),
                Err(_) => keep_broken,
            })
            .collect()
    }
}

fn row_id(kind: SourceKind, fields: &RawFields) -> Option<String> {
    RawRecord::new(kind, fields.clone()).id()
}

impl TaskBackend for MemoryBackend {
    fn fetch_tasks_in_range(&self, range: &LoadRange) -> Result<Vec<RawRecord>, BackendError> {
        self.ensure_online()?;
        Ok(self.select(
            |task| {
                task.scheduled_span()
                    .is_some_and(|span| range.intersects(&span))
            },
            true,
        ))
    }

    fn fetch_all_tasks(&self) -> Result<Vec<RawRecord>, BackendError> {
        self.ensure_online()?;
        Ok(self.select(|task| !task.is_unscheduled, true))
    }

    fn fetch_unscheduled_tasks(&self) -> Result<Vec<RawRecord>, BackendError> {
        self.ensure_online()?;
        Ok(self.select(|task| task.is_unscheduled, false))
    }

    fn update_task(
        &self,
        kind: SourceKind,
        id: &TaskId,
        fields: RawFields,
    ) -> Result<(), BackendError> {
        self.ensure_online()?;
        {
            let mut dataset = self.dataset.borrow_mut();
            let row = dataset
                .table_mut(kind)
                .iter_mut()
                .find(|row| row_id(kind, row).as_deref() == Some(id.as_str()))
                .ok_or_else(|| BackendError::NotFound {
                    kind,
                    id: id.to_string(),
                })?;
            for (key, value) in fields {
                row.insert(key, value);
            }
            dataset.touch();
        }
        self.persist()?;
        self.emit(ChangeEvent {
            table: kind,
            kind: ChangeKind::Update,
        });
        Ok(())
    }

    fn subscribe_to_changes(
        &self,
        tables: &[SourceKind],
        on_event: ChangeCallback,
    ) -> Result<SubscriptionId, BackendError> {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            tables: tables.to_vec(),
            callback: on_event,
        });
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|sub| sub.id != id);
    }
}
