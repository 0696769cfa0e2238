//! Turns backend change notifications into store re-fetches.
//!
//! Notifications carry no payload worth merging, so every burst of them
//! between two polls collapses into a single re-fetch request.

use std::sync::mpsc::{self, Receiver};

use crate::backend::{ChangeEvent, SubscriptionId, TaskBackend};
use crate::error::BackendError;
use crate::model::SourceKind;

use super::store::PlannerStore;

pub struct ChangeFeedListener {
    subscription: Option<SubscriptionId>,
    events: Receiver<ChangeEvent>,
    received: u64,
}

impl ChangeFeedListener {
    /// Subscribe to `tables` on `backend`.
    pub fn attach(backend: &dyn TaskBackend, tables: &[SourceKind]) -> Result<Self, BackendError> {
        let (tx, rx) = mpsc::channel();
        let subscription = backend.subscribe_to_changes(
            tables,
            Box::new(move |event: &ChangeEvent| {
                // The listener may already be gone; nothing to do then.
                let _ = tx.send(*event);
            }),
        )?;
        tracing::debug!(?tables, id = subscription.0, "listening for changes");
        Ok(Self {
            subscription: Some(subscription),
            events: rx,
            received: 0,
        })
    }

    /// Drain queued notifications. Requests at most one re-fetch per call.
    ///
    /// Returns how many notifications were drained.
    pub fn poll(&mut self, store: &mut PlannerStore) -> usize {
        let mut drained = 0usize;
        let mut last = None;
        while let Ok(event) = self.events.try_recv() {
            drained += 1;
            last = Some(event);
        }
        if let Some(event) = last {
            self.received += drained as u64;
            tracing::debug!(drained, table = %event.table.table(), "remote change");
            store.request_refetch("remote change");
        }
        drained
    }

    /// Total notifications seen since attaching.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn detach(&mut self, backend: &dyn TaskBackend) {
        if let Some(id) = self.subscription.take() {
            backend.unsubscribe(id);
            tracing::debug!(id = id.0, "stopped listening for changes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::model::{Dataset, LoadRange, TaskId};
    use crate::sync::window::DateWindow;
    use chrono::NaiveDate;
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup() -> (MemoryBackend, PlannerStore) {
        let mut dataset = Dataset::new("feed");
        dataset.tasks.push(
            json!({"id": "a", "startDate": "2024-03-04", "assigneeIds": ["ana"]})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let backend = MemoryBackend::new(dataset);
        let mut store = PlannerStore::new(DateWindow::new(LoadRange::new(d(2024, 1, 1), d(2024, 3, 31))));
        store.pump(&backend);
        (backend, store)
    }

    fn touch(backend: &MemoryBackend, date: &str) {
        let patch = json!({"startDate": date}).as_object().cloned().unwrap();
        backend
            .update_task(SourceKind::GenericTask, &TaskId::new("a"), patch)
            .unwrap();
    }

    #[test]
    fn burst_of_changes_costs_one_fetch() {
        let (backend, mut store) = setup();
        let mut feed = ChangeFeedListener::attach(&backend, &SourceKind::ALL).unwrap();

        touch(&backend, "2024-03-05");
        touch(&backend, "2024-03-06");
        touch(&backend, "2024-03-07");

        assert_eq!(feed.poll(&mut store), 3);
        assert!(store.pump(&backend).is_some());
        assert!(store.pump(&backend).is_none());
        assert_eq!(store.tasks()[0].span.unwrap().start, d(2024, 3, 7));
        assert_eq!(feed.received(), 3);
    }

    #[test]
    fn quiet_poll_requests_nothing() {
        let (backend, mut store) = setup();
        let mut feed = ChangeFeedListener::attach(&backend, &SourceKind::ALL).unwrap();
        assert_eq!(feed.poll(&mut store), 0);
        assert!(!store.is_refetch_pending());
    }

    #[test]
    fn unwatched_table_is_ignored() {
        let (backend, mut store) = setup();
        let mut feed = ChangeFeedListener::attach(&backend, &[SourceKind::ContentItem]).unwrap();
        touch(&backend, "2024-03-05");
        assert_eq!(feed.poll(&mut store), 0);
    }

    #[test]
    fn detached_listener_goes_quiet() {
        let (backend, mut store) = setup();
        let mut feed = ChangeFeedListener::attach(&backend, &SourceKind::ALL).unwrap();
        feed.detach(&backend);
        assert!(!feed.is_attached());

        touch(&backend, "2024-03-05");
        assert_eq!(feed.poll(&mut store), 0);
        assert!(!store.is_refetch_pending());
    }
}
