//! Keeping the in-memory task set in step with the backend.

pub mod change_feed;
pub mod mutation;
pub mod store;
pub mod window;

pub use change_feed::ChangeFeedListener;
pub use mutation::{reschedule, MutationOutcome, RescheduleCommand, Slot};
pub use store::{
    fetch_records, FetchApplied, FetchRequest, FetchedRecords, ObserverId, PlannerStore,
    StoreEvent,
};
pub use window::{DateWindow, FetchScope, DEFAULT_SLACK_MONTHS};
