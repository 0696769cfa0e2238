pub mod dataset;
pub mod range;
pub mod task;
pub mod week;

pub use dataset::{Dataset, RawFields, RawRecord};
pub use range::LoadRange;
pub use task::{
    DateSpan, OwnerId, OwnerRole, Owners, ReviewSession, SourceKind, Task, TaskId, TaskKey,
};
pub use week::{WeekWindow, DAYS_PER_WEEK};
