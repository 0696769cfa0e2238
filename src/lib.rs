//! Weekly timeline layout engine: normalizes task rows from two source
//! tables, keeps a growing date window loaded, packs each owner's week into
//! rows and applies drag-and-drop reschedules with rollback.

pub mod backend;
pub mod config;
pub mod error;
pub mod io;
pub mod layout;
pub mod logging;
pub mod model;
pub mod sync;
