pub mod csv_import;
pub mod file;
pub mod normalize;

pub use file::{load_dataset, save_dataset};
pub use normalize::{normalize, normalize_batch};
