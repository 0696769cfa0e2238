pub mod backlog;
pub mod dialogs;
pub mod theme;
pub mod toolbar;
pub mod week_grid;
