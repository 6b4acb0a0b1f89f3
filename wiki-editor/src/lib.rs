//! Editor controller for wiki pages
//!
//! [`EditorController`] keeps the page being edited in sync with the wiki
//! server: page CRUD over the REST API, a debounced markdown preview,
//! auto-clearing alerts and a warning when another session saves the page
//! that is open here.

pub mod alert;
pub mod controller;
pub mod scheduler;
pub mod state;

pub use alert::{Alert, AlertKind, AlertSlot, AlertState};
pub use controller::{EditorController, PAGE_CREATED, PAGE_DELETED, PAGE_SAVED};
pub use scheduler::ScheduledTask;
pub use state::{EditorState, PageStatus};
