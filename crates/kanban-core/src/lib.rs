//! kanban-core: keeps a markdown kanban board in step with an issue tracker.
//!
//! The board is plain text: level-2 headings are columns and checkbox lines
//! linking a tracker key (`- [ ] [[ABC-123]]`) are cards. A reconciliation
//! run removes duplicate cards, adds cards for new issues, moves cards whose
//! status changed, normalizes blank lines and checks off cards in columns
//! that open with the done marker. Everything else in the document is left
//! alone, and running twice with the same records changes nothing.
//!
//! This crate does no I/O.

pub mod completion;
pub mod normalize;
pub mod placement;
pub mod reconcile;
pub mod record;
pub mod section;
pub mod task;

pub use completion::mark_complete;
pub use normalize::normalize;
pub use placement::{is_column_name, resolve, PlacementMap};
pub use reconcile::{
    dedupe, Added, Moved, ReconcileReport, Reconciler, Reconciliation, DEFAULT_DONE_MARKER,
};
pub use record::{ExternalRecord, RecordError, RecordSet};
pub use section::{Section, SectionIndex};
pub use task::{locate, TaskReference};
