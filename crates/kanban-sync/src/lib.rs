//! kanban-sync: keeps an Obsidian kanban board note in step with Jira.
//!
//! Library exports for the `kanban-sync` binary and integration tests.

pub mod config;
pub mod notes;
pub mod storage;
pub mod sync;
pub mod tracker;

pub use config::{AccountConfig, BoardConfig, Config, ConfigError, JiraApi, TicketNotesConfig};
pub use storage::{ContentHash, FileStorage, MemoryStorage, Storage, StorageError};
pub use sync::{run_sync, run_tidy, SyncError, SyncOptions, SyncOutcome, SyncSummary};
pub use tracker::{fetch_all, IssueTracker, JiraClient, SearchResults, TrackerError};
