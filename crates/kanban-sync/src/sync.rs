//! One synchronization run against a board note.
//!
//! read board -> check opt-in flag -> fetch issues -> reconcile -> ticket notes -> write.
//! The board is written at most once, with the hash observed when it was read.

use chrono::NaiveDate;
use kanban_core::{ReconcileReport, RecordSet};
use obsidian_fs::{auto_update_state, enable_auto_update, AutoUpdate};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BoardConfig;
use crate::notes::{ensure_ticket_notes, NotesReport};
use crate::storage::{NoteMetadata, Storage, StorageError};
use crate::tracker::{fetch_all, IssueTracker};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Board note not found: {0}")]
    BoardNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Compute everything, write nothing
    pub dry_run: bool,
    /// Date stamped into new ticket notes
    pub today: NaiveDate,
}

impl SyncOptions {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// Counts and changes from a reconciling run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// Issues returned across all accounts, before validation
    pub fetched: usize,
    pub report: ReconcileReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<NotesReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The opt-in flag was missing and has been added; the board is reconciled next run
    Bootstrapped { written: bool },
    /// The board opted out with `autoUpdateKanban: false`
    Disabled,
    /// Nothing on the board changed
    Unchanged(SyncSummary),
    /// The board was rewritten
    Updated {
        #[serde(flatten)]
        summary: SyncSummary,
        hash: String,
    },
    /// Dry run: the board that would have been written
    Preview {
        #[serde(flatten)]
        summary: SyncSummary,
        text: String,
    },
}

async fn read_board<S>(storage: &S, uri: &str) -> Result<(String, NoteMetadata), SyncError>
where
    S: Storage + ?Sized,
{
    storage.read(uri).await.map_err(|e| match e {
        StorageError::NotFound { uri } => SyncError::BoardNotFound(uri),
        other => SyncError::Storage(other),
    })
}

/// Run a full synchronization of `settings.board` against `trackers`.
pub async fn run_sync<S>(
    storage: &S,
    trackers: &[Box<dyn IssueTracker>],
    settings: &BoardConfig,
    options: &SyncOptions,
) -> Result<SyncOutcome, SyncError>
where
    S: Storage + ?Sized,
{
    let (content, meta) = read_board(storage, &settings.board).await?;

    match auto_update_state(&content) {
        AutoUpdate::Enabled => {}
        AutoUpdate::Disabled => {
            info!("{} has autoUpdateKanban disabled; skipping", settings.board);
            return Ok(SyncOutcome::Disabled);
        }
        AutoUpdate::Unset => {
            if !options.dry_run {
                let text = enable_auto_update(&content);
                storage
                    .write(&settings.board, &text, Some(&meta.hash))
                    .await?;
            }
            info!(
                "Enabled autoUpdateKanban on {}; the board will be reconciled on the next run",
                settings.board
            );
            return Ok(SyncOutcome::Bootstrapped {
                written: !options.dry_run,
            });
        }
    }

    let fetched = fetch_all(trackers, &settings.query).await;
    let fetched_count = fetched.seen();
    let records = RecordSet::from_records(fetched.records);

    let mut reconciliation = settings.reconciler().reconcile(&content, &records.records);
    reconciliation.report.rejected = records.rejected.len() + fetched.rejected;

    let notes = match &settings.ticket_notes {
        Some(notes) if !options.dry_run => {
            Some(ensure_ticket_notes(storage, notes, &records.records, options.today).await)
        }
        _ => None,
    };

    let summary = SyncSummary {
        fetched: fetched_count,
        report: reconciliation.report,
        notes,
    };

    if !reconciliation.changed {
        debug!("{} already up to date", settings.board);
        return Ok(SyncOutcome::Unchanged(summary));
    }

    if options.dry_run {
        return Ok(SyncOutcome::Preview {
            summary,
            text: reconciliation.text,
        });
    }

    let written = storage
        .write(&settings.board, &reconciliation.text, Some(&meta.hash))
        .await?;
    info!(
        "Updated {}: {} added, {} moved, {} duplicate(s) removed, {} completed",
        settings.board,
        summary.report.added.len(),
        summary.report.moved.len(),
        summary.report.duplicates_removed.len(),
        summary.report.completed
    );

    Ok(SyncOutcome::Updated {
        summary,
        hash: written.hash.to_string(),
    })
}

/// Normalize spacing and check off done columns without contacting any tracker.
///
/// Ignores the opt-in flag: tidying is always an explicit request.
pub async fn run_tidy<S>(
    storage: &S,
    settings: &BoardConfig,
    dry_run: bool,
) -> Result<SyncOutcome, SyncError>
where
    S: Storage + ?Sized,
{
    let (content, meta) = read_board(storage, &settings.board).await?;
    let tidied = settings.reconciler().tidy(&content);

    let summary = SyncSummary {
        report: tidied.report,
        ..Default::default()
    };

    if !tidied.changed {
        return Ok(SyncOutcome::Unchanged(summary));
    }
    if dry_run {
        return Ok(SyncOutcome::Preview {
            summary,
            text: tidied.text,
        });
    }

    let written = storage
        .write(&settings.board, &tidied.text, Some(&meta.hash))
        .await?;
    info!("Tidied {}", settings.board);
    Ok(SyncOutcome::Updated {
        summary,
        hash: written.hash.to_string(),
    })
}
