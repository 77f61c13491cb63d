//! Ticket notes: one vault note per issue, named after its key.
//!
//! Cards link `[[ABC-123]]`; creating `ABC-123.md` makes those links resolve.
//! Obsidian resolves a link by note name anywhere in the vault, so a note
//! named after the key in any folder counts as existing. Existing notes are
//! never touched.

use std::collections::HashSet;

use chrono::NaiveDate;
use kanban_core::ExternalRecord;
use obsidian_fs::{build_note_with_frontmatter, join_uri, Frontmatter};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::config::TicketNotesConfig;
use crate::storage::Storage;

/// What a ticket-note pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotesReport {
    /// Vault URIs of notes created this run
    pub created: Vec<String>,
    /// Notes that could not be checked or written
    pub failed: usize,
}

/// Create a note for every record that does not have one yet.
///
/// Failures are logged and counted; they never stop the run.
pub async fn ensure_ticket_notes<S>(
    storage: &S,
    settings: &TicketNotesConfig,
    records: &[ExternalRecord],
    today: NaiveDate,
) -> NotesReport
where
    S: Storage + ?Sized,
{
    let mut report = NotesReport::default();
    let template = load_template(storage, settings).await;
    let existing = note_names(storage).await;

    for record in records {
        let uri = join_uri(&settings.folder, &record.key);

        let found = match &existing {
            Some(names) => Ok(names.contains(record.key.as_str())),
            None => storage.exists(&uri).await,
        };
        match found {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!("Could not check ticket note {}: {}", uri, e);
                report.failed += 1;
                continue;
            }
        }

        let content = match &template {
            Some(template) => render_template(template, record, today),
            None => match default_note(record, today) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Could not build ticket note {}: {}", uri, e);
                    report.failed += 1;
                    continue;
                }
            },
        };

        match storage.write(&uri, &content, None).await {
            Ok(_) => {
                debug!("Created ticket note {}", uri);
                report.created.push(uri);
            }
            Err(e) => {
                warn!("Could not create ticket note {}: {}", uri, e);
                report.failed += 1;
            }
        }
    }

    if !report.created.is_empty() {
        info!("Created {} ticket note(s)", report.created.len());
    }
    report
}

/// Names (last path segment) of every note in the vault.
///
/// `None` when the vault cannot be listed; callers then check the target path only.
async fn note_names<S>(storage: &S) -> Option<HashSet<String>>
where
    S: Storage + ?Sized,
{
    match storage.list("").await {
        Ok(uris) => Some(
            uris.iter()
                .map(|uri| uri.rsplit('/').next().unwrap_or(uri).to_string())
                .collect(),
        ),
        Err(e) => {
            warn!("Could not list vault notes: {}", e);
            None
        }
    }
}

async fn load_template<S>(storage: &S, settings: &TicketNotesConfig) -> Option<String>
where
    S: Storage + ?Sized,
{
    let uri = settings.template.as_deref()?;
    match storage.read(uri).await {
        Ok((content, _)) => Some(content),
        Err(e) => {
            warn!("Ticket template {} unavailable, using default: {}", uri, e);
            None
        }
    }
}

/// Fill `{{key}}`, `{{summary}}`, `{{status}}` and `{{date}}`.
pub fn render_template(template: &str, record: &ExternalRecord, today: NaiveDate) -> String {
    template
        .replace("{{key}}", &record.key)
        .replace("{{summary}}", &record.summary)
        .replace("{{status}}", &record.status)
        .replace("{{date}}", &today.format("%Y-%m-%d").to_string())
}

fn default_note(
    record: &ExternalRecord,
    today: NaiveDate,
) -> Result<String, obsidian_fs::FrontmatterError> {
    let mut frontmatter = Frontmatter::new();
    frontmatter.insert("jira-key".into(), JsonValue::String(record.key.clone()));
    frontmatter.insert("summary".into(), JsonValue::String(record.summary.clone()));
    frontmatter.insert("status".into(), JsonValue::String(record.status.clone()));
    frontmatter.insert(
        "created".into(),
        JsonValue::String(today.format("%Y-%m-%d").to_string()),
    );

    let body = if record.summary.is_empty() {
        format!("\n# {}\n", record.key)
    } else {
        format!("\n# {}\n\n{}\n", record.key, record.summary)
    };
    build_note_with_frontmatter(&frontmatter, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use obsidian_fs::parse_frontmatter;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn records() -> Vec<ExternalRecord> {
        vec![
            ExternalRecord::new("ABC-1", "To Do", "Login page"),
            ExternalRecord::new("ABC-2", "Done", ""),
        ]
    }

    #[tokio::test]
    async fn creates_default_notes_in_folder() {
        let storage = MemoryStorage::new();
        let settings = TicketNotesConfig {
            folder: "Jira".into(),
            template: None,
        };

        let report = ensure_ticket_notes(&storage, &settings, &records(), today()).await;
        assert_eq!(report.created, vec!["Jira/ABC-1", "Jira/ABC-2"]);
        assert_eq!(report.failed, 0);

        let note = storage.get("Jira/ABC-1").unwrap();
        let parsed = parse_frontmatter(&note);
        let fm = parsed.frontmatter.unwrap();
        assert_eq!(fm["jira-key"], "ABC-1");
        assert_eq!(fm["status"], "To Do");
        assert_eq!(fm["created"], "2024-03-09");
        assert!(parsed.content.contains("# ABC-1\n\nLogin page"));
    }

    #[tokio::test]
    async fn existing_notes_are_left_alone() {
        let storage = MemoryStorage::with_notes([("ABC-1", "my notes")]);
        let settings = TicketNotesConfig::default();

        let report = ensure_ticket_notes(&storage, &settings, &records(), today()).await;
        assert_eq!(report.created, vec!["ABC-2"]);
        assert_eq!(storage.get("ABC-1").as_deref(), Some("my notes"));
    }

    #[tokio::test]
    async fn note_in_another_folder_counts_as_existing() {
        let storage = MemoryStorage::with_notes([("Projects/Auth/ABC-1", "kept elsewhere")]);
        let settings = TicketNotesConfig {
            folder: "Jira".into(),
            template: None,
        };

        let report = ensure_ticket_notes(&storage, &settings, &records(), today()).await;
        assert_eq!(report.created, vec!["Jira/ABC-2"]);
        assert!(storage.get("Jira/ABC-1").is_none());
        assert_eq!(storage.get("Projects/Auth/ABC-1").as_deref(), Some("kept elsewhere"));
    }

    #[tokio::test]
    async fn template_placeholders_are_filled() {
        let storage = MemoryStorage::with_notes([(
            "Templates/Ticket",
            "# {{key}}: {{summary}}\nStatus: {{status}}\nOpened {{date}}\n",
        )]);
        let settings = TicketNotesConfig {
            folder: "".into(),
            template: Some("Templates/Ticket".into()),
        };

        ensure_ticket_notes(&storage, &settings, &records()[..1], today()).await;
        assert_eq!(
            storage.get("ABC-1").as_deref(),
            Some("# ABC-1: Login page\nStatus: To Do\nOpened 2024-03-09\n")
        );
    }

    #[tokio::test]
    async fn missing_template_falls_back_to_default() {
        let storage = MemoryStorage::new();
        let settings = TicketNotesConfig {
            folder: "Jira".into(),
            template: Some("Templates/Gone".into()),
        };

        let report = ensure_ticket_notes(&storage, &settings, &records()[..1], today()).await;
        assert_eq!(report.created.len(), 1);
        assert!(storage.get("Jira/ABC-1").unwrap().starts_with("---\n"));
    }
}
