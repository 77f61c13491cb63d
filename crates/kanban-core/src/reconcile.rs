//! Board reconciliation: dedupe, add, reclassify, then tidy.
//!
//! Every phase takes the document by value and returns the next version.
//! Section and task models are rebuilt from the current text at the start of
//! each phase and after every structural edit; offsets never outlive the
//! text they were computed against.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::debug;

use crate::completion::mark_complete;
use crate::normalize::normalize;
use crate::placement::{resolve, PlacementMap};
use crate::record::{ExternalRecord, RecordSet};
use crate::section::SectionIndex;
use crate::task::{self, task_line};

/// Marker line that flags a column as finished.
pub const DEFAULT_DONE_MARKER: &str = "**Complete**";

static SETTINGS_FOOTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^%% kanban:settings").expect("valid footer regex"));

/// A task added to the board this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Added {
    pub key: String,
    pub section: String,
}

/// A task relocated to match its tracker status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Moved {
    pub key: String,
    /// Previous column, `None` if the line sat above the first heading
    pub from: Option<String>,
    pub to: String,
}

/// What a reconciliation run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// One entry per deleted duplicate line
    pub duplicates_removed: Vec<String>,
    pub added: Vec<Added>,
    pub moved: Vec<Moved>,
    pub sections_created: Vec<String>,
    /// Lines checked off by the completion pass
    pub completed: usize,
    /// Tracker records rejected as malformed
    pub rejected: usize,
}

impl ReconcileReport {
    /// True when no task was deduplicated, added, moved or completed.
    pub fn is_empty(&self) -> bool {
        self.duplicates_removed.is_empty()
            && self.added.is_empty()
            && self.moved.is_empty()
            && self.completed == 0
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub text: String,
    pub report: ReconcileReport,
    /// Whether `text` differs from the input
    pub changed: bool,
}

/// Lines waiting to be inserted, grouped by target column in first-seen order.
#[derive(Debug, Default)]
struct Insertions {
    groups: Vec<(String, Vec<String>)>,
}

impl Insertions {
    fn push(&mut self, section: &str, line: String) {
        match self.groups.iter_mut().find(|(name, _)| name == section) {
            Some((_, lines)) => lines.push(line),
            None => self.groups.push((section.to_string(), vec![line])),
        }
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Reconciles board documents against tracker records.
#[derive(Debug, Clone)]
pub struct Reconciler {
    placement: PlacementMap,
    done_marker: String,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(PlacementMap::default())
    }
}

impl Reconciler {
    pub fn new(placement: PlacementMap) -> Self {
        Self {
            placement,
            done_marker: DEFAULT_DONE_MARKER.to_string(),
        }
    }

    pub fn with_done_marker(mut self, marker: impl AsRef<str>) -> Self {
        self.done_marker = marker.as_ref().trim().to_string();
        self
    }

    pub fn placement(&self) -> &PlacementMap {
        &self.placement
    }

    pub fn done_marker(&self) -> &str {
        &self.done_marker
    }

    /// Run a full reconciliation of `text` against `records`.
    pub fn reconcile(&self, text: &str, records: &[ExternalRecord]) -> Reconciliation {
        let records = RecordSet::from_records(records.iter().cloned());
        let mut report = ReconcileReport {
            rejected: records.rejected.len(),
            ..Default::default()
        };

        let doc = text.replace("\r\n", "\n");

        let (doc, removed) = dedupe(doc);
        report.duplicates_removed = removed;

        let doc = self.add_missing(doc, &records, &mut report);
        let doc = self.reclassify(doc, &records, &mut report);

        let doc = normalize(&doc, &self.done_marker);
        let (doc, completed) = mark_complete(doc, &self.done_marker);
        report.completed = completed;

        debug!(
            "Reconciled board: {} duplicate(s) removed, {} added, {} moved, {} completed",
            report.duplicates_removed.len(),
            report.added.len(),
            report.moved.len(),
            report.completed
        );

        Reconciliation {
            changed: doc != text,
            text: doc,
            report,
        }
    }

    /// Normalize spacing and check off done columns without touching placement.
    pub fn tidy(&self, text: &str) -> Reconciliation {
        let doc = normalize(text, &self.done_marker);
        let (doc, completed) = mark_complete(doc, &self.done_marker);
        Reconciliation {
            changed: doc != text,
            text: doc,
            report: ReconcileReport {
                completed,
                ..Default::default()
            },
        }
    }

    /// Add a line for every record without an occurrence on the board.
    fn add_missing(&self, doc: String, records: &RecordSet, report: &mut ReconcileReport) -> String {
        let mut pending = Insertions::default();
        {
            let index = SectionIndex::build(&doc);
            let present: HashSet<String> = task::locate(&doc, &index)
                .into_iter()
                .map(|t| t.key)
                .collect();

            for record in &records.records {
                if present.contains(&record.key) {
                    continue;
                }
                let target = resolve(&record.status, &self.placement);
                debug!("Adding {} to '{}'", record.key, target);
                pending.push(target, task_line(&record.key));
                report.added.push(Added {
                    key: record.key.clone(),
                    section: target.to_string(),
                });
            }
        }

        self.insert(doc, pending, report)
    }

    /// Move every line whose column no longer matches its record's status.
    fn reclassify(&self, doc: String, records: &RecordSet, report: &mut ReconcileReport) -> String {
        let by_key: HashMap<&str, &ExternalRecord> =
            records.records.iter().map(|r| (r.key.as_str(), r)).collect();

        let mut doomed = Vec::new();
        let mut pending = Insertions::default();
        {
            let index = SectionIndex::build(&doc);
            for task in task::locate(&doc, &index) {
                let Some(record) = by_key.get(task.key.as_str()) else {
                    continue;
                };

                let target = resolve(&record.status, &self.placement);
                let current = task
                    .section
                    .and_then(|i| index.get(i))
                    .map(|s| s.name.as_str());
                if current == Some(target) {
                    continue;
                }

                debug!(
                    "Moving {} from '{}' to '{}'",
                    task.key,
                    current.unwrap_or("(preamble)"),
                    target
                );
                doomed.push(task.offset..task.end());
                pending.push(target, task.line(&doc).to_string());
                report.moved.push(Moved {
                    key: task.key.clone(),
                    from: current.map(str::to_string),
                    to: target.to_string(),
                });
            }
        }

        if pending.is_empty() {
            return doc;
        }

        let doc = remove_spans(doc, doomed);
        self.insert(doc, pending, report)
    }

    /// Insert each group at its column's anchor, creating missing columns.
    fn insert(&self, mut doc: String, pending: Insertions, report: &mut ReconcileReport) -> String {
        for (name, lines) in pending.groups {
            let mut block = String::new();
            for line in &lines {
                block.push_str(line);
                block.push('\n');
            }

            // Rebuilt per group: the previous insertion shifted every offset.
            let index = SectionIndex::build(&doc);
            match index.find(&name) {
                Some(section) => {
                    // Keep the done marker as the first line of the body.
                    let anchor = section
                        .marker_line_end(&doc, &self.done_marker)
                        .unwrap_or(section.start);
                    insert_at_line_start(&mut doc, anchor, &block);
                }
                None => {
                    debug!("Creating section '{}'", name);
                    let at = append_point(&doc);
                    let mut block = format!("\n## {}\n{}", name, block);
                    if at < doc.len() {
                        block.push('\n');
                    }
                    insert_at_line_start(&mut doc, at, &block);
                    report.sections_created.push(name);
                }
            }
        }
        doc
    }
}

/// Delete every duplicate task line, keeping the first occurrence of each key.
///
/// Returns the new text and the key of every removed line.
pub fn dedupe(doc: String) -> (String, Vec<String>) {
    let mut doomed = Vec::new();
    let mut removed = Vec::new();
    {
        let index = SectionIndex::build(&doc);
        let mut seen = HashSet::new();
        for task in task::locate(&doc, &index) {
            if !seen.insert(task.key.clone()) {
                debug!("Removing duplicate {} at offset {}", task.key, task.offset);
                doomed.push(task.offset..task.end());
                removed.push(task.key);
            }
        }
    }

    if doomed.is_empty() {
        return (doc, removed);
    }
    (remove_spans(doc, doomed), removed)
}

/// Remove non-overlapping ranges, last first so earlier ranges stay valid.
fn remove_spans(mut doc: String, mut spans: Vec<Range<usize>>) -> String {
    spans.sort_by(|a, b| b.start.cmp(&a.start));
    for span in spans {
        doc.replace_range(span, "");
    }
    doc
}

/// Insert `block` at `at`, starting a new line first if `at` is mid-line.
fn insert_at_line_start(doc: &mut String, at: usize, block: &str) {
    if at > 0 && !doc[..at].ends_with('\n') {
        doc.insert_str(at, &format!("\n{}", block));
    } else {
        doc.insert_str(at, block);
    }
}

/// Where new columns go: before a kanban settings footer, else the end.
fn append_point(doc: &str) -> usize {
    let Some(footer) = SETTINGS_FOOTER_RE.find(doc) else {
        return doc.len();
    };

    let before = doc[..footer.start()].trim_end();
    if let Some(rule_start) = before.strip_suffix("***").map(str::len) {
        if rule_start == 0 || before[..rule_start].ends_with('\n') {
            return rule_start;
        }
    }
    footer.start()
}
