//! Task reference lines: `- [ ] [[ABC-123]] optional note`.
//!
//! The whole line (including its newline) is the unit that gets removed or
//! relocated, so anything a person typed after the link travels with it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::section::SectionIndex;

/// Tracker key shape: project prefix, hyphen, number.
pub const KEY_PATTERN: &str = r"[A-Z][A-Z0-9_]*-[0-9]+";

static TASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*[-*][ \t]+\[([ xX])\][ \t]+\[\[({KEY_PATTERN})(?:[|#][^\]]*)?\]\].*$"
    ))
    .expect("valid task regex")
});

static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{KEY_PATTERN}$")).expect("valid key regex"));

static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*[-*][ \t]+\[([ xX])\]").expect("valid checkbox regex"));

/// One occurrence of a task line in a document snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReference {
    pub key: String,
    pub checked: bool,
    /// Offset of the first byte of the line
    pub offset: usize,
    /// Length of the line including its trailing newline, if any
    pub length: usize,
    /// Index into the `SectionIndex` the scan ran against; `None` for the preamble
    pub section: Option<usize>,
}

impl TaskReference {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The line text without its newline.
    pub fn line<'a>(&self, text: &'a str) -> &'a str {
        let raw = &text[self.offset..self.end()];
        raw.strip_suffix('\n').unwrap_or(raw)
    }
}

/// Returns true if `key` looks like a tracker key.
pub fn is_valid_key(key: &str) -> bool {
    KEY_RE.is_match(key)
}

/// The canonical line written for a newly added task.
pub fn task_line(key: &str) -> String {
    format!("- [ ] [[{}]]", key)
}

/// Byte offset of the checkbox state character if `line` is a checkbox list item.
pub fn checkbox_state_offset(line: &str) -> Option<usize> {
    CHECKBOX_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.start())
}

/// Returns true if `line` is any checkbox list item, task reference or not.
pub fn is_checkbox_line(line: &str) -> bool {
    CHECKBOX_RE.is_match(line)
}

/// Scan `text` for every task reference, in document order.
pub fn locate(text: &str, index: &SectionIndex) -> Vec<TaskReference> {
    TASK_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let state = caps.get(1)?;
            let key = caps.get(2)?;

            let length = if text[whole.end()..].starts_with('\n') {
                whole.len() + 1
            } else {
                whole.len()
            };

            Some(TaskReference {
                key: key.as_str().to_string(),
                checked: state.as_str() != " ",
                offset: whole.start(),
                length,
                section: index.containing(whole.start()),
            })
        })
        .collect()
}
