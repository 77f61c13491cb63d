//! Level-2 heading index for board documents.
//!
//! A board is a sequence of `## Column` headings, each owning the text up to
//! the next heading. Offsets are byte offsets into the exact text the index
//! was built from and are invalid after any edit to that text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^##[ \t]+(\S.*?)[ \t\r]*$").expect("valid heading regex"));

static HEADING_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^##[ \t]+\S").expect("valid heading line regex"));

/// Returns true if `line` is a level-2 heading that opens a section.
pub fn is_heading_line(line: &str) -> bool {
    HEADING_LINE_RE.is_match(line)
}

/// A heading-delimited column of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Heading title without the `## ` prefix: "In Progress"
    pub name: String,
    /// Offset of the first `#` of the heading line
    pub heading_offset: usize,
    /// First byte of the body (just past the heading line's newline)
    pub start: usize,
    /// One past the last byte of the body
    pub end: usize,
}

impl Section {
    /// Whether `offset` falls inside this section's body.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// The body text of this section within `text`.
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Returns true when the first non-blank line of the body is `marker`.
    pub fn starts_with_marker(&self, text: &str, marker: &str) -> bool {
        first_content_line(self.body(text)).is_some_and(|(_, line)| line.trim() == marker)
    }

    /// Absolute offset just past the marker line, if the body begins with it.
    pub fn marker_line_end(&self, text: &str, marker: &str) -> Option<usize> {
        let body = self.body(text);
        let (rel, line) = first_content_line(body)?;
        if line.trim() != marker {
            return None;
        }
        let after = rel + line.len();
        let after = if body[after..].starts_with('\n') { after + 1 } else { after };
        Some(self.start + after)
    }
}

/// Ordered sections of one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionIndex {
    sections: Vec<Section>,
}

impl SectionIndex {
    /// Parse every level-2 heading in `text`.
    pub fn build(text: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();

        for caps in HEADING_RE.captures_iter(text) {
            let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            if let Some(prev) = sections.last_mut() {
                prev.end = whole.start();
            }

            let line_end = whole.end();
            let start = if text[line_end..].starts_with('\n') {
                line_end + 1
            } else {
                line_end
            };

            sections.push(Section {
                name: title.as_str().to_string(),
                heading_offset: whole.start(),
                start,
                end: text.len(),
            });
        }

        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Section> {
        self.sections.get(idx)
    }

    /// Canonical section for `name`: the first heading carrying it.
    pub fn find(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Index of the section whose body contains `offset`.
    ///
    /// Offsets inside the preamble or on a heading line itself return `None`.
    pub fn containing(&self, offset: usize) -> Option<usize> {
        self.sections.iter().position(|s| s.contains(offset))
    }
}

/// First line of `body` that is not whitespace-only, with its relative offset.
fn first_content_line(body: &str) -> Option<(usize, &str)> {
    let mut pos = 0;
    for line in body.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        if !content.trim().is_empty() {
            return Some((pos, content));
        }
        pos += line.len();
    }
    None
}
