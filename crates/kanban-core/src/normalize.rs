//! Canonical blank-line layout for board documents.
//!
//! Only the number of blank lines between certain kinds of lines changes;
//! the text of every non-blank line is kept as is.

use crate::section::is_heading_line;
use crate::task::is_checkbox_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Heading,
    Marker,
    Checkbox,
    Other,
}

fn classify(line: &str, marker: &str) -> LineKind {
    if line.trim().is_empty() {
        LineKind::Blank
    } else if is_heading_line(line) {
        LineKind::Heading
    } else if line.trim() == marker {
        LineKind::Marker
    } else if is_checkbox_line(line) {
        LineKind::Checkbox
    } else {
        LineKind::Other
    }
}

/// Required number of blank lines between two adjacent non-blank lines,
/// or `None` to keep whatever the document has.
fn required_gap(prev: LineKind, next: LineKind) -> Option<usize> {
    use LineKind::{Checkbox, Heading, Marker};

    match (prev, next) {
        (_, Heading) => Some(1),
        (Heading, Marker) | (Heading, Checkbox) => Some(1),
        (Marker, Checkbox) | (Checkbox, Checkbox) => Some(0),
        _ => None,
    }
}

/// Rewrite blank-line spacing around headings, done markers and checkbox items.
///
/// The result has no leading or trailing whitespace apart from a single
/// final newline, and `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str, marker: &str) -> String {
    let mut out = String::with_capacity(text.len() + 1);
    let mut prev: Option<LineKind> = None;
    let mut blanks = 0usize;

    for line in text.trim().lines() {
        let kind = classify(line, marker);
        if kind == LineKind::Blank {
            blanks += 1;
            continue;
        }

        if let Some(prev) = prev {
            let gap = required_gap(prev, kind).unwrap_or(blanks);
            out.push('\n');
            for _ in 0..gap {
                out.push('\n');
            }
        }

        out.push_str(line);
        prev = Some(kind);
        blanks = 0;
    }

    if prev.is_some() {
        out.push('\n');
    }
    out
}
