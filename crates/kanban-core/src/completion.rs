//! Checks off every item in columns that open with the done marker.

use crate::section::SectionIndex;
use crate::task::checkbox_state_offset;

/// Mark every unchecked checkbox item inside done-marked sections as checked.
///
/// Returns the new text and the number of lines that changed. Only the
/// checkbox state byte is rewritten, so the text length never changes.
pub fn mark_complete(mut text: String, marker: &str) -> (String, usize) {
    let index = SectionIndex::build(&text);
    let mut positions = Vec::new();

    for section in index.sections() {
        if !section.starts_with_marker(&text, marker) {
            continue;
        }

        let mut line_start = section.start;
        for line in section.body(&text).split_inclusive('\n') {
            if let Some(rel) = checkbox_state_offset(line) {
                if line.as_bytes()[rel] == b' ' {
                    positions.push(line_start + rel);
                }
            }
            line_start += line.len();
        }
    }

    if positions.is_empty() {
        return (text, 0);
    }

    for &pos in &positions {
        text.replace_range(pos..pos + 1, "x");
    }
    (text, positions.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "**Complete**";

    #[test]
    fn checks_items_in_done_sections() {
        let text = "## Done\n\n**Complete**\n- [ ] [[A-1]]\n- [x] [[A-2]]\n- [ ] loose item\n".to_string();
        let (out, changed) = mark_complete(text, MARKER);
        assert_eq!(changed, 2);
        assert_eq!(
            out,
            "## Done\n\n**Complete**\n- [x] [[A-1]]\n- [x] [[A-2]]\n- [x] loose item\n"
        );
    }

    #[test]
    fn leaves_other_sections_alone() {
        let text = "## To Do\n- [ ] [[A-1]]\n**Complete**\n- [ ] [[A-2]]\n## Done\n**Complete**\n- [ ] [[A-3]]\n".to_string();
        let (out, changed) = mark_complete(text, MARKER);
        assert_eq!(changed, 1);
        assert!(out.contains("- [ ] [[A-1]]"));
        assert!(out.contains("- [ ] [[A-2]]"));
        assert!(out.contains("- [x] [[A-3]]"));
    }

    #[test]
    fn stops_at_next_heading() {
        let text = "## Done\n**Complete**\n- [ ] [[A-1]]\n## Next\n- [ ] [[A-2]]\n".to_string();
        let (out, _) = mark_complete(text, MARKER);
        assert!(out.ends_with("## Next\n- [ ] [[A-2]]\n"));
    }

    #[test]
    fn rerun_is_a_no_op() {
        let text = "## Done\n**Complete**\n- [ ] [[A-1]]\n".to_string();
        let (once, _) = mark_complete(text, MARKER);
        let (twice, changed) = mark_complete(once.clone(), MARKER);
        assert_eq!(changed, 0);
        assert_eq!(twice, once);
    }

    #[test]
    fn preserves_multibyte_text() {
        let text = "## Done\n**Complete**\n- [ ] [[A-1]] café ✓\n".to_string();
        let (out, changed) = mark_complete(text, MARKER);
        assert_eq!(changed, 1);
        assert_eq!(out, "## Done\n**Complete**\n- [x] [[A-1]] café ✓\n");
    }
}
