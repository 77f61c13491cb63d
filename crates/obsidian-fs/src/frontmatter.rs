//! YAML frontmatter parsing for Obsidian notes
//!
//! Parses the YAML frontmatter block at the start of markdown files:
//! ```markdown
//! ---
//! kanban-plugin: board
//! autoUpdateKanban: true
//! ---
//!
//! ## To Do
//! ```

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::ops::Range;
use thiserror::Error;

/// Parsed frontmatter as a map of string keys to JSON values.
/// Using JSON values allows flexible typing (strings, numbers, arrays, objects).
pub type Frontmatter = BTreeMap<String, JsonValue>;

/// Frontmatter key that opts a board into automatic reconciliation.
pub const AUTO_UPDATE_KEY: &str = "autoUpdateKanban";

/// A parsed note with frontmatter separated from content.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNote<'a> {
    /// The frontmatter key-value pairs, if present
    pub frontmatter: Option<Frontmatter>,
    /// The note content after the frontmatter (borrows from raw)
    pub content: &'a str,
}

/// Error type for frontmatter operations
#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("Failed to serialize frontmatter: {0}")]
    SerializationError(#[from] serde_yaml::Error),
}

/// Byte layout of a frontmatter block.
struct Bounds {
    /// The YAML between the delimiters
    yaml: Range<usize>,
    /// Where the note content starts
    content_start: usize,
}

fn frontmatter_bounds(raw: &str) -> Option<Bounds> {
    // Frontmatter must start at the very beginning with ---
    let after_opening = raw.strip_prefix("---")?;
    let yaml_start = if after_opening.starts_with('\n') {
        4
    } else if after_opening.starts_with("\r\n") {
        5
    } else {
        return None;
    };

    // Closing --- must be alone on its line
    let mut pos = yaml_start;
    for line in raw[yaml_start..].split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == "---" {
            return Some(Bounds {
                yaml: yaml_start..pos,
                content_start: pos + line.len(),
            });
        }
        pos += line.len();
    }
    None
}

/// Split a note into frontmatter YAML string and content, without parsing the YAML.
///
/// Returns (frontmatter_yaml, content) where frontmatter_yaml is None if
/// no valid frontmatter block was found.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    match frontmatter_bounds(raw) {
        Some(bounds) => (Some(&raw[bounds.yaml]), &raw[bounds.content_start..]),
        None => (None, raw),
    }
}

/// Parse a note's raw content into frontmatter and content.
///
/// Invalid YAML is treated as no frontmatter.
pub fn parse_frontmatter(raw: &str) -> ParsedNote<'_> {
    let (yaml_str, content) = split_frontmatter(raw);

    let frontmatter = yaml_str.and_then(|yaml| {
        serde_yaml::from_str::<serde_yaml::Value>(yaml)
            .ok()
            .and_then(yaml_to_json_map)
    });

    ParsedNote {
        frontmatter,
        content,
    }
}

/// Build a complete note with frontmatter and content.
///
/// If frontmatter is empty, returns just the content without frontmatter block.
pub fn build_note_with_frontmatter(
    frontmatter: &Frontmatter,
    content: &str,
) -> Result<String, FrontmatterError> {
    if frontmatter.is_empty() {
        return Ok(content.to_string());
    }

    let yaml_map: serde_yaml::Mapping = frontmatter
        .iter()
        .map(|(k, v)| (serde_yaml::Value::String(k.clone()), json_to_yaml(v)))
        .collect();
    let yaml = serde_yaml::to_string(&yaml_map)?;
    Ok(format!("---\n{}---\n{}", yaml, content))
}

/// Whether a board has opted into automatic reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoUpdate {
    Enabled,
    Disabled,
    /// The flag has never been written
    Unset,
}

/// Read the `autoUpdateKanban` flag.
///
/// A value that is present but not a recognizable boolean counts as disabled,
/// so the flag is never written a second time.
pub fn auto_update_state(raw: &str) -> AutoUpdate {
    let parsed = parse_frontmatter(raw);
    let Some(value) = parsed.frontmatter.as_ref().and_then(|fm| fm.get(AUTO_UPDATE_KEY)) else {
        // Unparseable YAML may still carry the key; don't append a duplicate.
        if split_frontmatter(raw)
            .0
            .is_some_and(|yaml| yaml.lines().any(|l| l.trim_start().starts_with(AUTO_UPDATE_KEY)))
        {
            return AutoUpdate::Disabled;
        }
        return AutoUpdate::Unset;
    };

    match value {
        JsonValue::Bool(true) => AutoUpdate::Enabled,
        JsonValue::String(s) if s.eq_ignore_ascii_case("true") => AutoUpdate::Enabled,
        _ => AutoUpdate::Disabled,
    }
}

/// Add `autoUpdateKanban: true` to the note's frontmatter, creating a board
/// frontmatter block if the note has none. Existing keys and their order are
/// kept byte for byte.
pub fn enable_auto_update(raw: &str) -> String {
    let flag_line = format!("{}: true\n", AUTO_UPDATE_KEY);

    match frontmatter_bounds(raw) {
        Some(bounds) => {
            let at = bounds.yaml.end;
            let mut out = String::with_capacity(raw.len() + flag_line.len() + 1);
            out.push_str(&raw[..at]);
            if at > bounds.yaml.start && !raw[..at].ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&flag_line);
            out.push_str(&raw[at..]);
            out
        }
        None => format!("---\nkanban-plugin: board\n{}---\n\n{}", flag_line, raw),
    }
}

/// Convert a JSON value to a YAML value
fn json_to_yaml(json: &JsonValue) -> serde_yaml::Value {
    match json {
        JsonValue::Null => serde_yaml::Value::Null,
        JsonValue::Bool(b) => serde_yaml::Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_yaml::Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_yaml::Value::Number(f.into())
            } else {
                serde_yaml::Value::Null
            }
        }
        JsonValue::String(s) => serde_yaml::Value::String(s.clone()),
        JsonValue::Array(arr) => serde_yaml::Value::Sequence(arr.iter().map(json_to_yaml).collect()),
        JsonValue::Object(obj) => serde_yaml::Value::Mapping(
            obj.iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), json_to_yaml(v)))
                .collect(),
        ),
    }
}

/// Convert a YAML value to a JSON map (for the top-level frontmatter)
fn yaml_to_json_map(yaml: serde_yaml::Value) -> Option<Frontmatter> {
    let serde_yaml::Value::Mapping(map) = yaml else {
        return None;
    };

    let result: Frontmatter = map
        .into_iter()
        .filter_map(|(k, v)| match k {
            serde_yaml::Value::String(key) => Some((key, yaml_to_json(v))),
            _ => None,
        })
        .collect();

    if result.is_empty() { None } else { Some(result) }
}

/// Convert a YAML value to a JSON value
fn yaml_to_json(yaml: serde_yaml::Value) -> JsonValue {
    match yaml {
        serde_yaml::Value::Null => JsonValue::Null,
        serde_yaml::Value::Bool(b) => JsonValue::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            } else {
                JsonValue::Null
            }
        }
        serde_yaml::Value::String(s) => JsonValue::String(s),
        serde_yaml::Value::Sequence(seq) => {
            JsonValue::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => JsonValue::Object(
            map.into_iter()
                .filter_map(|(k, v)| match k {
                    serde_yaml::Value::String(key) => Some((key, yaml_to_json(v))),
                    _ => None,
                })
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_note_with_frontmatter() {
        let raw = "---\nkanban-plugin: board\n---\n\n## To Do";
        let (yaml, content) = split_frontmatter(raw);
        assert_eq!(yaml, Some("kanban-plugin: board\n"));
        assert_eq!(content, "\n## To Do");
    }

    #[test]
    fn split_note_without_frontmatter() {
        let raw = "## To Do\n- [ ] [[A-1]]";
        assert_eq!(split_frontmatter(raw), (None, raw));
    }

    #[test]
    fn split_note_with_incomplete_frontmatter() {
        let raw = "---\ntitle: Test\nNo closing delimiter";
        assert_eq!(split_frontmatter(raw), (None, raw));
    }

    #[test]
    fn thematic_break_is_not_frontmatter() {
        let raw = "---- \n## A\n---\n";
        assert_eq!(split_frontmatter(raw).0, None);
    }

    #[test]
    fn parse_typed_values() {
        let raw = "---\nautoUpdateKanban: true\nversion: 42\ntags:\n  - work\n---\nBody";
        let parsed = parse_frontmatter(raw);
        let fm = parsed.frontmatter.unwrap();

        assert_eq!(fm.get(AUTO_UPDATE_KEY), Some(&JsonValue::Bool(true)));
        assert_eq!(fm.get("version"), Some(&JsonValue::Number(42.into())));
        assert!(fm.get("tags").unwrap().is_array());
        assert_eq!(parsed.content, "Body");
    }

    #[test]
    fn empty_frontmatter_is_none() {
        let parsed = parse_frontmatter("---\n---\nContent");
        assert!(parsed.frontmatter.is_none());
        assert_eq!(parsed.content, "Content");
    }

    #[test]
    fn reads_auto_update_flag() {
        assert_eq!(
            auto_update_state("---\nautoUpdateKanban: true\n---\n"),
            AutoUpdate::Enabled
        );
        assert_eq!(
            auto_update_state("---\nautoUpdateKanban: false\n---\n"),
            AutoUpdate::Disabled
        );
        assert_eq!(
            auto_update_state("---\nautoUpdateKanban: \"TRUE\"\n---\n"),
            AutoUpdate::Enabled
        );
        assert_eq!(
            auto_update_state("---\nautoUpdateKanban: maybe\n---\n"),
            AutoUpdate::Disabled
        );
        assert_eq!(
            auto_update_state("---\nkanban-plugin: board\n---\n"),
            AutoUpdate::Unset
        );
        assert_eq!(auto_update_state("## To Do\n"), AutoUpdate::Unset);
    }

    #[test]
    fn broken_yaml_with_flag_is_not_unset() {
        let raw = "---\nautoUpdateKanban: true\n  bad: [indent\n---\n";
        assert_eq!(auto_update_state(raw), AutoUpdate::Disabled);
    }

    #[test]
    fn enable_appends_to_existing_frontmatter() {
        let raw = "---\nkanban-plugin: board\n---\n\n## To Do\n";
        let updated = enable_auto_update(raw);

        assert_eq!(
            updated,
            "---\nkanban-plugin: board\nautoUpdateKanban: true\n---\n\n## To Do\n"
        );
        assert_eq!(auto_update_state(&updated), AutoUpdate::Enabled);
    }

    #[test]
    fn enable_fills_empty_frontmatter() {
        let updated = enable_auto_update("---\n---\n## A\n");
        assert_eq!(updated, "---\nautoUpdateKanban: true\n---\n## A\n");
    }

    #[test]
    fn enable_creates_frontmatter() {
        let updated = enable_auto_update("## To Do\n");
        assert_eq!(
            updated,
            "---\nkanban-plugin: board\nautoUpdateKanban: true\n---\n\n## To Do\n"
        );
        assert_eq!(auto_update_state(&updated), AutoUpdate::Enabled);
    }

    #[test]
    fn build_note_round_trips() {
        let mut fm = Frontmatter::new();
        fm.insert("jira-key".to_string(), JsonValue::String("ABC-1".to_string()));
        fm.insert("status".to_string(), JsonValue::String("To Do".to_string()));

        let note = build_note_with_frontmatter(&fm, "\n# ABC-1\n").unwrap();
        assert!(note.starts_with("---\njira-key: ABC-1\nstatus: To Do\n---\n"));

        let parsed = parse_frontmatter(&note);
        assert_eq!(parsed.frontmatter, Some(fm));
        assert_eq!(parsed.content, "\n# ABC-1\n");
    }

    #[test]
    fn build_without_frontmatter_returns_content() {
        assert_eq!(
            build_note_with_frontmatter(&Frontmatter::new(), "body").unwrap(),
            "body"
        );
    }
}
