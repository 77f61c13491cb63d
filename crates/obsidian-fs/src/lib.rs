//! Path and frontmatter utilities for Obsidian vault notes
//!
//! Pure functions with no I/O: vault-relative path validation, `.md`
//! extension handling, YAML frontmatter parsing and the kanban board
//! opt-in flag.

mod frontmatter;

pub use frontmatter::{
    auto_update_state, build_note_with_frontmatter, enable_auto_update, parse_frontmatter,
    split_frontmatter, AutoUpdate, Frontmatter, FrontmatterError, ParsedNote, AUTO_UPDATE_KEY,
};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathValidationError {
    #[error("Path contains directory traversal")]
    DirectoryTraversal,
    #[error("Path is absolute")]
    AbsolutePath,
    #[error("Path is empty")]
    Empty,
}

/// Validate that a vault-relative path is safe (no directory traversal)
///
/// Strips one leading slash; returns the cleaned path.
pub fn validate_relative_path(path: &str) -> Result<String, PathValidationError> {
    let clean_path = path.trim();
    let clean_path = clean_path.strip_prefix('/').unwrap_or(clean_path);

    if clean_path.is_empty() {
        return Err(PathValidationError::Empty);
    }

    if clean_path.split(['/', '\\']).any(|part| part == "..") {
        return Err(PathValidationError::DirectoryTraversal);
    }

    if clean_path.starts_with('/') || clean_path.starts_with('\\') {
        return Err(PathValidationError::AbsolutePath);
    }

    Ok(clean_path.to_string())
}

/// Ensure .md extension on note paths
pub fn ensure_markdown_extension(note_path: &str) -> String {
    if note_path.ends_with(".md") {
        note_path.to_string()
    } else {
        format!("{}.md", note_path)
    }
}

/// Join a vault folder and a note name into a vault URI: ("Jira", "ABC-1") -> "Jira/ABC-1"
pub fn join_uri(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}
