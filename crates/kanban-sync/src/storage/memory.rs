//! In-memory storage for tests and dry runs against fixtures.

use std::collections::HashMap;
use std::sync::RwLock;

use obsidian_fs::{ensure_markdown_extension, validate_relative_path};

use super::traits::{NoteMetadata, Storage, StorageError, WriteResult};
use super::ContentHash;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    notes: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed storage with notes keyed by vault URI.
    pub fn with_notes<I, K, V>(notes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let notes = notes
            .into_iter()
            .map(|(k, v)| (ensure_markdown_extension(k.as_ref()), v.into()))
            .collect();
        Self {
            notes: RwLock::new(notes),
        }
    }

    /// Current content of a note, if present.
    pub fn get(&self, uri: &str) -> Option<String> {
        let key = ensure_markdown_extension(uri.trim_start_matches('/'));
        self.notes.read().ok()?.get(&key).cloned()
    }

    fn key(uri: &str) -> Result<String, StorageError> {
        let clean = validate_relative_path(uri).map_err(|e| StorageError::InvalidPath {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(ensure_markdown_extension(&clean))
    }

    fn poisoned(uri: &str) -> StorageError {
        StorageError::Io {
            uri: uri.to_string(),
            source: std::io::Error::other("storage lock poisoned"),
        }
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, uri: &str) -> Result<bool, StorageError> {
        let key = Self::key(uri)?;
        let notes = self.notes.read().map_err(|_| Self::poisoned(uri))?;
        Ok(notes.contains_key(&key))
    }

    async fn read(&self, uri: &str) -> Result<(String, NoteMetadata), StorageError> {
        let key = Self::key(uri)?;
        let notes = self.notes.read().map_err(|_| Self::poisoned(uri))?;
        let content = notes.get(&key).cloned().ok_or_else(|| StorageError::NotFound {
            uri: uri.to_string(),
        })?;
        let metadata = NoteMetadata {
            hash: ContentHash::from_content(&content),
        };
        Ok((content, metadata))
    }

    async fn write(
        &self,
        uri: &str,
        content: &str,
        expected_hash: Option<&ContentHash>,
    ) -> Result<WriteResult, StorageError> {
        let key = Self::key(uri)?;
        let mut notes = self.notes.write().map_err(|_| Self::poisoned(uri))?;

        if let Some(expected) = expected_hash {
            let actual = notes
                .get(&key)
                .map(|current| ContentHash::from_content(current).to_string())
                .unwrap_or_else(|| "(file does not exist)".to_string());
            if actual != expected.as_str() {
                return Err(StorageError::HashMismatch {
                    uri: uri.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        notes.insert(key, content.to_string());
        Ok(WriteResult {
            hash: ContentHash::from_content(content),
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.trim().trim_matches('/');
        let notes = self.notes.read().map_err(|_| Self::poisoned(prefix))?;
        let mut uris: Vec<String> = notes
            .keys()
            .filter(|key| {
                prefix.is_empty()
                    || key
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .filter(|key| !key.split('/').any(|part| part.starts_with('.')))
            .map(|key| key.strip_suffix(".md").unwrap_or(key).to_string())
            .collect();
        uris.sort();
        Ok(uris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uri_with_and_without_extension_match() {
        let storage = MemoryStorage::with_notes([("Boards/Work", "## To Do\n")]);
        assert!(storage.exists("Boards/Work.md").await.unwrap());
        let (content, _) = storage.read("/Boards/Work").await.unwrap();
        assert_eq!(content, "## To Do\n");
    }

    #[tokio::test]
    async fn test_list_filters_by_folder() {
        let storage = MemoryStorage::with_notes([
            ("Jira/ABC-1", ""),
            ("Jira Archive/ABC-2", ""),
            ("Boards/Work", ""),
        ]);
        assert_eq!(storage.list("Jira").await.unwrap(), vec!["Jira/ABC-1"]);
        assert_eq!(storage.list("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stale_hash_is_rejected() {
        let storage = MemoryStorage::with_notes([("board", "v1")]);
        let stale = ContentHash::from_content("v0");
        let result = storage.write("board", "v2", Some(&stale)).await;
        assert!(matches!(result, Err(StorageError::HashMismatch { .. })));
        assert_eq!(storage.get("board").as_deref(), Some("v1"));
    }
}
