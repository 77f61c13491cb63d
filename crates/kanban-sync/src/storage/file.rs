//! Filesystem storage rooted at the vault directory.

use std::path::{Path, PathBuf};

use obsidian_fs::{ensure_markdown_extension, validate_relative_path};
use rand::Rng;
use tokio::fs;
use tracing::debug;

use super::traits::{NoteMetadata, Storage, StorageError, WriteResult};
use super::ContentHash;

pub struct FileStorage {
    vault_path: PathBuf,
}

impl FileStorage {
    pub fn new(vault_path: PathBuf) -> Self {
        Self { vault_path }
    }

    /// Resolve a vault URI to a file path, rejecting traversal outside the vault.
    fn uri_to_path(&self, uri: &str) -> Result<PathBuf, StorageError> {
        let clean = validate_relative_path(uri).map_err(|e| StorageError::InvalidPath {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        Ok(self.vault_path.join(ensure_markdown_extension(&clean)))
    }

    fn random_hex() -> String {
        let bytes: [u8; 16] = rand::rng().random();
        hex::encode(bytes)
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        let temp_path = path.with_extension(format!("{}.tmp", Self::random_hex()));

        if let Err(e) = fs::write(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn exists(&self, uri: &str) -> Result<bool, StorageError> {
        let path = self.uri_to_path(uri)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::io(uri, e))
    }

    async fn read(&self, uri: &str) -> Result<(String, NoteMetadata), StorageError> {
        let path = self.uri_to_path(uri)?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StorageError::io(uri, e))?;

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
        let path = self.uri_to_path(uri)?;

        if let Some(expected) = expected_hash {
            let actual = match fs::read_to_string(&path).await {
                Ok(current) => ContentHash::from_content(&current).to_string(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    "(file does not exist)".to_string()
                }
                Err(e) => return Err(StorageError::io(uri, e)),
            };
            if actual != expected.as_str() {
                return Err(StorageError::HashMismatch {
                    uri: uri.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                debug!("Creating folder {}", parent.display());
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io(uri, e))?;
            }
        }

        Self::atomic_write(&path, content)
            .await
            .map_err(|e| StorageError::io(uri, e))?;

        Ok(WriteResult {
            hash: ContentHash::from_content(content),
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let root = if prefix.trim().trim_matches('/').is_empty() {
            self.vault_path.clone()
        } else {
            let clean = validate_relative_path(prefix).map_err(|e| StorageError::InvalidPath {
                uri: prefix.to_string(),
                reason: e.to_string(),
            })?;
            self.vault_path.join(clean)
        };

        let mut notes = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(prefix, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::io(prefix, e))?
            {
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::io(prefix, e))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "md") {
                    if let Some(uri) = self.path_to_uri(&path) {
                        notes.push(uri);
                    }
                }
            }
        }

        notes.sort();
        Ok(notes)
    }
}

impl FileStorage {
    /// Vault URI for a note path: "<vault>/Jira/ABC-1.md" -> "Jira/ABC-1"
    fn path_to_uri(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.vault_path).ok()?;
        let rel = rel.to_str()?.replace('\\', "/");
        Some(rel.strip_suffix(".md").unwrap_or(&rel).to_string())
    }
}
