//! Storage trait definition and error types.

use thiserror::Error;

use super::ContentHash;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Note not found: {uri}")]
    NotFound { uri: String },

    #[error("Content changed since last read for {uri}: expected hash {expected}, found {actual}")]
    HashMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid path '{uri}': {reason}")]
    InvalidPath { uri: String, reason: String },

    #[error("I/O error on {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(uri: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound {
                uri: uri.to_string(),
            }
        } else {
            StorageError::Io {
                uri: uri.to_string(),
                source,
            }
        }
    }
}

/// Metadata returned when reading a note.
#[derive(Debug, Clone)]
pub struct NoteMetadata {
    /// Hash of the content as read, for optimistic locking
    pub hash: ContentHash,
}

/// Result of a write operation.
#[derive(Debug, Clone)]
pub struct WriteResult {
    /// Hash of the content now on disk
    pub hash: ContentHash,
}

/// Note access keyed by vault URI (relative path, `.md` optional).
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn exists(&self, uri: &str) -> Result<bool, StorageError>;

    /// Read note content along with the hash needed for a locked write.
    async fn read(&self, uri: &str) -> Result<(String, NoteMetadata), StorageError>;

    /// Write note content, replacing the note atomically.
    ///
    /// With `expected_hash`, the write fails with [`StorageError::HashMismatch`]
    /// unless the note still hashes to that value. Missing parent folders are
    /// created.
    async fn write(
        &self,
        uri: &str,
        content: &str,
        expected_hash: Option<&ContentHash>,
    ) -> Result<WriteResult, StorageError>;

    /// Vault URIs (no `.md`) of every note under `prefix`; `""` lists the whole vault.
    ///
    /// Hidden files and folders are skipped.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}
