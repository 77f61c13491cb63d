//! Vault note storage with optimistic locking.

mod content_hash;
mod file;
mod memory;
mod traits;

pub use content_hash::ContentHash;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{NoteMetadata, Storage, StorageError, WriteResult};
