//! SHA-256 content hashes.
//!
//! A run hashes the board when it reads it and hands the hash back on write,
//! so an edit made in Obsidian while issues were being fetched fails the
//! write instead of being overwritten.

use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_content(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = ContentHash::from_content("## To Do\n");
        assert_eq!(hash, ContentHash::from_content("## To Do\n"));
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_single_byte_edit_changes_hash() {
        let before = ContentHash::from_content("- [ ] [[ABC-1]]\n");
        let after = ContentHash::from_content("- [x] [[ABC-1]]\n");
        assert_ne!(before, after);
    }
}
