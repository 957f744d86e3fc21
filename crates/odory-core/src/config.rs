//! Folder-level configuration
//!
//! Bloom width and hash count are fixed at folder creation time. Changing
//! either invalidates every indexed row already stored on the replicas, so a
//! change is a one-way migration, not a reconfiguration.

use crate::{OdoryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bloom-filter geometry for one folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Bloom filter width `m` (number of columns)
    pub bloom_width: usize,
    /// Hash count `k` (positions set per keyword)
    pub hash_count: usize,
}

impl FolderConfig {
    /// Build a config, rejecting degenerate geometry
    pub fn new(bloom_width: usize, hash_count: usize) -> Result<Self> {
        if bloom_width == 0 {
            return Err(OdoryError::invalid("bloom width must be nonzero"));
        }
        if hash_count == 0 {
            return Err(OdoryError::invalid("hash count must be nonzero"));
        }
        if hash_count > bloom_width {
            return Err(OdoryError::invalid(format!(
                "hash count {hash_count} exceeds bloom width {bloom_width}"
            )));
        }
        Ok(Self {
            bloom_width,
            hash_count,
        })
    }
}

/// Per-client-manager secret salt
///
/// Keys the keyword hash family, the row masks and the MAC codes. Never
/// sent to a replica. Zeroized on drop and redacted from `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct FolderSalt(Vec<u8>);

impl FolderSalt {
    /// Wrap salt material
    pub fn new(salt: impl Into<Vec<u8>>) -> Self {
        Self(salt.into())
    }

    /// Salt bytes for key derivation
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for FolderSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FolderSalt(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_zero_width() {
        assert!(FolderConfig::new(0, 1).is_err());
        assert!(FolderConfig::new(16, 0).is_err());
        assert!(FolderConfig::new(16, 17).is_err());
        assert!(FolderConfig::new(16, 2).is_ok());
    }

    #[test]
    fn test_salt_debug_is_redacted() {
        let salt = FolderSalt::new(b"TESTSALT".to_vec());
        assert_eq!(format!("{salt:?}"), "FolderSalt(..)");
        assert_eq!(salt.as_bytes(), b"TESTSALT");
    }
}
