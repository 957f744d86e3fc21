//! Unified error system for Odory
//!
//! One error type covers the whole protocol stack. The fatal replica-facing
//! conditions (`InconsistentReplicaState`, `ReplicationDivergence`,
//! `MacMismatch`, ...) each get their own variant so callers can match on
//! them; everything else goes through the generic ambient variants.

use serde::{Deserialize, Serialize};

/// Unified error type for all Odory operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum OdoryError {
    /// A replica could not be reached (or timed out)
    #[error("Connection failure: {message}")]
    ConnectionFailure {
        /// Description of the unreachable replica and cause
        message: String,
    },

    /// The two replicas disagreed on `(version_counter, mac_vector)` before
    /// a mutation was applied; no writes were performed
    #[error("Inconsistent replica state: {message}")]
    InconsistentReplicaState {
        /// Description of the observed disagreement
        message: String,
    },

    /// The two replicas disagreed *after* a mutation was applied; the
    /// replicas have diverged and require out-of-band reconciliation
    #[error("Replication divergence: {message}")]
    ReplicationDivergence {
        /// Description of the post-write disagreement
        message: String,
    },

    /// A recomputed column MAC did not match the replica-reported value
    #[error("MAC mismatch: {message}")]
    MacMismatch {
        /// Description of the failing column(s)
        message: String,
    },

    /// The replicas reported different indexed-document counts
    #[error("Document count mismatch: {message}")]
    DocumentCountMismatch {
        /// The two observed counts
        message: String,
    },

    /// A batch mutation carried differing numbers of ids and payload rows
    #[error("Batch size mismatch: {message}")]
    BatchSizeMismatch {
        /// The offending counts
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl OdoryError {
    /// Create a connection failure error
    pub fn connection_failure(message: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            message: message.into(),
        }
    }

    /// Create an inconsistent replica state error
    pub fn inconsistent_replicas(message: impl Into<String>) -> Self {
        Self::InconsistentReplicaState {
            message: message.into(),
        }
    }

    /// Create a replication divergence error
    pub fn replication_divergence(message: impl Into<String>) -> Self {
        Self::ReplicationDivergence {
            message: message.into(),
        }
    }

    /// Create a MAC mismatch error
    pub fn mac_mismatch(message: impl Into<String>) -> Self {
        Self::MacMismatch {
            message: message.into(),
        }
    }

    /// Create a document count mismatch error
    pub fn document_count_mismatch(message: impl Into<String>) -> Self {
        Self::DocumentCountMismatch {
            message: message.into(),
        }
    }

    /// Create a batch size mismatch error
    pub fn batch_size_mismatch(message: impl Into<String>) -> Self {
        Self::BatchSizeMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error signals a condition no retry can repair
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotFound { .. } | Self::Invalid { .. })
    }
}

/// Standard Result type for Odory operations
pub type Result<T> = std::result::Result<T, OdoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OdoryError::mac_mismatch("column 3");
        assert!(matches!(err, OdoryError::MacMismatch { .. }));
        assert_eq!(err.to_string(), "MAC mismatch: column 3");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(OdoryError::replication_divergence("post-write").is_fatal());
        assert!(!OdoryError::not_found("doc 9").is_fatal());
    }

    #[test]
    fn test_result_type() {
        fn ok_fn() -> Result<u32> {
            Ok(7)
        }
        assert_eq!(ok_fn().unwrap(), 7);
    }
}
