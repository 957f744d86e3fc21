//! Per-column tamper-evidence codes
//!
//! `mac(bit, col, version, salt) = SHA-256(bit ++ col ++ version ++ salt)[0]`,
//! one byte per column. The folder aggregate is the XOR-fold over every live
//! document's codes; XOR being its own inverse makes incremental maintenance
//! exact: add XORs in, remove XORs the same codes in again, and update composes
//! both into a single delta.
//!
//! The client computes deltas and submits the new aggregate value; replicas
//! store it without recomputation. That trust in client arithmetic is an
//! inherited limitation, not something this module papers over.

use odory_core::{BitRow, FolderSalt, MacVector, Result, VersionToken};
use sha2::{Digest, Sha256};

/// Computes per-column MAC codes and aggregate deltas
#[derive(Debug, Clone)]
pub struct MacEngine {
    salt: FolderSalt,
}

impl MacEngine {
    /// Create an engine for one folder's salt
    pub fn new(salt: FolderSalt) -> Self {
        Self { salt }
    }

    /// Code for one (bit, column) cell under a document version
    pub fn mac_code(&self, bit: u8, column: usize, version: &VersionToken) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update([bit]);
        hasher.update((column as u32).to_le_bytes());
        hasher.update(version.as_bytes());
        hasher.update(self.salt.as_bytes());
        hasher.finalize()[0]
    }

    /// Per-column codes for a full masked row
    pub fn macs(&self, masked_row: &BitRow, version: &VersionToken) -> MacVector {
        MacVector::from_codes(
            (0..masked_row.width())
                .map(|col| self.mac_code(masked_row.bit(col), col, version))
                .collect(),
        )
    }

    /// Aggregate after adding a document: `aggregate XOR macs(d)`
    pub fn fold_in(
        &self,
        aggregate: &MacVector,
        masked_row: &BitRow,
        version: &VersionToken,
    ) -> Result<MacVector> {
        aggregate.xor(&self.macs(masked_row, version))
    }

    /// Delta for replacing one document's row/version with another
    ///
    /// XOR of old and new codes; folding the delta into the aggregate is
    /// remove-then-add in one step.
    pub fn update_delta(
        &self,
        old_row: &BitRow,
        old_version: &VersionToken,
        new_row: &BitRow,
        new_version: &VersionToken,
    ) -> Result<MacVector> {
        self.macs(old_row, old_version)
            .xor(&self.macs(new_row, new_version))
    }
}
