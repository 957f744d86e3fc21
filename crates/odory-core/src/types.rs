//! Core protocol types
//!
//! Fixed-width bit rows, per-column MAC vectors, document identifiers and
//! version tokens. All wire-visible vectors are fixed-length integer arrays
//! sized by the folder's configured bloom width.

use crate::{OdoryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document identifier, unique per folder and assigned by a replica on create
///
/// Both replicas assign the same id for the same create by the shared
/// version-counter invariant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocId(pub u32);

impl DocId {
    /// The numeric value of this id
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc:{}", self.0)
    }
}

/// Per-document random version token
///
/// Generated client-side on every create and update; drives both the row
/// mask and the per-column MAC codes. Replicas store it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap an existing token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token bytes, as fed to the mask and MAC derivations
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-width bloom-filter bit row
///
/// Each cell is 0 or 1. Rows are stored *masked* on replicas; the raw row
/// never leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitRow(Vec<u8>);

impl BitRow {
    /// All-zero row of the given width
    pub fn zeros(width: usize) -> Self {
        Self(vec![0; width])
    }

    /// Build a row from raw cells, validating every cell is 0 or 1
    pub fn from_bits(bits: Vec<u8>) -> Result<Self> {
        if let Some(bad) = bits.iter().find(|b| **b > 1) {
            return Err(OdoryError::invalid(format!(
                "bit row cell out of range: {bad}"
            )));
        }
        Ok(Self(bits))
    }

    /// Row width in bits
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Cell at `index`
    pub fn bit(&self, index: usize) -> u8 {
        self.0[index]
    }

    /// Set the cell at `index` to 1
    pub fn set(&mut self, index: usize) {
        self.0[index] = 1;
    }

    /// XOR another row of the same width into this one
    pub fn xor(&self, other: &Self) -> Result<Self> {
        if self.width() != other.width() {
            return Err(OdoryError::invalid(format!(
                "bit row width mismatch: {} vs {}",
                self.width(),
                other.width()
            )));
        }
        Ok(Self(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a ^ b)
                .collect(),
        ))
    }

    /// The raw cells
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Length-`m` vector of per-column tamper-evidence codes, one byte per column
///
/// The folder aggregate is the XOR-fold of `macs(masked_row(d), version(d))`
/// over every live document `d`. XOR is its own inverse, so adding and
/// removing a document are the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacVector(Vec<u8>);

impl MacVector {
    /// All-zero vector of the given width (the empty-folder aggregate)
    pub fn zeros(width: usize) -> Self {
        Self(vec![0; width])
    }

    /// Wrap raw per-column codes
    pub fn from_codes(codes: Vec<u8>) -> Self {
        Self(codes)
    }

    /// Vector width (the folder's bloom width)
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Code at `column`
    pub fn code(&self, column: usize) -> u8 {
        self.0[column]
    }

    /// XOR another vector of the same width into this one, in place
    pub fn xor_assign(&mut self, other: &Self) -> Result<()> {
        if self.width() != other.width() {
            return Err(OdoryError::invalid(format!(
                "mac vector width mismatch: {} vs {}",
                self.width(),
                other.width()
            )));
        }
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a ^= b;
        }
        Ok(())
    }

    /// XOR-combination of this vector with another
    pub fn xor(&self, other: &Self) -> Result<Self> {
        let mut out = self.clone();
        out.xor_assign(other)?;
        Ok(out)
    }

    /// The raw codes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Hex rendering for log lines
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// One replica's observed `(version_counter, mac_vector)` pair
///
/// Outside an in-flight mutation the two replicas' snapshots are equal, and
/// the counter moves by exactly 1 per successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSnapshot {
    /// Monotonically increasing mutation counter
    pub version_counter: u64,
    /// Aggregate per-column MAC vector
    pub mac_vector: MacVector,
}

impl ReplicaSnapshot {
    /// Snapshot of an empty folder
    pub fn empty(width: usize) -> Self {
        Self {
            version_counter: 0,
            mac_vector: MacVector::zeros(width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_row_rejects_non_bits() {
        assert!(BitRow::from_bits(vec![0, 1, 2]).is_err());
        assert!(BitRow::from_bits(vec![0, 1, 1, 0]).is_ok());
    }

    #[test]
    fn test_bit_row_xor_is_involutive() {
        let a = BitRow::from_bits(vec![1, 0, 1, 1]).unwrap();
        let b = BitRow::from_bits(vec![0, 0, 1, 0]).unwrap();
        let masked = a.xor(&b).unwrap();
        assert_eq!(masked.xor(&b).unwrap(), a);
    }

    #[test]
    fn test_bit_row_width_mismatch() {
        let a = BitRow::zeros(4);
        let b = BitRow::zeros(5);
        assert!(a.xor(&b).is_err());
    }

    #[test]
    fn test_mac_vector_cancellation() {
        let mut agg = MacVector::zeros(3);
        let d = MacVector::from_codes(vec![7, 0, 255]);
        agg.xor_assign(&d).unwrap();
        assert_eq!(agg, d);
        agg.xor_assign(&d).unwrap();
        assert_eq!(agg, MacVector::zeros(3));
    }

    #[test]
    fn test_snapshot_equality() {
        let a = ReplicaSnapshot::empty(8);
        let b = ReplicaSnapshot::empty(8);
        assert_eq!(a, b);
    }
}
