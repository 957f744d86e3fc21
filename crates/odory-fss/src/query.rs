//! Oblivious column-selection queries
//!
//! For a keyword's deduplicated target columns, [`FssQueryBuilder`] builds a
//! key-share bundle covering **every** bloom column, so a replica sees the
//! same shape of work whatever the keyword was. Per column and per row a DPF
//! instance is programmed at that row's own index; the bundle's public
//! evaluation points decide whether the instance can ever fire:
//!
//! - target column: the point *is* the row's own index, so the shared
//!   function selects every row;
//! - non-target column: the point is shifted past every valid row index by
//!   a nonzero random offset, so the shared function selects nothing.
//!
//! Both halves of a column bundle carry the identical public points; only
//! the private DPF key material differs. The decoy construction's hiding
//! strength is an open question inherited from the source design; it is
//! implemented exactly as stated, not strengthened.

use crate::dpf::{self, DpfKey};
use odory_core::{OdoryError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Exclusive upper bound on the random decoy shift added past `doc_count`
const DECOY_SHIFT_RANGE: u64 = 1 << 15;

/// Public party identifier accompanying a key-share bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyId {
    /// First replica
    A,
    /// Second replica
    B,
}

impl PartyId {
    /// The numeric id fed to the DPF evaluation
    pub fn bit(&self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// One party's share for a single bloom column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnKeyShare {
    /// Column index in `[0, bloom_width)`
    pub column: usize,
    /// Public evaluation points, one per row; identical in both halves
    pub points: Vec<u64>,
    /// Private DPF key halves, one per row
    pub keys: Vec<DpfKey>,
}

/// One party's full bundle: a share for every bloom column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchKeyShares {
    /// Which replica this bundle is for
    pub party: PartyId,
    /// Per-column shares, in column order
    pub columns: Vec<ColumnKeyShare>,
}

impl SearchKeyShares {
    /// Number of rows every column share was sized for
    pub fn doc_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.points.len())
    }
}

/// Builds two-party key-share bundles for oblivious column selection
///
/// Stateless; construct once and reuse across searches.
#[derive(Debug, Clone, Default)]
pub struct FssQueryBuilder;

impl FssQueryBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self
    }

    /// Build the two bundles for one keyword search
    ///
    /// `target_columns` are the keyword's deduplicated hash positions;
    /// `bloom_width` and `doc_count` size the bundle. Returns the party-A
    /// and party-B bundles.
    pub fn build<R: Rng>(
        &self,
        target_columns: &BTreeSet<usize>,
        bloom_width: usize,
        doc_count: usize,
        rng: &mut R,
    ) -> Result<(SearchKeyShares, SearchKeyShares)> {
        if doc_count == 0 {
            return Err(OdoryError::invalid(
                "cannot build search shares over zero documents",
            ));
        }
        if let Some(out_of_range) = target_columns.iter().find(|c| **c >= bloom_width) {
            return Err(OdoryError::invalid(format!(
                "target column {out_of_range} outside bloom width {bloom_width}"
            )));
        }

        // One domain size for every instance: wide enough for both real row
        // indices and shifted decoy points.
        let max_point = doc_count as u64 * 2 + DECOY_SHIFT_RANGE;
        let domain_bits = dpf::domain_bits_for(max_point);

        let mut columns_a = Vec::with_capacity(bloom_width);
        let mut columns_b = Vec::with_capacity(bloom_width);

        for column in 0..bloom_width {
            let is_target = target_columns.contains(&column);
            let mut points = Vec::with_capacity(doc_count);
            let mut keys_a = Vec::with_capacity(doc_count);
            let mut keys_b = Vec::with_capacity(doc_count);

            for row in 0..doc_count {
                let alpha = row as u64;
                let point = if is_target {
                    alpha
                } else {
                    // Off every valid row index: at least doc_count away.
                    alpha + doc_count as u64 + rng.gen_range(0..DECOY_SHIFT_RANGE)
                };
                let (key_a, key_b) = dpf::gen(alpha, domain_bits, rng);
                points.push(point);
                keys_a.push(key_a);
                keys_b.push(key_b);
            }

            columns_a.push(ColumnKeyShare {
                column,
                points: points.clone(),
                keys: keys_a,
            });
            columns_b.push(ColumnKeyShare {
                column,
                points,
                keys: keys_b,
            });
        }

        Ok((
            SearchKeyShares {
                party: PartyId::A,
                columns: columns_a,
            },
            SearchKeyShares {
                party: PartyId::B,
                columns: columns_b,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpf;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_build_covers_every_column() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let targets = BTreeSet::from([1usize, 4]);
        let (a, b) = FssQueryBuilder::new()
            .build(&targets, 8, 3, &mut rng)
            .unwrap();
        assert_eq!(a.columns.len(), 8);
        assert_eq!(b.columns.len(), 8);
        assert_eq!(a.doc_count(), 3);
        for (ca, cb) in a.columns.iter().zip(b.columns.iter()) {
            assert_eq!(ca.points, cb.points, "public points must be identical");
        }
    }

    #[test]
    fn test_target_columns_select_every_row() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let targets = BTreeSet::from([2usize]);
        let (a, b) = FssQueryBuilder::new()
            .build(&targets, 4, 5, &mut rng)
            .unwrap();
        for row in 0..5 {
            let bit_a = dpf::eval(0, &a.columns[2].keys[row], a.columns[2].points[row]);
            let bit_b = dpf::eval(1, &b.columns[2].keys[row], b.columns[2].points[row]);
            assert_eq!(bit_a ^ bit_b, 1);
        }
    }

    #[test]
    fn test_decoy_columns_select_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let targets = BTreeSet::from([0usize]);
        let (a, b) = FssQueryBuilder::new()
            .build(&targets, 4, 5, &mut rng)
            .unwrap();
        for column in 1..4 {
            for row in 0..5 {
                let bit_a = dpf::eval(0, &a.columns[column].keys[row], a.columns[column].points[row]);
                let bit_b = dpf::eval(1, &b.columns[column].keys[row], b.columns[column].points[row]);
                assert_eq!(bit_a ^ bit_b, 0);
            }
        }
    }

    #[test]
    fn test_rejects_empty_domain_and_bad_columns() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let builder = FssQueryBuilder::new();
        assert!(builder
            .build(&BTreeSet::from([0usize]), 4, 0, &mut rng)
            .is_err());
        assert!(builder
            .build(&BTreeSet::from([9usize]), 4, 2, &mut rng)
            .is_err());
    }
}
