//! Server-side share evaluation
//!
//! Evaluates a key-share bundle against every (column, row) cell. The
//! matrix is embarrassingly parallel: columns are partitioned across an
//! explicitly sized worker pool, each worker writing a disjoint range of one
//! preallocated buffer. Parallelism is a throughput knob only; results are
//! identical at any pool size.

use crate::dpf;
use crate::query::{ColumnKeyShare, SearchKeyShares};
use odory_core::{OdoryError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Partial result bits for every (column, row) cell, from one replica
///
/// Meaningless alone; XOR with the other replica's matrix reconstructs the
/// selected masked bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialResultMatrix {
    /// Per-column bit vectors, one bit per row
    pub columns: Vec<Vec<u8>>,
}

impl PartialResultMatrix {
    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows (0 for an empty matrix)
    pub fn doc_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// XOR-combine with the other replica's matrix
    pub fn combine(&self, other: &Self) -> Result<Self> {
        if self.width() != other.width() || self.doc_count() != other.doc_count() {
            return Err(OdoryError::invalid(format!(
                "partial matrix shape mismatch: {}x{} vs {}x{}",
                self.width(),
                self.doc_count(),
                other.width(),
                other.doc_count()
            )));
        }
        Ok(Self {
            columns: self
                .columns
                .iter()
                .zip(other.columns.iter())
                .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect())
                .collect(),
        })
    }
}

/// Explicitly sized worker pool for share evaluation
///
/// Pool size is a constructor parameter, not process-global state.
#[derive(Debug)]
pub struct EvalPool {
    pool: rayon::ThreadPool,
}

impl EvalPool {
    /// Build a pool with `workers` threads (0 lets the runtime choose)
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| OdoryError::internal(format!("eval pool: {e}")))?;
        Ok(Self { pool })
    }

    /// Evaluate one party's bundle against its stored masked bitmap
    ///
    /// `masked_bits` is column-major: `masked_bits[column][row]` is the
    /// replica's stored masked bit for that cell. Each output cell is
    /// `eval(party, key, point) AND masked_bit`.
    pub fn eval_matrix(
        &self,
        shares: &SearchKeyShares,
        masked_bits: &[Vec<u8>],
    ) -> Result<PartialResultMatrix> {
        if masked_bits.len() != shares.columns.len() {
            return Err(OdoryError::invalid(format!(
                "bitmap width {} does not match share width {}",
                masked_bits.len(),
                shares.columns.len()
            )));
        }
        let doc_count = shares.doc_count();
        if let Some(short) = masked_bits.iter().find(|col| col.len() != doc_count) {
            return Err(OdoryError::invalid(format!(
                "bitmap column of {} rows does not match share domain {doc_count}",
                short.len()
            )));
        }

        let party = shares.party.bit();
        debug!(
            party,
            columns = shares.columns.len(),
            rows = doc_count,
            "evaluating search shares"
        );

        // Disjoint output ranges: one preallocated buffer, chunked per
        // column, each chunk owned by exactly one worker.
        let width = shares.columns.len();
        let mut buffer = vec![0u8; width * doc_count];
        self.pool.install(|| {
            buffer
                .par_chunks_mut(doc_count.max(1))
                .zip(shares.columns.par_iter())
                .zip(masked_bits.par_iter())
                .for_each(|((out, share), bits)| {
                    eval_column_into(party, share, bits, out);
                });
        });

        Ok(PartialResultMatrix {
            columns: buffer.chunks(doc_count.max(1)).map(<[u8]>::to_vec).collect(),
        })
    }
}

/// Evaluate one column share into a preallocated row buffer
fn eval_column_into(party: u8, share: &ColumnKeyShare, masked_bits: &[u8], out: &mut [u8]) {
    for row in 0..share.points.len() {
        let selected = dpf::eval(party, &share.keys[row], share.points[row]);
        out[row] = selected & masked_bits[row];
    }
}
