//! Replica-side search evaluation
//!
//! The oblivious path evaluates one party's key-share bundle over the
//! stored masked bitmap and returns a partial result matrix together with
//! the row-to-document map and per-row version tokens the client needs to
//! unmask and verify. The naive path matches stored rows directly against
//! explicit column sets; it bypasses the oblivious machinery and exists for
//! fallback and testing only.

use crate::index::ServerIndex;
use crate::repository::DocumentRepository;
use odory_core::{DocId, OdoryError, Result, VersionToken};
use odory_fss::{PartialResultMatrix, SearchKeyShares};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One replica's answer to an oblivious search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSearchResponse {
    /// Partial result bits for every (column, row) cell
    pub partial: PartialResultMatrix,
    /// Document id at each row position
    pub row_to_doc: Vec<DocId>,
    /// Version token at each row position
    pub doc_versions: Vec<VersionToken>,
}

impl<R: DocumentRepository> ServerIndex<R> {
    /// Evaluate one party's key shares against the stored masked bitmap
    ///
    /// The share domain must match this replica's indexed document count
    /// exactly; rows are ordered by ascending document id, the same order
    /// the other replica uses.
    pub fn server_search(&self, shares: &SearchKeyShares) -> Result<ServerSearchResponse> {
        let doc_count = self.get_indexed_document_count();
        if shares.doc_count() != doc_count {
            return Err(OdoryError::document_count_mismatch(format!(
                "shares sized for {} rows, replica indexes {doc_count}",
                shares.doc_count()
            )));
        }

        let width = self.config().bloom_width;
        let mut row_to_doc = Vec::with_capacity(doc_count);
        let mut doc_versions = Vec::with_capacity(doc_count);
        let mut masked_bits = vec![Vec::with_capacity(doc_count); width];
        for (id, row) in &self.bitmaps {
            row_to_doc.push(*id);
            doc_versions.push(row.version.clone());
            for (column, bits) in masked_bits.iter_mut().enumerate() {
                bits.push(row.masked_row.bit(column));
            }
        }

        debug!(party = shares.party.bit(), rows = doc_count, "server search");
        let partial = self.pool.eval_matrix(shares, &masked_bits)?;
        Ok(ServerSearchResponse {
            partial,
            row_to_doc,
            doc_versions,
        })
    }

    /// Naive non-oblivious search over stored rows
    ///
    /// For each index set, returns the ids of rows whose stored bits are 1
    /// at every listed column. Operates on rows as stored (masked);
    /// fallback/testing use only.
    pub fn search_documents_by_keyword_indices(
        &self,
        column_index_sets: &[Vec<usize>],
    ) -> Result<Vec<Vec<DocId>>> {
        let width = self.config().bloom_width;
        for set in column_index_sets {
            if let Some(bad) = set.iter().find(|c| **c >= width) {
                return Err(OdoryError::invalid(format!(
                    "column index {bad} outside bloom width {width}"
                )));
            }
        }

        Ok(column_index_sets
            .iter()
            .map(|set| {
                self.bitmaps
                    .iter()
                    .filter(|(_, row)| set.iter().all(|c| row.masked_row.bit(*c) == 1))
                    .map(|(id, _)| *id)
                    .collect()
            })
            .collect())
    }
}
