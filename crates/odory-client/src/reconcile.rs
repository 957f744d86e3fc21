//! Search result reconciliation
//!
//! Combines the two replicas' partial matrices, unmasks the target columns
//! row by row, and keeps a row only when every target bit is 1. Before any
//! result leaves this module the recovered masked bits are folded back into
//! per-column MAC aggregates and checked against what each replica
//! reported: a disagreement means a corrupted or tampered index, and the
//! search aborts with no partial results.

use odory_core::{DocId, MacVector, OdoryError, Result};
use odory_index::{MacEngine, VersionMasker};
use odory_server::ServerSearchResponse;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Recombines, unmasks and verifies the two replicas' partial answers
#[derive(Debug, Clone)]
pub struct ResultReconciler {
    masker: VersionMasker,
    mac_engine: MacEngine,
}

impl ResultReconciler {
    /// Build a reconciler over the folder's masker and MAC engine
    pub fn new(masker: VersionMasker, mac_engine: MacEngine) -> Self {
        Self { masker, mac_engine }
    }

    /// Reconcile one keyword search
    ///
    /// `target_columns` are the keyword's hash positions; `reported_a` /
    /// `reported_b` are the MAC vectors the replicas claimed. Returns the
    /// matching document ids, ascending.
    pub fn reconcile(
        &self,
        target_columns: &BTreeSet<usize>,
        bloom_width: usize,
        response_a: &ServerSearchResponse,
        response_b: &ServerSearchResponse,
        reported_a: &MacVector,
        reported_b: &MacVector,
    ) -> Result<Vec<DocId>> {
        if response_a.row_to_doc != response_b.row_to_doc {
            return Err(OdoryError::inconsistent_replicas(
                "replicas returned different row maps",
            ));
        }
        if response_a.doc_versions != response_b.doc_versions {
            return Err(OdoryError::inconsistent_replicas(
                "replicas returned different document versions",
            ));
        }
        let doc_count = response_a.row_to_doc.len();
        if response_a.partial.doc_count() != doc_count
            || response_b.partial.doc_count() != doc_count
        {
            return Err(OdoryError::document_count_mismatch(format!(
                "partial matrices sized {} / {} for {doc_count} rows",
                response_a.partial.doc_count(),
                response_b.partial.doc_count()
            )));
        }

        let combined = response_a.partial.combine(&response_b.partial)?;

        // Recovered masked bits for the target columns, every row.
        self.verify_column_macs(target_columns, &combined.columns, response_a, reported_a, "A")?;
        self.verify_column_macs(target_columns, &combined.columns, response_b, reported_b, "B")?;

        let mut matches = Vec::new();
        for row in 0..doc_count {
            let version = &response_a.doc_versions[row];
            let pad = self.masker.pad(version, bloom_width);
            let all_set = target_columns
                .iter()
                .all(|col| combined.columns[*col][row] ^ pad.bit(*col) == 1);
            if all_set {
                matches.push(response_a.row_to_doc[row]);
            }
        }
        debug!(
            matches = matches.len(),
            rows = doc_count,
            "reconciled search"
        );
        Ok(matches)
    }

    /// Fold the recovered masked bits into per-column aggregates and
    /// compare with one replica's reported vector at the target columns
    fn verify_column_macs(
        &self,
        target_columns: &BTreeSet<usize>,
        combined_columns: &[Vec<u8>],
        response: &ServerSearchResponse,
        reported: &MacVector,
        replica: &str,
    ) -> Result<()> {
        for &column in target_columns {
            let mut expected = 0u8;
            for (row, version) in response.doc_versions.iter().enumerate() {
                expected ^=
                    self.mac_engine
                        .mac_code(combined_columns[column][row], column, version);
            }
            if expected != reported.code(column) {
                warn!(replica, column, "column MAC verification failed");
                return Err(OdoryError::mac_mismatch(format!(
                    "replica {replica} column {column}: expected {expected:#04x}, reported {:#04x}",
                    reported.code(column)
                )));
            }
        }
        Ok(())
    }
}
