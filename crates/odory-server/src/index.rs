//! The per-replica server index
//!
//! One [`ServerIndex`] per replica owns the folder's masked bitmap table,
//! version counter and MAC vector, plus an injected blob repository and an
//! evaluation pool for oblivious search. Mutations update table, vector and
//! counter together or not at all; batch shape violations are rejected
//! before any state changes. The server never unmasks a row and never
//! decrypts a blob: it stores what the client sends and trusts the
//! client-submitted aggregate MAC (a documented limitation of the design).

use crate::repository::DocumentRepository;
use odory_core::{
    BitRow, DocId, FolderConfig, MacVector, OdoryError, ReplicaSnapshot, Result, VersionToken,
};
use odory_fss::EvalPool;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Masked row and version as stored for one document
#[derive(Debug, Clone)]
pub(crate) struct IndexedRow {
    pub masked_row: BitRow,
    pub version: VersionToken,
}

/// One replica's folder index
pub struct ServerIndex<R: DocumentRepository> {
    config: FolderConfig,
    repo: R,
    pub(crate) bitmaps: BTreeMap<DocId, IndexedRow>,
    version_counter: u64,
    mac_vector: MacVector,
    pub(crate) pool: EvalPool,
}

impl<R: DocumentRepository> ServerIndex<R> {
    /// Fresh empty index over an injected repository
    ///
    /// `eval_workers` sizes the search evaluation pool (0 lets the runtime
    /// choose).
    pub fn new(config: FolderConfig, repo: R, eval_workers: usize) -> Result<Self> {
        Ok(Self {
            config,
            repo,
            bitmaps: BTreeMap::new(),
            version_counter: 0,
            mac_vector: MacVector::zeros(config.bloom_width),
            pool: EvalPool::new(eval_workers)?,
        })
    }

    /// Folder geometry this index serves
    pub fn config(&self) -> FolderConfig {
        self.config
    }

    /// Current bitmap version counter
    pub fn get_bitmaps_version(&self) -> u64 {
        self.version_counter
    }

    /// Number of indexed documents
    pub fn get_indexed_document_count(&self) -> usize {
        self.bitmaps.len()
    }

    /// Current aggregate per-column MAC vector
    pub fn retrieve_col_macs(&self) -> MacVector {
        self.mac_vector.clone()
    }

    /// Counter and MAC vector in one observation
    pub fn snapshot(&self) -> ReplicaSnapshot {
        ReplicaSnapshot {
            version_counter: self.version_counter,
            mac_vector: self.mac_vector.clone(),
        }
    }

    /// Stored (masked row, version) pairs for the given ids, in id order
    pub fn get_bitmaps_doc_versions_by_doc_ids(
        &self,
        ids: &[DocId],
    ) -> Result<Vec<(BitRow, VersionToken)>> {
        ids.iter()
            .map(|id| {
                self.bitmaps
                    .get(id)
                    .map(|row| (row.masked_row.clone(), row.version.clone()))
                    .ok_or_else(|| OdoryError::not_found(format!("{id}")))
            })
            .collect()
    }

    /// All indexed document ids, ascending
    pub fn retrieve_doc_ids(&self) -> Vec<DocId> {
        self.bitmaps.keys().copied().collect()
    }

    /// Stored blobs for the given ids
    pub fn retrieve_encrypted_files_by_ids(&self, ids: &[DocId]) -> Result<Vec<Vec<u8>>> {
        ids.iter().map(|id| self.repo.read(*id)).collect()
    }

    /// Create a batch of documents
    ///
    /// Stores blobs, masked rows and versions, replaces the aggregate MAC,
    /// and advances the counter together. Returns the assigned ids.
    pub fn upload_encrypted_files(
        &mut self,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<Vec<DocId>> {
        self.check_batch(blobs.len(), masked_rows.len(), versions.len())?;
        self.check_rows(&masked_rows)?;
        self.check_transition(&new_mac, new_counter)?;

        let mut ids = Vec::with_capacity(blobs.len());
        for (blob, (masked_row, version)) in blobs
            .into_iter()
            .zip(masked_rows.into_iter().zip(versions.into_iter()))
        {
            let id = self.repo.create(blob)?;
            self.bitmaps.insert(
                id,
                IndexedRow {
                    masked_row,
                    version,
                },
            );
            ids.push(id);
        }
        self.mac_vector = new_mac;
        self.version_counter = new_counter;
        info!(
            count = ids.len(),
            version = new_counter,
            "uploaded documents"
        );
        Ok(ids)
    }

    /// Remove a batch of documents
    pub fn remove_encrypted_files_by_ids(
        &mut self,
        ids: &[DocId],
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<bool> {
        if ids.is_empty() {
            return Err(OdoryError::batch_size_mismatch("empty removal batch"));
        }
        if let Some(missing) = ids.iter().find(|id| !self.bitmaps.contains_key(id)) {
            return Err(OdoryError::not_found(format!("{missing}")));
        }
        self.check_transition(&new_mac, new_counter)?;

        for id in ids {
            self.repo.delete(*id)?;
            self.bitmaps.remove(id);
        }
        self.mac_vector = new_mac;
        self.version_counter = new_counter;
        info!(count = ids.len(), version = new_counter, "removed documents");
        Ok(true)
    }

    /// Replace a batch of documents' blobs, rows and versions
    pub fn update_files_by_ids(
        &mut self,
        ids: &[DocId],
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<bool> {
        if ids.len() != blobs.len() {
            return Err(OdoryError::batch_size_mismatch(format!(
                "{} ids vs {} blobs",
                ids.len(),
                blobs.len()
            )));
        }
        self.check_batch(blobs.len(), masked_rows.len(), versions.len())?;
        self.check_rows(&masked_rows)?;
        if let Some(missing) = ids.iter().find(|id| !self.bitmaps.contains_key(id)) {
            return Err(OdoryError::not_found(format!("{missing}")));
        }
        self.check_transition(&new_mac, new_counter)?;

        for (id, (blob, (masked_row, version))) in ids
            .iter()
            .zip(blobs.into_iter().zip(masked_rows.into_iter().zip(versions)))
        {
            self.repo.update(*id, blob)?;
            self.bitmaps.insert(
                *id,
                IndexedRow {
                    masked_row,
                    version,
                },
            );
        }
        self.mac_vector = new_mac;
        self.version_counter = new_counter;
        info!(count = ids.len(), version = new_counter, "updated documents");
        Ok(true)
    }

    /// Overwrite the stored MAC vector, bypassing every check
    ///
    /// Test hook for simulating server-side corruption; not part of the
    /// replica surface.
    #[doc(hidden)]
    pub fn corrupt_col_macs(&mut self, mac: MacVector) {
        self.mac_vector = mac;
    }

    fn check_batch(&self, blobs: usize, rows: usize, versions: usize) -> Result<()> {
        if blobs != rows || rows != versions {
            return Err(OdoryError::batch_size_mismatch(format!(
                "{blobs} blobs vs {rows} rows vs {versions} versions"
            )));
        }
        if blobs == 0 {
            return Err(OdoryError::batch_size_mismatch("empty batch"));
        }
        Ok(())
    }

    fn check_rows(&self, masked_rows: &[BitRow]) -> Result<()> {
        if let Some(bad) = masked_rows
            .iter()
            .find(|r| r.width() != self.config.bloom_width)
        {
            return Err(OdoryError::invalid(format!(
                "row width {} does not match bloom width {}",
                bad.width(),
                self.config.bloom_width
            )));
        }
        Ok(())
    }

    fn check_transition(&self, new_mac: &MacVector, new_counter: u64) -> Result<()> {
        if new_mac.width() != self.config.bloom_width {
            return Err(OdoryError::invalid(format!(
                "mac width {} does not match bloom width {}",
                new_mac.width(),
                self.config.bloom_width
            )));
        }
        if new_counter != self.version_counter + 1 {
            return Err(OdoryError::invalid(format!(
                "stale version counter: submitted {new_counter}, current {}",
                self.version_counter
            )));
        }
        debug!(
            from = self.version_counter,
            to = new_counter,
            "version counter transition"
        );
        Ok(())
    }
}
