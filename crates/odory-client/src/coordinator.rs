//! Two-replica consistency gate
//!
//! Every mutation runs the same protocol: observe both replicas'
//! `(version_counter, mac_vector)` and require them bit-for-bit equal,
//! apply the identical payload to both, then observe again. A pre-write
//! disagreement aborts with zero writes (`InconsistentReplicaState`); a
//! post-write disagreement means the replicas have already diverged
//! (`ReplicationDivergence`) with no automatic repair; a crash
//! between the two writes is a known, unrecovered failure mode. There is no
//! two-phase commit here.
//!
//! Mutations on a folder are serialized behind an async mutex; every
//! replica RPC runs under a bounded timeout, and a timeout is treated as a
//! connection failure.

use crate::replica::ReplicaClient;
use odory_core::{
    BitRow, DocId, MacVector, OdoryError, ReplicaSnapshot, Result, VersionToken,
};
use odory_fss::SearchKeyShares;
use odory_server::ServerSearchResponse;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info};

/// Coordinates identical writes across the two replicas of one folder
pub struct ReplicaCoordinator<C: ReplicaClient> {
    replica_a: C,
    replica_b: C,
    rpc_timeout: Duration,
    mutation_lock: tokio::sync::Mutex<()>,
}

impl<C: ReplicaClient> ReplicaCoordinator<C> {
    /// Pair two replica clients under one RPC timeout bound
    pub fn new(replica_a: C, replica_b: C, rpc_timeout: Duration) -> Self {
        Self {
            replica_a,
            replica_b,
            rpc_timeout,
            mutation_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match tokio::time::timeout(self.rpc_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(OdoryError::connection_failure(format!(
                "replica RPC exceeded {:?}",
                self.rpc_timeout
            ))),
        }
    }

    async fn snapshot_of(&self, replica: &C) -> Result<ReplicaSnapshot> {
        let version_counter = self.bounded(replica.get_bitmaps_version()).await?;
        let mac_vector = self.bounded(replica.retrieve_col_macs()).await?;
        Ok(ReplicaSnapshot {
            version_counter,
            mac_vector,
        })
    }

    /// Observe both replicas and require identical state
    ///
    /// Returns the agreed snapshot. `phase` labels the error ("pre" or
    /// "post" gate).
    async fn consistent_snapshot(&self, phase: &str) -> Result<ReplicaSnapshot> {
        let snap_a = self.snapshot_of(&self.replica_a).await?;
        let snap_b = self.snapshot_of(&self.replica_b).await?;
        if snap_a != snap_b {
            return Err(OdoryError::inconsistent_replicas(format!(
                "{phase} check: A=(v{}, {}) B=(v{}, {})",
                snap_a.version_counter,
                snap_a.mac_vector.to_hex(),
                snap_b.version_counter,
                snap_b.mac_vector.to_hex()
            )));
        }
        debug!(phase, version = snap_a.version_counter, "replicas agree");
        Ok(snap_a)
    }

    async fn post_check(&self) -> Result<ReplicaSnapshot> {
        match self.consistent_snapshot("post").await {
            Ok(snapshot) => Ok(snapshot),
            Err(OdoryError::InconsistentReplicaState { message }) => {
                error!(%message, "replicas diverged after an applied mutation");
                Err(OdoryError::replication_divergence(message))
            }
            Err(other) => Err(other),
        }
    }

    /// Probe both replicas
    pub async fn verify_connection(&self) -> Result<()> {
        self.bounded(self.replica_a.get_bitmaps_version()).await?;
        self.bounded(self.replica_b.get_bitmaps_version()).await?;
        Ok(())
    }

    /// Upload a batch to both replicas
    ///
    /// `mac_delta` is the XOR of the new documents' per-column codes; the
    /// new aggregate and counter are derived from the gated snapshot.
    pub async fn upload(
        &self,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        mac_delta: &MacVector,
    ) -> Result<Vec<DocId>> {
        let _guard = self.mutation_lock.lock().await;
        let snapshot = self.consistent_snapshot("pre").await?;
        let new_mac = snapshot.mac_vector.xor(mac_delta)?;
        let new_counter = snapshot.version_counter + 1;

        let ids_a = self
            .bounded(self.replica_a.upload_encrypted_files(
                blobs.clone(),
                masked_rows.clone(),
                versions.clone(),
                new_mac.clone(),
                new_counter,
            ))
            .await?;
        let ids_b = self
            .bounded(self.replica_b.upload_encrypted_files(
                blobs,
                masked_rows,
                versions,
                new_mac,
                new_counter,
            ))
            .await?;
        if ids_a != ids_b {
            error!(?ids_a, ?ids_b, "replicas assigned different ids");
            return Err(OdoryError::replication_divergence(
                "replicas assigned different document ids",
            ));
        }
        self.post_check().await?;
        info!(count = ids_a.len(), version = new_counter, "upload applied");
        Ok(ids_a)
    }

    /// Remove a batch from both replicas
    ///
    /// `mac_delta` is the XOR of the removed documents' codes (removal and
    /// addition are the same XOR).
    pub async fn remove(&self, ids: Vec<DocId>, mac_delta: &MacVector) -> Result<bool> {
        let _guard = self.mutation_lock.lock().await;
        let snapshot = self.consistent_snapshot("pre").await?;
        let new_mac = snapshot.mac_vector.xor(mac_delta)?;
        let new_counter = snapshot.version_counter + 1;

        let ok_a = self
            .bounded(self.replica_a.remove_encrypted_files_by_ids(
                ids.clone(),
                new_mac.clone(),
                new_counter,
            ))
            .await?;
        let ok_b = self
            .bounded(
                self.replica_b
                    .remove_encrypted_files_by_ids(ids.clone(), new_mac, new_counter),
            )
            .await?;
        self.post_check().await?;
        info!(count = ids.len(), version = new_counter, "removal applied");
        Ok(ok_a && ok_b)
    }

    /// Replace a batch on both replicas
    pub async fn update(
        &self,
        ids: Vec<DocId>,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        mac_delta: &MacVector,
    ) -> Result<bool> {
        let _guard = self.mutation_lock.lock().await;
        let snapshot = self.consistent_snapshot("pre").await?;
        let new_mac = snapshot.mac_vector.xor(mac_delta)?;
        let new_counter = snapshot.version_counter + 1;

        let ok_a = self
            .bounded(self.replica_a.update_files_by_ids(
                ids.clone(),
                blobs.clone(),
                masked_rows.clone(),
                versions.clone(),
                new_mac.clone(),
                new_counter,
            ))
            .await?;
        let ok_b = self
            .bounded(self.replica_b.update_files_by_ids(
                ids.clone(),
                blobs,
                masked_rows,
                versions,
                new_mac,
                new_counter,
            ))
            .await?;
        self.post_check().await?;
        info!(count = ids.len(), version = new_counter, "update applied");
        Ok(ok_a && ok_b)
    }

    /// All indexed document ids (read-only, no gate)
    pub async fn retrieve_doc_ids(&self) -> Result<Vec<DocId>> {
        self.bounded(self.replica_a.retrieve_doc_ids()).await
    }

    /// Stored blobs by id (read-only, no gate)
    pub async fn retrieve_encrypted_files_by_ids(&self, ids: Vec<DocId>) -> Result<Vec<Vec<u8>>> {
        self.bounded(self.replica_a.retrieve_encrypted_files_by_ids(ids))
            .await
    }

    /// Stored (masked row, version) pairs by id (read-only, no gate)
    pub async fn fetch_doc_rows(&self, ids: Vec<DocId>) -> Result<Vec<(BitRow, VersionToken)>> {
        self.bounded(
            self.replica_a
                .get_bitmaps_doc_versions_by_doc_ids(ids),
        )
        .await
    }

    /// Matching document counts on both replicas, a precondition for
    /// sizing the FSS domain
    pub async fn agreed_document_count(&self) -> Result<usize> {
        let count_a = self
            .bounded(self.replica_a.get_indexed_document_count())
            .await?;
        let count_b = self
            .bounded(self.replica_b.get_indexed_document_count())
            .await?;
        if count_a != count_b {
            return Err(OdoryError::document_count_mismatch(format!(
                "A indexes {count_a} documents, B indexes {count_b}"
            )));
        }
        Ok(count_a)
    }

    /// Dispatch one key-share bundle to each replica
    ///
    /// Read-only: no consistency gate. Returns both partial responses plus
    /// each replica's reported MAC vector; the reconciler verifies both
    /// reports independently, so a single corrupted replica surfaces as a
    /// MAC mismatch rather than being masked by a pre-check.
    pub async fn oblivious_search(
        &self,
        shares_a: SearchKeyShares,
        shares_b: SearchKeyShares,
    ) -> Result<(ServerSearchResponse, ServerSearchResponse, MacVector, MacVector)> {
        let macs_a = self.bounded(self.replica_a.retrieve_col_macs()).await?;
        let macs_b = self.bounded(self.replica_b.retrieve_col_macs()).await?;
        let response_a = self.bounded(self.replica_a.server_search(shares_a)).await?;
        let response_b = self.bounded(self.replica_b.server_search(shares_b)).await?;
        Ok((response_a, response_b, macs_a, macs_b))
    }

    /// Naive fallback search on replica A (read-only, no gate)
    pub async fn naive_search(
        &self,
        column_index_sets: Vec<Vec<usize>>,
    ) -> Result<Vec<Vec<DocId>>> {
        self.bounded(
            self.replica_a
                .search_documents_by_keyword_indices(column_index_sets),
        )
        .await
    }
}
