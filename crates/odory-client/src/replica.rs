//! The replica transport seam
//!
//! [`ReplicaClient`] is the exact remote surface a replica exposes; any
//! transport (HTTP-RPC, gRPC, ...) binds to it via an adapter kept outside
//! this core. [`LoopbackReplica`] is the in-process binding used by tests
//! and single-machine deployments: it drives a [`ServerIndex`] directly
//! behind a mutex.

use async_trait::async_trait;
use odory_core::{BitRow, DocId, MacVector, ReplicaSnapshot, Result, VersionToken};
use odory_fss::SearchKeyShares;
use odory_server::{InMemoryRepository, ServerIndex, ServerSearchResponse};
use parking_lot::Mutex;
use std::sync::Arc;

/// Async client for one replica's remote surface
#[async_trait]
pub trait ReplicaClient: Send + Sync {
    /// Current bitmap version counter
    async fn get_bitmaps_version(&self) -> Result<u64>;

    /// Number of indexed documents
    async fn get_indexed_document_count(&self) -> Result<usize>;

    /// Aggregate per-column MAC vector
    async fn retrieve_col_macs(&self) -> Result<MacVector>;

    /// Stored (masked row, version) pairs for the given ids
    async fn get_bitmaps_doc_versions_by_doc_ids(
        &self,
        ids: Vec<DocId>,
    ) -> Result<Vec<(BitRow, VersionToken)>>;

    /// Create a batch of documents; returns assigned ids
    async fn upload_encrypted_files(
        &self,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<Vec<DocId>>;

    /// Remove a batch of documents
    async fn remove_encrypted_files_by_ids(
        &self,
        ids: Vec<DocId>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<bool>;

    /// Replace a batch of documents
    async fn update_files_by_ids(
        &self,
        ids: Vec<DocId>,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<bool>;

    /// All indexed document ids
    async fn retrieve_doc_ids(&self) -> Result<Vec<DocId>>;

    /// Stored blobs for the given ids
    async fn retrieve_encrypted_files_by_ids(&self, ids: Vec<DocId>) -> Result<Vec<Vec<u8>>>;

    /// Naive non-oblivious search (fallback/testing)
    async fn search_documents_by_keyword_indices(
        &self,
        column_index_sets: Vec<Vec<usize>>,
    ) -> Result<Vec<Vec<DocId>>>;

    /// Evaluate one party's search shares
    async fn server_search(&self, shares: SearchKeyShares) -> Result<ServerSearchResponse>;
}

/// In-process replica binding over a shared [`ServerIndex`]
#[derive(Clone)]
pub struct LoopbackReplica {
    index: Arc<Mutex<ServerIndex<InMemoryRepository>>>,
}

impl LoopbackReplica {
    /// Wrap an index as a replica endpoint
    pub fn new(index: ServerIndex<InMemoryRepository>) -> Self {
        Self {
            index: Arc::new(Mutex::new(index)),
        }
    }

    /// Direct access to the underlying index, for tests that need to
    /// manipulate a replica out-of-band (desync, corruption)
    pub fn with_index<T>(&self, f: impl FnOnce(&mut ServerIndex<InMemoryRepository>) -> T) -> T {
        f(&mut self.index.lock())
    }

    /// Both counter and MAC vector in one observation
    pub fn snapshot(&self) -> ReplicaSnapshot {
        self.index.lock().snapshot()
    }
}

#[async_trait]
impl ReplicaClient for LoopbackReplica {
    async fn get_bitmaps_version(&self) -> Result<u64> {
        Ok(self.index.lock().get_bitmaps_version())
    }

    async fn get_indexed_document_count(&self) -> Result<usize> {
        Ok(self.index.lock().get_indexed_document_count())
    }

    async fn retrieve_col_macs(&self) -> Result<MacVector> {
        Ok(self.index.lock().retrieve_col_macs())
    }

    async fn get_bitmaps_doc_versions_by_doc_ids(
        &self,
        ids: Vec<DocId>,
    ) -> Result<Vec<(BitRow, VersionToken)>> {
        self.index.lock().get_bitmaps_doc_versions_by_doc_ids(&ids)
    }

    async fn upload_encrypted_files(
        &self,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<Vec<DocId>> {
        self.index
            .lock()
            .upload_encrypted_files(blobs, masked_rows, versions, new_mac, new_counter)
    }

    async fn remove_encrypted_files_by_ids(
        &self,
        ids: Vec<DocId>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<bool> {
        self.index
            .lock()
            .remove_encrypted_files_by_ids(&ids, new_mac, new_counter)
    }

    async fn update_files_by_ids(
        &self,
        ids: Vec<DocId>,
        blobs: Vec<Vec<u8>>,
        masked_rows: Vec<BitRow>,
        versions: Vec<VersionToken>,
        new_mac: MacVector,
        new_counter: u64,
    ) -> Result<bool> {
        self.index.lock().update_files_by_ids(
            &ids,
            blobs,
            masked_rows,
            versions,
            new_mac,
            new_counter,
        )
    }

    async fn retrieve_doc_ids(&self) -> Result<Vec<DocId>> {
        Ok(self.index.lock().retrieve_doc_ids())
    }

    async fn retrieve_encrypted_files_by_ids(&self, ids: Vec<DocId>) -> Result<Vec<Vec<u8>>> {
        self.index.lock().retrieve_encrypted_files_by_ids(&ids)
    }

    async fn search_documents_by_keyword_indices(
        &self,
        column_index_sets: Vec<Vec<usize>>,
    ) -> Result<Vec<Vec<DocId>>> {
        self.index
            .lock()
            .search_documents_by_keyword_indices(&column_index_sets)
    }

    async fn server_search(&self, shares: SearchKeyShares) -> Result<ServerSearchResponse> {
        self.index.lock().server_search(&shares)
    }
}
