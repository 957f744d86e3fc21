//! The client manager
//!
//! One manager per folder. It owns the folder salt and every derivation
//! keyed by it, drives the two-replica coordinator for mutations, and runs
//! the oblivious search pipeline end to end: hash the keyword, build the
//! key-share bundles, dispatch one to each replica, reconcile.
//!
//! The manager also keeps the client-side document record ledger: a display
//! name per uploaded document, reconciled against the server id list on
//! demand (unknown ids are registered idempotently under a placeholder
//! name).

use crate::config::ClientConfig;
use crate::coordinator::ReplicaCoordinator;
use crate::reconcile::ResultReconciler;
use crate::replica::ReplicaClient;
use odory_core::{DocId, FolderConfig, FolderSalt, MacVector, OdoryError, Result};
use odory_fss::FssQueryBuilder;
use odory_index::{KeywordIndexer, MacEngine, VersionMasker};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Placeholder name for ids discovered on the server but unknown locally
const UNNAMED: &str = "Unnamed";

/// Client manager for one folder replicated across two servers
pub struct ClientManager<C: ReplicaClient> {
    folder: FolderConfig,
    coordinator: ReplicaCoordinator<C>,
    indexer: KeywordIndexer,
    masker: VersionMasker,
    mac_engine: MacEngine,
    query_builder: FssQueryBuilder,
    reconciler: ResultReconciler,
    records: BTreeMap<DocId, String>,
    rng: ChaCha20Rng,
}

impl<C: ReplicaClient> ClientManager<C> {
    /// Build a manager over two replica clients
    pub fn new(config: &ClientConfig, salt: FolderSalt, replica_a: C, replica_b: C) -> Result<Self> {
        Self::with_rng(
            config,
            salt,
            replica_a,
            replica_b,
            ChaCha20Rng::from_entropy(),
        )
    }

    /// Build a manager with an explicit RNG (deterministic tests)
    pub fn with_rng(
        config: &ClientConfig,
        salt: FolderSalt,
        replica_a: C,
        replica_b: C,
        rng: ChaCha20Rng,
    ) -> Result<Self> {
        let folder = config.folder()?;
        let masker = VersionMasker::new(salt.clone());
        let mac_engine = MacEngine::new(salt.clone());
        Ok(Self {
            folder,
            coordinator: ReplicaCoordinator::new(replica_a, replica_b, config.rpc_timeout()),
            indexer: KeywordIndexer::new(folder, salt),
            reconciler: ResultReconciler::new(masker.clone(), mac_engine.clone()),
            masker,
            mac_engine,
            query_builder: FssQueryBuilder::new(),
            records: BTreeMap::new(),
            rng,
        })
    }

    /// Probe both replicas
    pub async fn verify_connection(&self) -> Result<()> {
        self.coordinator.verify_connection().await
    }

    /// The local document record ledger (id → display name)
    pub fn records(&self) -> &BTreeMap<DocId, String> {
        &self.records
    }

    /// Content encryption placeholder
    ///
    /// The source design treats document encryption as out of scope; blobs
    /// pass through unchanged.
    fn encrypt(&self, raw: &[u8]) -> Vec<u8> {
        raw.to_vec()
    }

    /// Content decryption placeholder, the inverse of [`encrypt`](Self::encrypt)
    fn decrypt(&self, blob: Vec<u8>) -> Vec<u8> {
        blob
    }

    /// Upload raw files, indexing and blinding each
    ///
    /// Returns the assigned document ids, in input order.
    pub async fn upload(&mut self, files: Vec<(Vec<u8>, String)>) -> Result<Vec<DocId>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut blobs = Vec::with_capacity(files.len());
        let mut masked_rows = Vec::with_capacity(files.len());
        let mut versions = Vec::with_capacity(files.len());
        let mut names = Vec::with_capacity(files.len());
        let mut delta = MacVector::zeros(self.folder.bloom_width);

        for (raw, name) in files {
            let text = String::from_utf8_lossy(&raw).into_owned();
            let row = self.indexer.index_document(&text)?;
            let version = self.masker.generate_version(&mut self.rng);
            let masked = self.masker.mask(&row, &version)?;
            delta.xor_assign(&self.mac_engine.macs(&masked, &version))?;
            blobs.push(self.encrypt(&raw));
            masked_rows.push(masked);
            versions.push(version);
            names.push(name);
        }

        let ids = self
            .coordinator
            .upload(blobs, masked_rows, versions, &delta)
            .await?;
        for (id, name) in ids.iter().zip(names) {
            self.records.insert(*id, name);
        }
        info!(count = ids.len(), "uploaded documents");
        Ok(ids)
    }

    /// Remove documents by id
    pub async fn remove(&mut self, ids: &[DocId]) -> Result<bool> {
        if ids.is_empty() {
            return Ok(false);
        }

        // The removed documents' codes cancel out of the aggregate.
        let stored = self.coordinator.fetch_doc_rows(ids.to_vec()).await?;
        let mut delta = MacVector::zeros(self.folder.bloom_width);
        for (masked_row, version) in &stored {
            delta.xor_assign(&self.mac_engine.macs(masked_row, version))?;
        }

        let removed = self.coordinator.remove(ids.to_vec(), &delta).await?;
        if removed {
            for id in ids {
                self.records.remove(id);
            }
        }
        Ok(removed)
    }

    /// Replace documents' contents, re-indexing each under a fresh version
    pub async fn update(&mut self, ids: &[DocId], new_files: Vec<Vec<u8>>) -> Result<bool> {
        if ids.len() != new_files.len() {
            // Rejected locally, before any replica is contacted.
            return Err(OdoryError::batch_size_mismatch(format!(
                "{} ids vs {} files",
                ids.len(),
                new_files.len()
            )));
        }
        if ids.is_empty() {
            return Ok(false);
        }

        let stored = self.coordinator.fetch_doc_rows(ids.to_vec()).await?;
        let mut delta = MacVector::zeros(self.folder.bloom_width);
        for (masked_row, version) in &stored {
            delta.xor_assign(&self.mac_engine.macs(masked_row, version))?;
        }

        let mut blobs = Vec::with_capacity(new_files.len());
        let mut masked_rows = Vec::with_capacity(new_files.len());
        let mut versions = Vec::with_capacity(new_files.len());
        for raw in new_files {
            let text = String::from_utf8_lossy(&raw).into_owned();
            let row = self.indexer.index_document(&text)?;
            let version = self.masker.generate_version(&mut self.rng);
            let masked = self.masker.mask(&row, &version)?;
            delta.xor_assign(&self.mac_engine.macs(&masked, &version))?;
            blobs.push(self.encrypt(&raw));
            masked_rows.push(masked);
            versions.push(version);
        }

        self.coordinator
            .update(ids.to_vec(), blobs, masked_rows, versions, &delta)
            .await
    }

    /// Fetch the server's id list, registering unknown ids locally
    ///
    /// Re-registration is idempotent and non-fatal: ids already known keep
    /// their names, new ones get a placeholder.
    pub async fn retrieve_ids(&mut self) -> Result<Vec<DocId>> {
        let ids = self.coordinator.retrieve_doc_ids().await?;
        for id in &ids {
            if !self.records.contains_key(id) {
                warn!(%id, "registering unknown document id");
                self.records.insert(*id, UNNAMED.to_string());
            }
        }
        Ok(ids)
    }

    /// Fetch and decrypt documents by id
    pub async fn retrieve_files(&self, ids: &[DocId]) -> Result<Vec<Vec<u8>>> {
        let blobs = self
            .coordinator
            .retrieve_encrypted_files_by_ids(ids.to_vec())
            .await?;
        Ok(blobs.into_iter().map(|b| self.decrypt(b)).collect())
    }

    /// Oblivious keyword search
    ///
    /// Neither replica learns which columns were queried; the combined
    /// partial answers are unmasked, MAC-verified and mapped to ids.
    pub async fn search(&mut self, keyword: &str) -> Result<Vec<DocId>> {
        let targets: BTreeSet<usize> = self.indexer.keyword_indices(keyword)?.into_iter().collect();

        let doc_count = self.coordinator.agreed_document_count().await?;
        if doc_count == 0 {
            return Ok(Vec::new());
        }

        debug!(doc_count, targets = targets.len(), "building search shares");
        let (shares_a, shares_b) = self.query_builder.build(
            &targets,
            self.folder.bloom_width,
            doc_count,
            &mut self.rng,
        )?;

        let (response_a, response_b, reported_a, reported_b) = self
            .coordinator
            .oblivious_search(shares_a, shares_b)
            .await?;

        self.reconciler.reconcile(
            &targets,
            self.folder.bloom_width,
            &response_a,
            &response_b,
            &reported_a,
            &reported_b,
        )
    }

    /// Naive fallback search
    ///
    /// Sends the keyword's column set to replica A in the clear and matches
    /// against rows as stored. Only meaningful where rows are stored
    /// unmasked; kept for testing the transport path.
    pub async fn naive_search(&self, keyword: &str) -> Result<Vec<DocId>> {
        let indices = self.indexer.keyword_indices(keyword)?;
        let mut hits = self.coordinator.naive_search(vec![indices]).await?;
        Ok(hits.pop().unwrap_or_default())
    }
}
