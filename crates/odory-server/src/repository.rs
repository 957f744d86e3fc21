//! Per-replica document storage
//!
//! An explicit repository seam instead of a persistence framework: the
//! server index owns its in-memory bitmap state and delegates blob storage
//! to whatever implements [`DocumentRepository`]. The in-memory
//! implementation backs tests and the loopback transport; a durable backend
//! plugs in behind the same trait.

use odory_core::{DocId, OdoryError, Result};
use std::collections::BTreeMap;

/// Create/read/update/delete over opaque encrypted blobs
///
/// Identifier assignment is the repository's job; ids are positive and
/// monotonically increasing so two replicas applying identical batches in
/// identical order assign identical ids.
pub trait DocumentRepository: Send {
    /// Store a new blob and assign its id
    fn create(&mut self, blob: Vec<u8>) -> Result<DocId>;

    /// Fetch a blob by id
    fn read(&self, id: DocId) -> Result<Vec<u8>>;

    /// Replace a blob in place
    fn update(&mut self, id: DocId, blob: Vec<u8>) -> Result<()>;

    /// Remove a blob
    fn delete(&mut self, id: DocId) -> Result<()>;

    /// All stored ids, ascending
    fn ids(&self) -> Vec<DocId>;
}

/// BTreeMap-backed repository for tests and in-process replicas
#[derive(Debug)]
pub struct InMemoryRepository {
    next_id: u32,
    blobs: BTreeMap<DocId, Vec<u8>>,
}

impl InMemoryRepository {
    /// Empty repository; ids start at 1
    pub fn new() -> Self {
        Self {
            next_id: 1,
            blobs: BTreeMap::new(),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRepository for InMemoryRepository {
    fn create(&mut self, blob: Vec<u8>) -> Result<DocId> {
        let id = DocId(self.next_id);
        self.next_id += 1;
        self.blobs.insert(id, blob);
        Ok(id)
    }

    fn read(&self, id: DocId) -> Result<Vec<u8>> {
        self.blobs
            .get(&id)
            .cloned()
            .ok_or_else(|| OdoryError::not_found(format!("{id}")))
    }

    fn update(&mut self, id: DocId, blob: Vec<u8>) -> Result<()> {
        match self.blobs.get_mut(&id) {
            Some(slot) => {
                *slot = blob;
                Ok(())
            }
            None => Err(OdoryError::not_found(format!("{id}"))),
        }
    }

    fn delete(&mut self, id: DocId) -> Result<()> {
        self.blobs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| OdoryError::not_found(format!("{id}")))
    }

    fn ids(&self) -> Vec<DocId> {
        self.blobs.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut repo = InMemoryRepository::new();
        let a = repo.create(b"one".to_vec()).unwrap();
        let b = repo.create(b"two".to_vec()).unwrap();
        assert!(b > a);
        assert_eq!(a, DocId(1));
    }

    #[test]
    fn test_crud_roundtrip() {
        let mut repo = InMemoryRepository::new();
        let id = repo.create(b"blob".to_vec()).unwrap();
        assert_eq!(repo.read(id).unwrap(), b"blob");
        repo.update(id, b"blob2".to_vec()).unwrap();
        assert_eq!(repo.read(id).unwrap(), b"blob2");
        repo.delete(id).unwrap();
        assert!(repo.read(id).is_err());
        assert!(repo.delete(id).is_err());
    }
}
