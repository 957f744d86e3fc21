//! End-to-end oblivious search over an in-process two-replica cluster
//!
//! The canonical scenario: bloom width 16, hash count 2, salt "TESTSALT",
//! three documents {"apple berry"}, {"carrot"}, {"apple date"}. Searching
//! "apple" must return exactly documents 1 and 3.

use odory_core::{BitRow, DocId, MacVector, OdoryError, VersionToken};
use odory_testkit::{sample_corpus, TestCluster};

#[tokio::test]
async fn test_search_returns_exactly_the_matching_documents() {
    let mut cluster = TestCluster::new(16, 2);
    let ids = cluster.manager.upload(sample_corpus()).await.unwrap();
    assert_eq!(ids, vec![DocId(1), DocId(2), DocId(3)]);

    let hits = cluster.manager.search("apple").await.unwrap();
    assert_eq!(hits, vec![DocId(1), DocId(3)]);

    let hits = cluster.manager.search("carrot").await.unwrap();
    assert_eq!(hits, vec![DocId(2)]);

    let hits = cluster.manager.search("berry").await.unwrap();
    assert_eq!(hits, vec![DocId(1)]);
}

#[tokio::test]
async fn test_search_after_removal_drops_the_removed_document() {
    let mut cluster = TestCluster::new(16, 2);
    let ids = cluster.manager.upload(sample_corpus()).await.unwrap();

    assert!(cluster.manager.remove(&ids[..1]).await.unwrap());
    let hits = cluster.manager.search("apple").await.unwrap();
    assert_eq!(hits, vec![DocId(3)]);
}

#[tokio::test]
async fn test_search_after_update_reflects_new_content() {
    let mut cluster = TestCluster::new(16, 2);
    let ids = cluster.manager.upload(sample_corpus()).await.unwrap();

    // Document 2 gains "apple"; every replica row and version changes.
    assert!(cluster
        .manager
        .update(&ids[1..2], vec![b"apple pear".to_vec()])
        .await
        .unwrap());
    let hits = cluster.manager.search("apple").await.unwrap();
    assert_eq!(hits, vec![DocId(1), DocId(2), DocId(3)]);

    let hits = cluster.manager.search("carrot").await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_search_on_empty_folder_returns_nothing() {
    let mut cluster = TestCluster::new(16, 2);
    let hits = cluster.manager.search("apple").await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_desynchronized_replica_blocks_mutations() {
    let mut cluster = TestCluster::new(16, 2);
    cluster.manager.upload(sample_corpus()).await.unwrap();

    // Write to replica B behind the coordinator's back.
    cluster.replica_b.with_index(|index| {
        let counter = index.get_bitmaps_version();
        index
            .upload_encrypted_files(
                vec![b"rogue".to_vec()],
                vec![BitRow::zeros(16)],
                vec![VersionToken::new("rogueVersion0000")],
                MacVector::zeros(16),
                counter + 1,
            )
            .unwrap();
    });

    let err = cluster
        .manager
        .upload(vec![(b"late doc".to_vec(), "late".to_string())])
        .await
        .unwrap_err();
    assert!(matches!(err, OdoryError::InconsistentReplicaState { .. }));

    // Zero writes on either replica beyond the rogue one.
    assert_eq!(
        cluster
            .replica_a
            .with_index(|index| index.get_indexed_document_count()),
        3
    );
    assert_eq!(cluster.replica_a.with_index(|i| i.get_bitmaps_version()), 1);
    assert_eq!(cluster.replica_b.with_index(|i| i.get_bitmaps_version()), 2);
}

#[tokio::test]
async fn test_corrupted_mac_vector_fails_search_closed() {
    let mut cluster = TestCluster::new(16, 2);
    cluster.manager.upload(sample_corpus()).await.unwrap();

    cluster.replica_b.with_index(|index| {
        let flipped: Vec<u8> = index
            .retrieve_col_macs()
            .as_slice()
            .iter()
            .map(|b| b ^ 0xFF)
            .collect();
        index.corrupt_col_macs(MacVector::from_codes(flipped));
    });

    let err = cluster.manager.search("apple").await.unwrap_err();
    assert!(matches!(err, OdoryError::MacMismatch { .. }));
}

#[tokio::test]
async fn test_mismatched_document_counts_block_search() {
    let mut cluster = TestCluster::new(16, 2);
    cluster.manager.upload(sample_corpus()).await.unwrap();

    cluster.replica_b.with_index(|index| {
        let counter = index.get_bitmaps_version();
        index
            .upload_encrypted_files(
                vec![b"rogue".to_vec()],
                vec![BitRow::zeros(16)],
                vec![VersionToken::new("rogueVersion0000")],
                MacVector::zeros(16),
                counter + 1,
            )
            .unwrap();
    });

    let err = cluster.manager.search("apple").await.unwrap_err();
    assert!(matches!(err, OdoryError::DocumentCountMismatch { .. }));
}

#[tokio::test]
async fn test_retrieve_files_roundtrip() {
    let mut cluster = TestCluster::new(16, 2);
    let ids = cluster.manager.upload(sample_corpus()).await.unwrap();

    let files = cluster.manager.retrieve_files(&ids).await.unwrap();
    assert_eq!(files[0], b"apple berry");
    assert_eq!(files[1], b"carrot");
    assert_eq!(files[2], b"apple date");
}

#[tokio::test]
async fn test_retrieve_ids_registers_unknown_documents() {
    let mut cluster = TestCluster::new(16, 2);
    let ids = cluster.manager.upload(sample_corpus()).await.unwrap();

    // A second manager on the same folder knows nothing locally.
    let mut second = TestCluster::manager_for(&cluster);
    assert!(second.records().is_empty());

    let seen = second.retrieve_ids().await.unwrap();
    assert_eq!(seen, ids);
    assert_eq!(second.records().len(), 3);
    assert!(second.records().values().all(|name| name.as_str() == "Unnamed"));

    // Idempotent: a second reconciliation changes nothing.
    second.retrieve_ids().await.unwrap();
    assert_eq!(second.records().len(), 3);
}

#[tokio::test]
async fn test_verify_connection() {
    let cluster = TestCluster::new(16, 2);
    cluster.manager.verify_connection().await.unwrap();
}

#[tokio::test]
async fn test_update_batch_mismatch_rejected_locally() {
    let mut cluster = TestCluster::new(16, 2);
    let ids = cluster.manager.upload(sample_corpus()).await.unwrap();

    let err = cluster
        .manager
        .update(&ids, vec![b"only one".to_vec()])
        .await
        .unwrap_err();
    assert!(matches!(err, OdoryError::BatchSizeMismatch { .. }));
    // Nothing reached the replicas.
    assert_eq!(cluster.replica_a.with_index(|i| i.get_bitmaps_version()), 1);
}
