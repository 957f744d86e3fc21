//! Odory testing infrastructure
//!
//! Common fixtures for exercising the full client/replica stack in one
//! process: a deterministic two-replica cluster, a manager wired to it, and
//! the small corpus the end-to-end search tests revolve around.
//!
//! Add to a crate's dev-dependencies and use the builders directly:
//!
//! ```rust,no_run
//! use odory_testkit::TestCluster;
//!
//! # async fn demo() {
//! let mut cluster = TestCluster::new(16, 2);
//! let ids = cluster.manager.upload(odory_testkit::sample_corpus()).await.unwrap();
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use odory_client::{ClientConfig, ClientManager, LoopbackReplica};
use odory_core::{FolderConfig, FolderSalt};
use odory_server::{InMemoryRepository, ServerIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Salt used by every fixture
pub const TEST_SALT: &[u8] = b"TESTSALT";

/// Deterministic RNG seed for fixture managers
pub const TEST_RNG_SEED: u64 = 0xd05e;

/// Install a fmt subscriber for a test run; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// One in-process replica endpoint over a fresh index
pub fn test_replica(bloom_width: usize, hash_count: usize) -> LoopbackReplica {
    let config = FolderConfig::new(bloom_width, hash_count).unwrap();
    LoopbackReplica::new(ServerIndex::new(config, InMemoryRepository::new(), 1).unwrap())
}

/// A manager wired to two fresh in-process replicas
///
/// Keeps handles to both replicas so tests can desynchronize or corrupt
/// one of them out-of-band.
pub struct TestCluster {
    /// The manager under test
    pub manager: ClientManager<LoopbackReplica>,
    /// Handle to replica A's endpoint
    pub replica_a: LoopbackReplica,
    /// Handle to replica B's endpoint
    pub replica_b: LoopbackReplica,
    /// The client configuration the cluster was built with
    pub config: ClientConfig,
}

impl TestCluster {
    /// Build a cluster with the given geometry, TESTSALT and a fixed RNG
    pub fn new(bloom_width: usize, hash_count: usize) -> Self {
        init_tracing();
        let replica_a = test_replica(bloom_width, hash_count);
        let replica_b = test_replica(bloom_width, hash_count);
        let config = ClientConfig::new(bloom_width, hash_count);
        let manager = ClientManager::with_rng(
            &config,
            FolderSalt::new(TEST_SALT.to_vec()),
            replica_a.clone(),
            replica_b.clone(),
            ChaCha20Rng::seed_from_u64(TEST_RNG_SEED),
        )
        .unwrap();
        Self {
            manager,
            replica_a,
            replica_b,
            config,
        }
    }

    /// A second manager over the same replicas, with a fresh local ledger
    pub fn manager_for(cluster: &TestCluster) -> ClientManager<LoopbackReplica> {
        ClientManager::with_rng(
            &cluster.config,
            FolderSalt::new(TEST_SALT.to_vec()),
            cluster.replica_a.clone(),
            cluster.replica_b.clone(),
            ChaCha20Rng::seed_from_u64(TEST_RNG_SEED + 1),
        )
        .unwrap()
    }
}

/// The corpus the end-to-end search scenarios are written against
pub fn sample_corpus() -> Vec<(Vec<u8>, String)> {
    vec![
        (b"apple berry".to_vec(), "apple-berry".to_string()),
        (b"carrot".to_vec(), "carrot".to_string()),
        (b"apple date".to_vec(), "apple-date".to_string()),
    ]
}
