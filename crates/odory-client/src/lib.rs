//! Odory client: coordination, search and reconciliation
//!
//! The client side of the protocol stack. A [`ClientManager`] owns one
//! folder: it derives rows, masks and MAC codes from the folder salt
//! (`odory-index`), pushes identical writes through the two-replica
//! consistency gate ([`ReplicaCoordinator`]), and answers keyword searches
//! obliviously by splitting the column selection into FSS key shares
//! (`odory-fss`) and reconciling the replicas' partial answers
//! ([`ResultReconciler`]).
//!
//! Replicas are reached through the [`ReplicaClient`] trait; the bundled
//! [`LoopbackReplica`] binds it to an in-process `ServerIndex`, and real
//! transports adapt the same trait outside this crate.

pub mod config;
pub mod coordinator;
pub mod manager;
pub mod reconcile;
pub mod replica;

pub use config::ClientConfig;
pub use coordinator::ReplicaCoordinator;
pub use manager::ClientManager;
pub use reconcile::ResultReconciler;
pub use replica::{LoopbackReplica, ReplicaClient};
