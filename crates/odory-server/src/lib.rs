//! Odory server: one replica's index
//!
//! Each of the two replicas runs a [`ServerIndex`] over an injected
//! [`DocumentRepository`]. The index stores only what the client sends
//! (encrypted blobs, masked rows, version tokens, the aggregate MAC vector)
//! and answers search-share evaluations without ever unmasking a row.
//! Transport binding (HTTP-RPC, gRPC, in-process loopback) lives outside
//! this crate, behind the client's `ReplicaClient` trait.

pub mod index;
pub mod repository;
pub mod search;

pub use index::ServerIndex;
pub use repository::{DocumentRepository, InMemoryRepository};
pub use search::ServerSearchResponse;
