//! Odory FSS: two-party oblivious column selection
//!
//! A keyword search touches `k` bloom columns; naively asking a server for
//! those columns reveals the keyword's hash positions. Instead the client
//! splits an "is this column selected" function into two key halves
//! ([`dpf`]), bundles one half per replica ([`query`]), and each replica
//! evaluates its half against its stored masked bitmap ([`eval`]). Either
//! partial result alone is pseudorandom; XORed together they reconstruct
//! the masked bits of exactly the selected columns.

pub mod dpf;
pub mod eval;
pub mod query;

pub use dpf::{domain_bits_for, DpfKey};
pub use eval::{EvalPool, PartialResultMatrix};
pub use query::{ColumnKeyShare, FssQueryBuilder, PartyId, SearchKeyShares};
