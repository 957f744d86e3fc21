//! Odory index: keyword rows, version masks and MAC codes
//!
//! The client-side derivation pipeline. A document's decoded text becomes a
//! bloom-filter row ([`KeywordIndexer`]), the row is blinded under a fresh
//! version token ([`VersionMasker`]), and the blinded row yields per-column
//! tamper-evidence codes ([`MacEngine`]) that XOR-fold into the folder
//! aggregate. All three are keyed by the folder salt, which never leaves
//! the client.

pub mod keyword;
pub mod mac;
pub mod masking;

pub use keyword::{calc_bloom_filter_width_and_hash_count, extract_keywords, KeywordIndexer};
pub use mac::MacEngine;
pub use masking::{VersionMasker, VERSION_TOKEN_LEN};
