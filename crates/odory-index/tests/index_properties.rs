//! Property Tests: Index Derivation Properties
//!
//! Verifies the algebraic contracts the rest of the stack leans on: keyed
//! hash determinism, mask involution, and MAC aggregate cancellation.

use odory_core::{BitRow, FolderConfig, FolderSalt, MacVector, VersionToken};
use odory_index::{KeywordIndexer, MacEngine, VersionMasker};
use proptest::prelude::*;

fn arb_salt() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 4..32)
}

fn arb_token() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{12,20}"
}

fn arb_bits(width: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..=1, width)
}

proptest! {
    #[test]
    fn hash_index_deterministic_and_in_range(
        salt in arb_salt(),
        word in "[a-z]{1,12}",
        seed in 0u32..8,
    ) {
        let ix = KeywordIndexer::new(
            FolderConfig::new(64, 4).unwrap(),
            FolderSalt::new(salt),
        );
        let a = ix.hash_index(&word, seed).unwrap();
        let b = ix.hash_index(&word, seed).unwrap();
        prop_assert_eq!(a, b);
        prop_assert!(a < 64);
    }

    #[test]
    fn indexed_row_has_every_keyword_position(
        salt in arb_salt(),
        words in prop::collection::btree_set("[a-z]{2,8}", 1..6),
    ) {
        let ix = KeywordIndexer::new(
            FolderConfig::new(64, 3).unwrap(),
            FolderSalt::new(salt),
        );
        let text = words.iter().cloned().collect::<Vec<_>>().join(" ");
        let row = ix.index_document(&text).unwrap();
        for word in &words {
            for index in ix.keyword_indices(word).unwrap() {
                prop_assert_eq!(row.bit(index), 1);
            }
        }
    }

    #[test]
    fn unmask_mask_roundtrips(
        salt in arb_salt(),
        token in arb_token(),
        bits in arb_bits(32),
    ) {
        let masker = VersionMasker::new(FolderSalt::new(salt));
        let version = VersionToken::new(token);
        let row = BitRow::from_bits(bits).unwrap();
        let masked = masker.mask(&row, &version).unwrap();
        prop_assert_eq!(masker.unmask(&masked, &version).unwrap(), row);
    }

    #[test]
    fn removing_a_document_restores_the_aggregate(
        salt in arb_salt(),
        token in arb_token(),
        before in prop::collection::vec(any::<u8>(), 16),
        bits in arb_bits(16),
    ) {
        let engine = MacEngine::new(FolderSalt::new(salt));
        let version = VersionToken::new(token);
        let row = BitRow::from_bits(bits).unwrap();
        let aggregate = MacVector::from_codes(before);

        let added = engine.fold_in(&aggregate, &row, &version).unwrap();
        let removed = engine.fold_in(&added, &row, &version).unwrap();
        prop_assert_eq!(removed, aggregate);
    }
}
