//! Bloom-filter keyword indexing
//!
//! Turns extracted keywords into a fixed-width bit row. Each token sets the
//! `k` positions `keyed_hash(token, salt, seed) mod m` for seeds in
//! `[0, k)`. The hash family is HMAC-SHA256 keyed by the folder salt, so a
//! query side holding the same salt recomputes the identical positions:
//! membership probes have no false negatives, and the false-positive rate is
//! whatever the caller bought with its `(m, k)` choice.

use hmac::{Hmac, Mac};
use odory_core::{BitRow, FolderConfig, FolderSalt, OdoryError, Result};
use sha2::Sha256;
use std::collections::BTreeSet;

type HmacSha256 = Hmac<Sha256>;

/// Builds bloom-filter rows from document text
#[derive(Debug, Clone)]
pub struct KeywordIndexer {
    config: FolderConfig,
    salt: FolderSalt,
}

impl KeywordIndexer {
    /// Create an indexer for one folder's geometry and salt
    pub fn new(config: FolderConfig, salt: FolderSalt) -> Self {
        Self { config, salt }
    }

    /// The folder geometry this indexer was built with
    pub fn config(&self) -> FolderConfig {
        self.config
    }

    /// Column index for one (token, seed) pair
    ///
    /// Deterministic: the same (token, salt, seed) always lands on the same
    /// column.
    pub fn hash_index(&self, token: &str, seed: u32) -> Result<usize> {
        let mut mac = HmacSha256::new_from_slice(self.salt.as_bytes())
            .map_err(|e| OdoryError::internal(format!("hmac init: {e}")))?;
        mac.update(token.as_bytes());
        mac.update(&seed.to_le_bytes());
        let digest = mac.finalize().into_bytes();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        Ok((u64::from_be_bytes(word) % self.config.bloom_width as u64) as usize)
    }

    /// All `k` column indices for a single keyword, in seed order
    pub fn keyword_indices(&self, keyword: &str) -> Result<Vec<usize>> {
        (0..self.config.hash_count as u32)
            .map(|seed| self.hash_index(keyword, seed))
            .collect()
    }

    /// Index a document's decoded text into a bloom-filter row
    pub fn index_document(&self, text: &str) -> Result<BitRow> {
        let mut row = BitRow::zeros(self.config.bloom_width);
        for token in extract_keywords(text) {
            for index in self.keyword_indices(&token)? {
                row.set(index);
            }
        }
        Ok(row)
    }
}

/// Extract word-like tokens from decoded text
///
/// Lowercased alphanumeric runs, deduplicated. Ordering is stable so the
/// same text always produces the same token set.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Bloom geometry for `n` expected keywords at false-positive rate `p`
///
/// `m = round(-n ln p / ln^2 2)`, `k = round(m/n ln 2)`, both floored at 1.
pub fn calc_bloom_filter_width_and_hash_count(n: usize, p: f64) -> (usize, usize) {
    let ln2 = std::f64::consts::LN_2;
    let m = (-(n as f64) * p.ln() / (ln2 * ln2)).round() as usize;
    let k = ((m as f64 / n as f64) * ln2).round() as usize;
    (m.max(1), k.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexer() -> KeywordIndexer {
        KeywordIndexer::new(
            FolderConfig::new(16, 2).unwrap(),
            FolderSalt::new(b"TESTSALT".to_vec()),
        )
    }

    #[test]
    fn test_extract_keywords() {
        let tokens = extract_keywords("Apple, berry! apple\ncarrot-date");
        let expected: Vec<&str> = vec!["apple", "berry", "carrot", "date"];
        assert_eq!(tokens.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_hash_index_is_deterministic() {
        let ix = indexer();
        for seed in 0..4 {
            assert_eq!(
                ix.hash_index("apple", seed).unwrap(),
                ix.hash_index("apple", seed).unwrap()
            );
        }
    }

    #[test]
    fn test_hash_index_in_range() {
        let ix = indexer();
        for seed in 0..8 {
            assert!(ix.hash_index("berry", seed).unwrap() < 16);
        }
    }

    #[test]
    fn test_indexed_row_covers_keyword_positions() {
        let ix = indexer();
        let row = ix.index_document("apple berry").unwrap();
        for token in ["apple", "berry"] {
            for index in ix.keyword_indices(token).unwrap() {
                assert_eq!(row.bit(index), 1, "missing bit for {token} at {index}");
            }
        }
    }

    #[test]
    fn test_absent_keyword_rarely_present() {
        // Not a statistical test: just checks the row is not saturated by
        // two tokens at width 16.
        let ix = indexer();
        let row = ix.index_document("apple").unwrap();
        let ones: usize = row.as_slice().iter().map(|b| *b as usize).sum();
        assert!(ones <= 2);
    }

    #[test]
    fn test_calc_geometry() {
        let (m, k) = calc_bloom_filter_width_and_hash_count(100, 0.1);
        assert_eq!(m, 479);
        assert_eq!(k, 3);
        let (m, k) = calc_bloom_filter_width_and_hash_count(1, 0.99);
        assert!(m >= 1 && k >= 1);
    }
}
