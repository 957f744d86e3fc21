//! Client-side configuration
//!
//! Folder geometry plus the operational knobs (RPC timeout, evaluation pool
//! size). Loadable from TOML; validation rejects degenerate geometry before
//! anything touches a replica.

use odory_core::{FolderConfig, OdoryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one client manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bloom filter width `m`
    pub bloom_width: usize,
    /// Hash count `k`
    pub hash_count: usize,
    /// Bound on every replica RPC, in milliseconds
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    /// Worker threads for replica-side share evaluation (0 = runtime pick)
    #[serde(default)]
    pub eval_workers: usize,
}

fn default_rpc_timeout_ms() -> u64 {
    5_000
}

impl ClientConfig {
    /// Config with default operational knobs
    pub fn new(bloom_width: usize, hash_count: usize) -> Self {
        Self {
            bloom_width,
            hash_count,
            rpc_timeout_ms: default_rpc_timeout_ms(),
            eval_workers: 0,
        }
    }

    /// Parse and validate a TOML rendering
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| OdoryError::invalid(format!("client config: {e}")))?;
        config.folder()?;
        Ok(config)
    }

    /// The validated folder geometry
    pub fn folder(&self) -> Result<FolderConfig> {
        FolderConfig::new(self.bloom_width, self.hash_count)
    }

    /// The RPC timeout as a [`Duration`]
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let config = ClientConfig::from_toml_str(
            r#"
            bloom_width = 64
            hash_count = 3
            rpc_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.bloom_width, 64);
        assert_eq!(config.hash_count, 3);
        assert_eq!(config.rpc_timeout(), Duration::from_millis(250));
        assert_eq!(config.eval_workers, 0);
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        assert!(ClientConfig::from_toml_str("bloom_width = 0\nhash_count = 1").is_err());
        assert!(ClientConfig::from_toml_str("bloom_width = 8\nhash_count = 9").is_err());
    }
}
