//! Indexer configuration.

use std::path::Path;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::driver::BlockRange;
use crate::entity::EntityKind;
use crate::error::IndexerError;
use crate::logging::LogConfig;

/// Configuration for an indexer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Unique name for this indexer.
    pub id: String,
    /// Chain slug (e.g. `"ethereum"`).
    pub chain: String,
    /// Only decode logs emitted by this contract. `None` = any address.
    pub contract: Option<Address>,
    /// First block to index.
    pub from_block: u64,
    /// Maximum number of blocks per driver batch.
    pub batch_size: u64,
    /// Entity kinds to write. Empty = all kinds.
    pub entities: Vec<EntityKind>,
    pub log: LogConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            id: "default".into(),
            chain: "ethereum".into(),
            contract: None,
            from_block: 0,
            batch_size: 100,
            entities: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, IndexerError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| IndexerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexerError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| IndexerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Blocks from `from_block` up to and including `to`.
    pub fn block_range(&self, to: u64) -> BlockRange {
        BlockRange::new(self.from_block, to)
    }

    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.batch_size == 0 {
            return Err(IndexerError::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_with_defaults() {
        let config = IndexerConfig::from_yaml_str(
            r#"
id: your-token
contract: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
batch_size: 500
entities: [Transfer, Approval]
log:
  level: debug
"#,
        )
        .unwrap();

        assert_eq!(config.id, "your-token");
        assert_eq!(config.chain, "ethereum");
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.entities, vec![EntityKind::Transfer, EntityKind::Approval]);
        assert_eq!(config.log.level, "debug");
        assert!(config.contract.is_some());
    }

    #[test]
    fn block_range_starts_at_from_block() {
        let config = IndexerConfig::from_yaml_str("from_block: 17000000").unwrap();
        assert_eq!(config.block_range(17_000_099), BlockRange::new(17_000_000, 17_000_099));
        assert!(config.block_range(16_999_999).is_empty());
    }

    #[test]
    fn empty_document_is_default() {
        let config = IndexerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, IndexerConfig::default());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = IndexerConfig::from_yaml_str("batch_size: 0").unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[test]
    fn rejects_unknown_entity_kind() {
        assert!(IndexerConfig::from_yaml_str("entities: [Mint]").is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = IndexerConfig::load("/nonexistent/tokenindex.yml").unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }
}
