//! Document store configuration
//!
//! Controls the persistence period (shared with the underlying snapshot
//! store) and the compression codec used for frames.

use std::time::Duration;

use trislot_core::{Error, Result};
use trislot_durability::StoreConfig;

use crate::codec::{get_codec, CompressionCodec, DEFAULT_LEVEL};

/// Document store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Snapshot store settings; `store.period` is also the persistence tick
    pub store: StoreConfig,
    /// Codec identifier (default: "zstd")
    pub codec_id: String,
    /// Compression level passed to the codec
    pub compression_level: i32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            store: StoreConfig::default(),
            codec_id: "zstd".to_string(),
            compression_level: DEFAULT_LEVEL,
        }
    }
}

impl DocumentConfig {
    /// Create config with the given period and default codec
    pub fn new(period: Duration) -> Self {
        DocumentConfig {
            store: StoreConfig::new(period),
            ..Default::default()
        }
    }

    /// Create config for testing
    pub fn for_testing() -> Self {
        DocumentConfig {
            store: StoreConfig::for_testing(),
            ..Default::default()
        }
    }

    /// Persistence period
    pub fn period(&self) -> Duration {
        self.store.period
    }

    /// Set persistence period
    pub fn with_period(mut self, period: Duration) -> Self {
        self.store.period = period;
        self
    }

    /// Set codec identifier
    pub fn with_codec(mut self, codec_id: impl Into<String>) -> Self {
        self.codec_id = codec_id.into();
        self
    }

    /// Set compression level
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Instantiate the configured codec
    pub fn codec(&self) -> Result<Box<dyn CompressionCodec>> {
        get_codec(&self.codec_id, self.compression_level)
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.codec().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DocumentConfig::default();
        assert_eq!(config.codec_id, "zstd");
        assert_eq!(config.period(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = DocumentConfig::for_testing()
            .with_period(Duration::from_millis(250))
            .with_codec("identity")
            .with_compression_level(0);

        assert_eq!(config.period(), Duration::from_millis(250));
        assert_eq!(config.store.write_interval(), Duration::from_millis(25));
        assert_eq!(config.codec().unwrap().codec_id(), "identity");
    }

    #[test]
    fn test_validate_invalid_codec() {
        let config = DocumentConfig::default().with_codec("nonexistent_codec");
        let result = config.validate();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_invalid_level() {
        let config = DocumentConfig::default().with_compression_level(10_000);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_period() {
        let config = DocumentConfig::new(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
