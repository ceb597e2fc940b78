//! Configuration for archivekv
//!
//! Centralized configuration with sensible defaults.

use crate::codec::Codec;
use crate::error::{ArchiveError, Result};

/// Default zstd level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 5;

/// Default size of compressed chunks handed to storage (32 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Default block size for storage reads (64 KiB)
pub const DEFAULT_READ_BLOCK_SIZE: usize = 64 * 1024;

/// Main configuration for an archive handle
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    // -------------------------------------------------------------------------
    // Value Configuration
    // -------------------------------------------------------------------------
    /// Codec used for values. Keys always use the text codec.
    pub codec: Codec,

    /// Max encoded size of a key or a value, in bytes (None = unbounded)
    pub entry_size_limit: Option<usize>,

    // -------------------------------------------------------------------------
    // Compression Configuration
    // -------------------------------------------------------------------------
    pub compression: CompressionConfig,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Block size used by file storage when reading
    pub read_block_size: usize,
}

/// Tuning for the block compressor
#[derive(Debug, Clone, Copy)]
pub struct CompressionConfig {
    /// zstd compression level (1..=22)
    pub level: i32,

    /// Compressed output is handed to storage in chunks of about this size
    pub chunk_size: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            codec: Codec::Json,
            entry_size_limit: None,
            compression: CompressionConfig::default(),
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
        }
    }
}

impl ArchiveConfig {
    /// Create a new config builder
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::default()
    }

    /// Check that every tunable is in range
    pub fn validate(&self) -> Result<()> {
        if self.compression.chunk_size == 0 {
            return Err(ArchiveError::Config(
                "compression chunk size must be non-zero".to_string(),
            ));
        }
        if self.read_block_size == 0 {
            return Err(ArchiveError::Config(
                "read block size must be non-zero".to_string(),
            ));
        }
        let range = zstd::compression_level_range();
        if !range.contains(&self.compression.level) {
            return Err(ArchiveError::Config(format!(
                "compression level {} outside {}..={}",
                self.compression.level,
                range.start(),
                range.end()
            )));
        }
        Ok(())
    }
}

/// Builder for ArchiveConfig
#[derive(Default)]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    /// Set the value codec
    pub fn codec(mut self, codec: Codec) -> Self {
        self.config.codec = codec;
        self
    }

    /// Limit encoded keys and values to `bytes` each
    pub fn entry_size_limit(mut self, bytes: usize) -> Self {
        self.config.entry_size_limit = Some(bytes);
        self
    }

    /// Remove the entry size limit
    pub fn unbounded(mut self) -> Self {
        self.config.entry_size_limit = None;
        self
    }

    /// Set the zstd compression level
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression.level = level;
        self
    }

    /// Set the compressed chunk size (in bytes)
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.compression.chunk_size = bytes;
        self
    }

    /// Set the storage read block size (in bytes)
    pub fn read_block_size(mut self, bytes: usize) -> Self {
        self.config.read_block_size = bytes;
        self
    }

    pub fn build(self) -> ArchiveConfig {
        self.config
    }
}
