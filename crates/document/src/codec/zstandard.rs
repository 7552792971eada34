//! Zstandard codec.
//!
//! Uses zstd's bulk API, which compresses straight into the caller's buffer.
//! Incompressible input falls back to raw blocks, so the output never
//! exceeds the input by more than the block and frame headers; the
//! `ceil(len * 1.1) + 50` frame buffer covers that for every length.

use super::traits::{CodecError, CompressionCodec};

/// Default zstd compression level
pub const DEFAULT_LEVEL: i32 = zstd::DEFAULT_COMPRESSION_LEVEL;

/// Zstandard codec at a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        ZstdCodec {
            level: DEFAULT_LEVEL,
        }
    }
}

impl ZstdCodec {
    /// Create a codec, validating the level against zstd's supported range
    pub fn new(level: i32) -> Result<Self, CodecError> {
        if !zstd::compression_level_range().contains(&level) {
            return Err(CodecError::InvalidLevel {
                codec_id: "zstd".to_string(),
                level,
            });
        }
        Ok(ZstdCodec { level })
    }

    /// Configured compression level
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl CompressionCodec for ZstdCodec {
    fn compress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        zstd::bulk::compress_to_buffer(src, dst, self.level)
            .map_err(|e| CodecError::failed(e.to_string(), self.codec_id(), src.len()))
    }

    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        zstd::bulk::decompress_to_buffer(src, dst)
            .map_err(|e| CodecError::failed(e.to_string(), self.codec_id(), src.len()))
    }

    fn decompressed_size(&self, src: &[u8]) -> Result<Option<usize>, CodecError> {
        match zstd::zstd_safe::get_frame_content_size(src) {
            Ok(Some(size)) => usize::try_from(size).map(Some).map_err(|_| {
                CodecError::failed(
                    format!("content size {size} exceeds address space"),
                    self.codec_id(),
                    src.len(),
                )
            }),
            Ok(None) => Ok(None),
            Err(_) => Err(CodecError::failed(
                "not a zstd frame",
                self.codec_id(),
                src.len(),
            )),
        }
    }

    fn codec_id(&self) -> &str {
        "zstd"
    }
}
