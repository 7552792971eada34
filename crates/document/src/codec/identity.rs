//! Identity codec (no compression).
//!
//! Copies bytes unchanged. Useful for debugging stored frames with a hex
//! viewer and for tests that need predictable frame sizes.

use super::traits::{CodecError, CompressionCodec};

/// Identity codec - bytes pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl IdentityCodec {
    fn copy(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        if dst.len() < src.len() {
            return Err(CodecError::DestinationTooSmall {
                codec_id: self.codec_id().to_string(),
                needed: src.len(),
                available: dst.len(),
            });
        }
        dst[..src.len()].copy_from_slice(src);
        Ok(src.len())
    }
}

impl CompressionCodec for IdentityCodec {
    fn compress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        self.copy(src, dst)
    }

    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
        self.copy(src, dst)
    }

    fn decompressed_size(&self, src: &[u8]) -> Result<Option<usize>, CodecError> {
        Ok(Some(src.len()))
    }

    fn codec_id(&self) -> &str {
        "identity"
    }
}
