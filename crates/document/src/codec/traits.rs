//! Compression codec trait definitions.

/// Compression codec trait.
///
/// Document bytes pass through the codec on their way into a frame and back
/// out during recovery. Both directions work on caller-provided buffers: the
/// compressed side is sized with `compressed_capacity`, the decompressed side
/// with the length recorded in the frame header.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync`: the document store's ticker thread and the
/// caller's thread may both persist.
pub trait CompressionCodec: Send + Sync {
    /// Compress `src` into `dst`, returning the number of bytes written.
    ///
    /// Fails if `dst` is too small for the output.
    fn compress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;

    /// Decompress `src` into `dst`, returning the number of bytes written.
    fn decompress_into(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError>;

    /// Decompressed size recorded inside `src`, if the format records one.
    ///
    /// Readers check it against the frame header before allocating.
    fn decompressed_size(&self, _src: &[u8]) -> Result<Option<usize>, CodecError> {
        Ok(None)
    }

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Destination buffer too small
    #[error("Destination too small (codec={codec_id}): need {needed}, have {available}")]
    DestinationTooSmall {
        /// Codec that ran out of room
        codec_id: String,
        /// Bytes required, when known
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// Compression or decompression failed.
    #[error("Codec error (codec={codec_id}, data_len={data_len}): {detail}")]
    Failed {
        /// Human-readable error description
        detail: String,
        /// Codec ID that failed
        codec_id: String,
        /// Length of the input
        data_len: usize,
    },

    /// Unknown codec identifier.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    /// Compression level outside the codec's range.
    #[error("Invalid compression level {level} for {codec_id}")]
    InvalidLevel {
        /// Codec ID
        codec_id: String,
        /// Rejected level
        level: i32,
    },
}

impl CodecError {
    /// Create a failure error with full diagnostic context.
    pub fn failed(detail: impl Into<String>, codec_id: impl Into<String>, data_len: usize) -> Self {
        CodecError::Failed {
            detail: detail.into(),
            codec_id: codec_id.into(),
            data_len,
        }
    }
}

impl From<CodecError> for trislot_core::Error {
    fn from(e: CodecError) -> Self {
        trislot_core::Error::Compression(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::IdentityCodec;

    // Test that trait is object-safe
    fn _accepts_box_dyn_codec(_codec: Box<dyn CompressionCodec>) {}

    #[test]
    fn test_codec_trait_object_safe() {
        let codec: Box<dyn CompressionCodec> = Box::new(IdentityCodec);

        let data = b"test data";
        let mut compressed = vec![0u8; 16];
        let n = codec.compress_into(data, &mut compressed).unwrap();

        let mut decompressed = vec![0u8; data.len()];
        codec.decompress_into(&compressed[..n], &mut decompressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_codec_error_converts_to_core_error() {
        let err: trislot_core::Error = CodecError::failed("bad magic", "zstd", 12).into();
        assert!(matches!(err, trislot_core::Error::Compression(_)));
        assert!(err.to_string().contains("bad magic"));
    }
}
