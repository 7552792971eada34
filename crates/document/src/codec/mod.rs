//! Compression codec abstraction.
//!
//! Serialized documents are compressed before they are framed and handed
//! to the snapshot store. The codec seam keeps the document layer
//! independent of the compression scheme.
//!
//! # Usage
//!
//! ```ignore
//! use trislot_document::codec::{get_codec, CompressionCodec};
//!
//! let codec = get_codec("zstd", 3)?;
//! let written = codec.compress_into(&src, &mut dst)?;
//! ```

mod identity;
mod traits;
mod zstandard;

pub use self::identity::IdentityCodec;
pub use self::traits::{CodecError, CompressionCodec};
pub use self::zstandard::{ZstdCodec, DEFAULT_LEVEL};

/// Get a codec by its identifier.
///
/// # Known Codecs
///
/// - `"zstd"`: Zstandard at `level`
/// - `"identity"`: No-op codec (pass-through); `level` is ignored
pub fn get_codec(codec_id: &str, level: i32) -> Result<Box<dyn CompressionCodec>, CodecError> {
    match codec_id {
        "zstd" => Ok(Box::new(ZstdCodec::new(level)?)),
        "identity" => Ok(Box::new(IdentityCodec)),
        _ => Err(CodecError::UnknownCodec(codec_id.to_string())),
    }
}
