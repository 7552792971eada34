//! Document frame: length-prefixed compressed bytes
//!
//! ```text
//! offset 0..4   : i32 big-endian, length of the uncompressed document
//! offset 4..end : compressed bytes, decompressing to exactly that length
//! ```
//!
//! The frame is the payload the document store hands to the snapshot store.

use trislot_core::{read_i32_be, write_i32_be, Error, Result, HEADER_LEN};

use crate::codec::CompressionCodec;

/// Worst-case compressed size budget for `len` input bytes: `ceil(len * 1.1) + 50`
#[inline]
pub fn compressed_capacity(len: usize) -> usize {
    len + (len + 9) / 10 + 50
}

/// Compress `raw` and prefix it with its uncompressed length
pub fn encode_frame(codec: &dyn CompressionCodec, raw: &[u8]) -> Result<Vec<u8>> {
    let raw_len = i32::try_from(raw.len())
        .map_err(|_| Error::Compression(format!("document of {} bytes is too large to frame", raw.len())))?;

    let mut frame = vec![0u8; HEADER_LEN + compressed_capacity(raw.len())];
    write_i32_be(&mut frame, 0, raw_len);
    let written = codec.compress_into(raw, &mut frame[HEADER_LEN..])?;
    frame.truncate(HEADER_LEN + written);
    Ok(frame)
}

/// Recover the uncompressed document bytes from a frame
pub fn decode_frame(codec: &dyn CompressionCodec, frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < HEADER_LEN {
        return Err(Error::CorruptFrame(format!(
            "frame of {} bytes is shorter than its header",
            frame.len()
        )));
    }
    let raw_len = read_i32_be(frame, 0);
    let raw_len = usize::try_from(raw_len)
        .map_err(|_| Error::CorruptFrame(format!("negative document length {raw_len}")))?;

    let body = &frame[HEADER_LEN..];
    let recorded = codec
        .decompressed_size(body)
        .map_err(|e| Error::CorruptFrame(e.to_string()))?;
    if let Some(size) = recorded {
        if size != raw_len {
            return Err(Error::CorruptFrame(format!(
                "header promised {raw_len} bytes, compressed data holds {size}"
            )));
        }
    }

    let mut raw = vec![0u8; raw_len];
    let written = codec
        .decompress_into(body, &mut raw)
        .map_err(|e| Error::CorruptFrame(e.to_string()))?;
    if written != raw_len {
        return Err(Error::CorruptFrame(format!(
            "decompressed {written} bytes, header promised {raw_len}"
        )));
    }
    Ok(raw)
}
