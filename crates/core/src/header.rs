//! Binary header codec
//!
//! Every slot file starts with a 4-byte big-endian signed version, and every
//! document frame starts with a 4-byte big-endian uncompressed length. Both
//! go through these two functions.
//!
//! ```text
//! offset 0..4 : i32 big-endian (two's complement)
//! ```

use byteorder::{BigEndian, ByteOrder};

/// Size of the header in bytes
pub const HEADER_LEN: usize = 4;

/// Header value marking a slot whose contents are provisional
pub const UNCOMMITTED_VERSION: i32 = -1;

/// Read a big-endian `i32` at `offset`.
///
/// The caller guarantees `buf.len() >= offset + HEADER_LEN`; shorter buffers panic.
#[inline]
pub fn read_i32_be(buf: &[u8], offset: usize) -> i32 {
    BigEndian::read_i32(&buf[offset..offset + HEADER_LEN])
}

/// Write `value` as a big-endian `i32` at `offset`.
///
/// The caller guarantees `buf.len() >= offset + HEADER_LEN`; shorter buffers panic.
#[inline]
pub fn write_i32_be(buf: &mut [u8], offset: usize, value: i32) {
    BigEndian::write_i32(&mut buf[offset..offset + HEADER_LEN], value);
}

/// Encode a standalone header
#[inline]
pub fn encode_header(value: i32) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    write_i32_be(&mut buf, 0, value);
    buf
}
