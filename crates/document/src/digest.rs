//! Content digest for change detection
//!
//! The document store hashes every serialized form and skips persisting it
//! when the hash matches the last persisted one. XXH3-128 is used: collisions
//! are negligible for this purpose and it is far cheaper than the compression
//! step it lets us skip. Not a security primitive.

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

/// 128-bit digest of a serialized document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(u128);

impl ContentDigest {
    /// Digest `bytes`
    pub fn of(bytes: &[u8]) -> Self {
        ContentDigest(xxh3_128(bytes))
    }

    /// Raw digest value
    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
