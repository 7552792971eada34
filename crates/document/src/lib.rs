//! Document layer for Trislot
//!
//! A JSON document kept in memory and persisted through the snapshot store:
//!
//! - Codec: compression seam (zstd by default, identity for debugging)
//! - Digest: change detection over the canonical serialized form
//! - Frame: `[i32 BE raw length][compressed bytes]` payload layout
//! - Store: periodic persistence with change skipping and a final write on end

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec; // Compression codecs
pub mod config; // DocumentConfig
pub mod digest; // ContentDigest
pub mod frame; // Frame encode/decode
pub mod store; // DocumentStore

// === Re-exports ===
pub use codec::{get_codec, CodecError, CompressionCodec, IdentityCodec, ZstdCodec};
pub use config::DocumentConfig;
pub use digest::ContentDigest;
pub use frame::{compressed_capacity, decode_frame, encode_frame};
pub use store::{DocumentStore, WriteOutcome};
