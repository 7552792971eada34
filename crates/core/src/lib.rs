//! Core types for Trislot
//!
//! This crate defines the pieces shared by every layer of the system:
//! - Error: Error type hierarchy and `Result` alias
//! - Header: Big-endian 4-byte header codec used for slot versions and
//!   document frame lengths

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod header;

pub use error::{Error, Result};
pub use header::{encode_header, read_i32_be, write_i32_be, HEADER_LEN, UNCOMMITTED_VERSION};
