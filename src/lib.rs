//! Trislot - crash-safe persistence for a single evolving document
//!
//! Trislot keeps one JSON document in memory and persists it to three
//! rotating slot files. Every committed slot carries a version header that is
//! written only after its payload is fsynced, so a crash at any point leaves
//! at least one complete, committed snapshot on disk.
//!
//! # Quick Start
//!
//! ```ignore
//! use serde_json::json;
//! use trislot::{DocumentConfig, DocumentStore};
//!
//! let store = DocumentStore::create("data/state", DocumentConfig::default())?;
//! store.root()["sessions"] = json!(42);
//! store.flush()?; // committed to disk
//! store.end()?;
//! ```
//!
//! # Architecture
//!
//! - [`DocumentStore`]: JSON document, change detection, compression framing
//! - [`SnapshotStore`]: three-slot rotation, throttled writes and fsyncs
//! - [`SlotFile`]: one slot file and its two-fsync commit protocol
//!
//! Lower layers are usable on their own: [`SnapshotStore`] persists any
//! byte payload.

pub use trislot_core::{Error, Result};
pub use trislot_document::{ContentDigest, DocumentConfig, DocumentStore, WriteOutcome};
pub use trislot_durability::{SlotFile, SnapshotStore, StoreConfig, StoreStats};
pub use serde_json::{json, Value};

pub use trislot_core::header;
pub use trislot_document as document;
pub use trislot_durability as durability;
