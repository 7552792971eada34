//! Durability layer for Trislot
//!
//! This crate handles everything that touches disk:
//!
//! - Slot files: 4-byte version header plus payload, with a two-fsync commit
//! - Snapshot store: rotation across three slots, throttled writes and fsyncs
//! - Recovery: newest committed slot wins, writing resumes in the next slot
//! - Throttle: minimum-interval rate limiter with a guaranteed trailing call
//! - Crash testing infrastructure

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config; // StoreConfig
pub mod paths; // Slot file layout (a.bin, b.bin, c.bin)
pub mod recovery; // Winner selection and resume plan
pub mod slot; // Slot file format and commit protocol
pub mod store; // SnapshotStore
pub mod testing; // Crash injection harness
pub mod throttle; // Rate limiter

// === Re-exports ===
pub use config::StoreConfig;
pub use paths::{slot_path, slot_paths, SLOT_COUNT, SLOT_FILE_NAMES};
pub use recovery::{plan_recovery, select_newest, RecoveryPlan};
pub use slot::{RecoveredSlot, SlotFile};
pub use store::{SnapshotStore, StoreStats};
pub use testing::{CrashPoint, FaultInjector};
pub use throttle::{Throttle, ThrottleDecision};
