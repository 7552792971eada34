//! Testing utilities for the durability layer
//!
//! - **Crash Harness**: inject a simulated process crash between any two slot syscalls
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trislot_durability::testing::{CrashPoint, FaultInjector};
//!
//! let faults = Arc::new(FaultInjector::new());
//! faults.crash_at(CrashPoint::BeforePayloadSync);
//! let (store, _) = SnapshotStore::open_with_faults(dir, config, Some(faults.clone()))?;
//! ```

mod crash_harness;

pub use crash_harness::{CrashPoint, FaultInjector};
