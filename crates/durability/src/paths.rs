//! Store directory structure
//!
//! A store is a directory holding exactly three slot files:
//!
//! ```text
//! store/
//! ├── a.bin   # slot 0
//! ├── b.bin   # slot 1
//! └── c.bin   # slot 2
//! ```

use std::path::{Path, PathBuf};

/// Number of slot files in a store
pub const SLOT_COUNT: usize = 3;

/// Slot file names, indexed by slot
pub const SLOT_FILE_NAMES: [&str; SLOT_COUNT] = ["a.bin", "b.bin", "c.bin"];

/// Path of slot `index` inside `dir`
///
/// # Panics
///
/// Panics if `index >= SLOT_COUNT`.
pub fn slot_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(SLOT_FILE_NAMES[index])
}

/// Paths of all three slots, in slot order
pub fn slot_paths(dir: &Path) -> [PathBuf; SLOT_COUNT] {
    [slot_path(dir, 0), slot_path(dir, 1), slot_path(dir, 2)]
}

/// Index of the slot written after `index`
#[inline]
pub fn next_slot(index: usize) -> usize {
    (index + 1) % SLOT_COUNT
}
