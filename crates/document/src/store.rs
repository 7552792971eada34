//! Document store
//!
//! Holds a mutable JSON document in memory and persists it through a
//! [`SnapshotStore`]. Every `period` a ticker thread serializes the document,
//! hashes the bytes, and, only if the hash changed since the last persisted
//! form, compresses and frames them and submits the frame.
//!
//! Serialization is canonical: `serde_json` keeps object keys sorted, so the
//! same tree always yields the same bytes and an unchanged document is never
//! rewritten.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► (caller mutates root; ticker persists) ──► end
//!   │                                                    │
//!   └─ recovers newest committed document                └─ final write, drain, fsync
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace, warn};
use trislot_core::{Error, Result};
use trislot_durability::{SnapshotStore, StoreStats};

use crate::codec::CompressionCodec;
use crate::config::DocumentConfig;
use crate::digest::ContentDigest;
use crate::frame::{decode_frame, encode_frame};

/// Result of one persistence attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Serialized form matched the last persisted one; nothing submitted
    Unchanged,
    /// A new frame was handed to the snapshot store
    Submitted {
        /// Serialized document length
        raw_len: usize,
        /// Frame length (header plus compressed bytes)
        frame_len: usize,
    },
}

struct Inner {
    root: RwLock<Value>,
    snapshots: SnapshotStore,
    codec: Box<dyn CompressionCodec>,
    last_hash: Mutex<Option<ContentDigest>>,
    ending: AtomicBool,
    stopped: Mutex<bool>,
    stop_signal: Condvar,
    period: Duration,
}

impl Inner {
    fn maybe_write(&self) -> Result<WriteOutcome> {
        // Held across serialize and submit so concurrent callers submit in order
        let mut last_hash = self.last_hash.lock();

        let raw = serde_json::to_vec(&*self.root.read())?;
        let digest = ContentDigest::of(&raw);
        if *last_hash == Some(digest) {
            trace!(%digest, "Document unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }

        let frame = encode_frame(self.codec.as_ref(), &raw)?;
        let frame_len = frame.len();
        self.snapshots.submit(frame)?;
        *last_hash = Some(digest);

        debug!(raw_len = raw.len(), frame_len, %digest, "Document submitted");
        Ok(WriteOutcome::Submitted {
            raw_len: raw.len(),
            frame_len,
        })
    }
}

/// Crash-safe persistent JSON document
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use trislot_document::{DocumentConfig, DocumentStore};
///
/// let store = DocumentStore::create("data/doc", DocumentConfig::default())?;
/// store.root()["visits"] = json!(1);
/// store.end()?;
/// ```
pub struct DocumentStore {
    inner: Arc<Inner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl DocumentStore {
    /// Open the document stored in `dir`, or start an empty one
    ///
    /// Recovers the newest committed frame, if any, and starts the
    /// persistence ticker.
    pub fn create(dir: impl AsRef<Path>, config: DocumentConfig) -> Result<DocumentStore> {
        config.validate()?;
        let codec = config.codec()?;
        let started = Instant::now();

        let (snapshots, recovered) = SnapshotStore::open(dir.as_ref(), config.store.clone())?;

        let (root, last_hash) = match recovered {
            Some(frame) => {
                let raw = decode_frame(codec.as_ref(), &frame)?;
                let digest = ContentDigest::of(&raw);
                let root: Value = serde_json::from_slice(&raw)?;
                debug!(
                    bytes = raw.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Document loaded"
                );
                (root, Some(digest))
            }
            None => {
                debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Document created"
                );
                (Value::Object(Map::new()), None)
            }
        };

        let inner = Arc::new(Inner {
            root: RwLock::new(root),
            snapshots,
            codec,
            last_hash: Mutex::new(last_hash),
            ending: AtomicBool::new(false),
            stopped: Mutex::new(false),
            stop_signal: Condvar::new(),
            period: config.period(),
        });

        let ticker_inner = Arc::clone(&inner);
        let ticker = thread::Builder::new()
            .name("trislot-ticker".to_string())
            .spawn(move || ticker_loop(ticker_inner))
            .map_err(Error::io("spawn ticker", dir.as_ref()))?;

        Ok(DocumentStore {
            inner,
            ticker: Mutex::new(Some(ticker)),
        })
    }

    /// Mutable access to the document root
    ///
    /// Release the guard before calling [`DocumentStore::force_write`] or
    /// [`DocumentStore::end`] from the same thread.
    pub fn root(&self) -> RwLockWriteGuard<'_, Value> {
        self.inner.root.write()
    }

    /// Shared access to the document root
    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.inner.root.read()
    }

    /// Clone of the current document
    pub fn snapshot(&self) -> Value {
        self.inner.root.read().clone()
    }

    /// Apply `f` to the document root
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.inner.root.write())
    }

    /// Persist now if the document changed since the last persisted form
    pub fn force_write(&self) -> Result<WriteOutcome> {
        if self.inner.ending.load(Ordering::SeqCst) {
            return Err(Error::AlreadyEnded);
        }
        self.inner.maybe_write()
    }

    /// Persist now and wait until the result is committed to disk
    pub fn flush(&self) -> Result<WriteOutcome> {
        let outcome = self.force_write()?;
        self.inner.snapshots.wait_idle()?;
        Ok(outcome)
    }

    /// Snapshot store version counter
    pub fn version(&self) -> i64 {
        self.inner.snapshots.version()
    }

    /// Snapshot store progress counters
    pub fn stats(&self) -> StoreStats {
        self.inner.snapshots.stats()
    }

    /// Digest of the last persisted (or recovered) serialized form
    pub fn last_digest(&self) -> Option<ContentDigest> {
        *self.inner.last_hash.lock()
    }

    /// Directory holding the slot files
    pub fn dir(&self) -> &Path {
        self.inner.snapshots.dir()
    }

    /// Final write, then drain and close
    ///
    /// Stops the ticker, persists the document one last time, and blocks
    /// until that write is committed. A second call fails with
    /// [`Error::AlreadyEnded`].
    pub fn end(&self) -> Result<()> {
        if self.inner.ending.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyEnded);
        }
        let stopped = self.stop_ticker();
        let written = self.inner.maybe_write();
        let closed = self.inner.snapshots.shutdown();

        stopped?;
        written?;
        closed?;
        info!(dir = %self.dir().display(), "Document store ended");
        Ok(())
    }

    fn stop_ticker(&self) -> Result<()> {
        *self.inner.stopped.lock() = true;
        self.inner.stop_signal.notify_all();
        match self.ticker.lock().take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::WorkerPanicked("document ticker")),
            None => Ok(()),
        }
    }
}

impl Drop for DocumentStore {
    fn drop(&mut self) {
        if self.inner.ending.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.end() {
            warn!(error = %e, "Document store ended with error");
        }
    }
}

fn ticker_loop(inner: Arc<Inner>) {
    let mut stopped = inner.stopped.lock();
    loop {
        if *stopped {
            break;
        }
        inner.stop_signal.wait_for(&mut stopped, inner.period);
        if *stopped {
            break;
        }
        let result = MutexGuard::unlocked(&mut stopped, || inner.maybe_write());
        if let Err(e) = result {
            // Terminal for the snapshot store; `end` reports it
            error!(error = %e, "Persistence tick failed, stopping ticker");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn slow_config() -> DocumentConfig {
        // Long period keeps the ticker out of the way
        DocumentConfig::for_testing().with_period(Duration::from_secs(60))
    }

    #[test]
    fn test_create_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();

        assert_eq!(store.snapshot(), json!({}));
        assert_eq!(store.last_digest(), None);
        assert_eq!(store.version(), 0);
        store.end().unwrap();
    }

    #[test]
    fn test_unchanged_document_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();
        store.root()["x"] = json!(1);

        assert!(matches!(store.force_write().unwrap(), WriteOutcome::Submitted { .. }));
        assert_eq!(store.force_write().unwrap(), WriteOutcome::Unchanged);
        store.end().unwrap();
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_end_twice_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();

        store.end().unwrap();
        assert!(matches!(store.end(), Err(Error::AlreadyEnded)));
        assert!(matches!(store.force_write(), Err(Error::AlreadyEnded)));
    }

    #[test]
    fn test_end_persists_final_state() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();
            store.update(|root| root["name"] = json!("final"));
            store.end().unwrap();
        }

        let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();
        assert_eq!(store.snapshot(), json!({"name": "final"}));
        assert!(store.last_digest().is_some());
    }

    #[test]
    fn test_drop_ends_store() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();
            store.root()["dropped"] = json!(true);
        }

        let store = DocumentStore::create(temp_dir.path(), slow_config()).unwrap();
        assert_eq!(store.read()["dropped"], json!(true));
    }

    #[test]
    fn test_ticker_persists_changes() {
        let temp_dir = TempDir::new().unwrap();
        let config = DocumentConfig::for_testing().with_period(Duration::from_millis(20));
        let store = DocumentStore::create(temp_dir.path(), config).unwrap();
        store.root()["tick"] = json!(1);

        let deadline = Instant::now() + Duration::from_secs(10);
        while store.stats().committed_version < 1 {
            assert!(Instant::now() < deadline, "ticker never persisted");
            thread::sleep(Duration::from_millis(5));
        }
        store.end().unwrap();
        assert_eq!(store.version(), 1);
    }
}
