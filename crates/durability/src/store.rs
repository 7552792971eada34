//! Three-slot snapshot store
//!
//! Persists one opaque payload at a time by rotating writes across three
//! slot files. At any instant at most one slot is being written and at most
//! one is mid-commit; the third holds the newest fully committed snapshot, so
//! a crash can cost at most the in-flight writes, never the last commit.
//!
//! # Threads
//!
//! All mutable state lives in one `StoreState` behind a mutex, with a
//! single condvar for every wake-up:
//!
//! - the **rotation** thread runs write ticks (throttled to `period / 10`)
//!   and starts sync cycles (throttled to `period`);
//! - the **sync** thread takes the slot handed to it, runs
//!   [`SlotFile::commit`] outside the lock, and gives the slot back.
//!
//! A slot is moved out of the slot array while it is being written or
//! committed, so a slot can never be written while its own commit is in
//! flight. Both threads drop the lock around file I/O; `submit` never waits
//! on disk.
//!
//! # Shutdown
//!
//! [`SnapshotStore::shutdown`] stops intake, waits for the pending payload to
//! be written and committed, then joins both threads. An in-flight fsync is
//! never interrupted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};
use trislot_core::{Error, Result};

use crate::config::StoreConfig;
use crate::paths::{next_slot, slot_paths, SLOT_COUNT};
use crate::recovery::plan_recovery;
use crate::slot::{RecoveredSlot, SlotFile};
use crate::testing::FaultInjector;
use crate::throttle::{Throttle, ThrottleDecision};

/// Counters describing a store's progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Version counter (last version handed to a slot write)
    pub version: i64,
    /// Newest version whose commit completed (recovered version after open)
    pub committed_version: i64,
    /// Slot the next write goes to
    pub cursor: usize,
    /// Slot writes performed since open
    pub writes: u64,
    /// Slot commits completed since open
    pub commits: u64,
    /// Submissions replaced before reaching disk
    pub coalesced: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Draining,
    Closed,
    Failed,
}

struct StoreState {
    slots: [Option<SlotFile>; SLOT_COUNT],
    cursor: usize,
    version: i64,
    dirty: bool,
    writing: Option<usize>,
    currently_syncing: Option<usize>,
    handoff: Option<(usize, SlotFile)>,
    pending_payload: Option<Vec<u8>>,
    write_throttle: Throttle,
    sync_throttle: Throttle,
    phase: Phase,
    failure: Option<Error>,
    failure_reason: String,
    stats: StoreStats,
}

impl StoreState {
    fn is_quiescent(&self) -> bool {
        self.pending_payload.is_none()
            && self.writing.is_none()
            && self.currently_syncing.is_none()
            && self.handoff.is_none()
            && !self.dirty
    }

    fn fail(&mut self, err: Error) {
        if self.phase == Phase::Failed {
            return;
        }
        error!(error = %err, "Snapshot store failed");
        self.failure_reason = err.to_string();
        self.failure = Some(err);
        self.phase = Phase::Failed;
    }

    /// The original failure for the first caller, a summary afterwards
    fn take_failure(&mut self) -> Error {
        self.failure.take().unwrap_or_else(|| Error::Failed {
            reason: self.failure_reason.clone(),
        })
    }

    fn snapshot_stats(&self) -> StoreStats {
        StoreStats {
            version: self.version,
            cursor: self.cursor,
            ..self.stats
        }
    }
}

struct Shared {
    state: Mutex<StoreState>,
    signal: Condvar,
}

/// Crash-safe persistence for a single evolving payload
///
/// # Example
///
/// ```ignore
/// use trislot_durability::{SnapshotStore, StoreConfig};
///
/// let (store, recovered) = SnapshotStore::open("data/store", StoreConfig::default())?;
/// if let Some(payload) = recovered {
///     restore(&payload);
/// }
/// store.submit(b"new state".to_vec())?;
/// store.shutdown()?;
/// ```
pub struct SnapshotStore {
    dir: PathBuf,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl SnapshotStore {
    /// Open the store in `dir`, creating the directory and slots as needed
    ///
    /// Returns the store and the payload of the newest committed slot, if any.
    pub fn open(
        dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<(SnapshotStore, Option<Vec<u8>>)> {
        Self::open_with_faults(dir, config, None)
    }

    /// Open with a crash injector wired into all three slots
    pub fn open_with_faults(
        dir: impl AsRef<Path>,
        config: StoreConfig,
        faults: Option<Arc<FaultInjector>>,
    ) -> Result<(SnapshotStore, Option<Vec<u8>>)> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();
        let started = Instant::now();

        std::fs::create_dir_all(&dir).map_err(Error::io("create directory", &dir))?;

        let mut slots: [Option<SlotFile>; SLOT_COUNT] = Default::default();
        let mut candidates: [Option<RecoveredSlot>; SLOT_COUNT] = Default::default();
        for (index, opened) in open_slots(&dir, &faults).into_iter().enumerate() {
            let (slot, recovered) = opened?;
            slots[index] = Some(slot);
            candidates[index] = recovered;
        }

        let plan = plan_recovery(candidates);
        let recovered = match plan.winner {
            Some((index, payload)) => {
                info!(
                    dir = %dir.display(),
                    slot = index,
                    version = plan.version,
                    payload_len = payload.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Recovered snapshot"
                );
                Some(payload)
            }
            None => {
                info!(dir = %dir.display(), "Opened empty snapshot store");
                None
            }
        };

        let state = StoreState {
            slots,
            cursor: plan.cursor,
            version: plan.version,
            dirty: false,
            writing: None,
            currently_syncing: None,
            handoff: None,
            pending_payload: None,
            write_throttle: Throttle::new(config.write_interval()),
            sync_throttle: Throttle::new(config.sync_interval()),
            phase: Phase::Running,
            failure: None,
            failure_reason: String::new(),
            stats: StoreStats {
                committed_version: plan.version,
                ..StoreStats::default()
            },
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            signal: Condvar::new(),
        });

        let rotation = spawn_worker(&dir, "trislot-rotation", Arc::clone(&shared), rotation_loop)?;
        let sync = match spawn_worker(&dir, "trislot-sync", Arc::clone(&shared), sync_loop) {
            Ok(handle) => handle,
            Err(e) => {
                shared.state.lock().phase = Phase::Closed;
                shared.signal.notify_all();
                let _ = rotation.join();
                return Err(e);
            }
        };

        let store = SnapshotStore {
            dir,
            shared,
            threads: Mutex::new(vec![rotation, sync]),
        };
        Ok((store, recovered))
    }

    /// Directory holding the slot files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hand a new payload to the store
    ///
    /// Replaces any payload not yet written: only the latest submission
    /// between two write ticks reaches disk.
    pub fn submit(&self, payload: Vec<u8>) -> Result<()> {
        let mut state = self.shared.state.lock();
        match state.phase {
            Phase::Running => {}
            Phase::Failed => return Err(state.take_failure()),
            Phase::Draining | Phase::Closed => return Err(Error::Closed),
        }
        if state.pending_payload.replace(payload).is_some() {
            state.stats.coalesced += 1;
        }
        state.write_throttle.request();
        self.shared.signal.notify_all();
        Ok(())
    }

    /// Block until every submitted payload is written and committed
    pub fn wait_idle(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        loop {
            if state.phase == Phase::Failed {
                return Err(state.take_failure());
            }
            if state.is_quiescent() {
                return Ok(());
            }
            self.shared.signal.wait(&mut state);
        }
    }

    /// Current version counter
    pub fn version(&self) -> i64 {
        self.shared.state.lock().version
    }

    /// Progress counters
    pub fn stats(&self) -> StoreStats {
        self.shared.state.lock().snapshot_stats()
    }

    /// Drain, commit and close
    ///
    /// Stops accepting payloads, waits until the last one is durable, and
    /// joins the background threads. Returns the failure that stopped the
    /// store, if any. Calling it again after it returned is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let outcome = {
            let mut state = self.shared.state.lock();
            if state.phase == Phase::Running {
                debug!(dir = %self.dir.display(), "Draining snapshot store");
                state.phase = Phase::Draining;
                self.shared.signal.notify_all();
            }
            while state.phase == Phase::Draining {
                self.shared.signal.wait(&mut state);
            }
            match state.phase {
                Phase::Failed => Err(state.take_failure()),
                _ => Ok(()),
            }
        };

        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                return Err(Error::WorkerPanicked("snapshot store worker"));
            }
        }
        if outcome.is_ok() {
            info!(dir = %self.dir.display(), "Snapshot store closed");
        }
        outcome
    }
}

impl Drop for SnapshotStore {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(dir = %self.dir.display(), error = %e, "Snapshot store shut down with error");
        }
    }
}

/// Open the three slots concurrently and wait for all of them
fn open_slots(
    dir: &Path,
    faults: &Option<Arc<FaultInjector>>,
) -> Vec<Result<(SlotFile, Option<RecoveredSlot>)>> {
    let paths = slot_paths(dir);
    thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| {
                let faults = faults.clone();
                scope.spawn(move || SlotFile::open_with_faults(path.clone(), faults))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or(Err(Error::WorkerPanicked("slot open")))
            })
            .collect()
    })
}

/// Fails the store if its worker unwinds, so waiters are released
struct PanicGuard<'a> {
    shared: &'a Shared,
    name: &'static str,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut state = self.shared.state.lock();
            state.fail(Error::WorkerPanicked(self.name));
            self.shared.signal.notify_all();
        }
    }
}

fn spawn_worker(
    dir: &Path,
    name: &'static str,
    shared: Arc<Shared>,
    body: fn(&Shared),
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let _guard = PanicGuard {
                shared: &shared,
                name,
            };
            body(&shared);
        })
        .map_err(Error::io("spawn worker", dir))
}

fn rotation_loop(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if matches!(state.phase, Phase::Closed | Phase::Failed) {
            break;
        }
        let now = Instant::now();
        let mut next_wake: Option<Duration> = None;

        if state.pending_payload.is_some() {
            match state.write_throttle.poll(now) {
                ThrottleDecision::Fire => {
                    if let Err(e) = write_tick(&mut state) {
                        state.fail(e);
                    }
                    shared.signal.notify_all();
                    continue;
                }
                ThrottleDecision::Wait(delay) => next_wake = Some(delay),
                ThrottleDecision::Idle => {}
            }
        }

        if state.currently_syncing.is_none() {
            match state.sync_throttle.poll(now) {
                ThrottleDecision::Fire => {
                    if let Err(e) = start_sync(&mut state) {
                        state.fail(e);
                    }
                    shared.signal.notify_all();
                    continue;
                }
                ThrottleDecision::Wait(delay) => {
                    next_wake = Some(next_wake.map_or(delay, |wake| wake.min(delay)))
                }
                ThrottleDecision::Idle => {}
            }
        }

        if state.phase == Phase::Draining && state.is_quiescent() {
            state.phase = Phase::Closed;
            shared.signal.notify_all();
            break;
        }

        match next_wake {
            Some(delay) => {
                shared.signal.wait_for(&mut state, delay);
            }
            None => shared.signal.wait(&mut state),
        }
    }
}

/// Write the pending payload into the cursor slot as the next version
fn write_tick(state: &mut MutexGuard<'_, StoreState>) -> Result<()> {
    let Some(payload) = state.pending_payload.take() else {
        return Ok(());
    };
    let index = state.cursor;
    let next = state.version + 1;
    let version = i32::try_from(next).map_err(|_| Error::VersionOverflow { version: next })?;
    let mut slot = state.slots[index].take().ok_or_else(|| Error::Failed {
        reason: format!("slot {index} unavailable for writing"),
    })?;

    state.version = next;
    state.writing = Some(index);
    let result = MutexGuard::unlocked(state, || slot.write(version, &payload));
    state.slots[index] = Some(slot);
    state.writing = None;
    result?;

    state.stats.writes += 1;
    state.dirty = true;
    if state.currently_syncing.is_none() {
        state.sync_throttle.request();
    }
    Ok(())
}

/// Hand the cursor slot to the sync thread and move the cursor on
fn start_sync(state: &mut StoreState) -> Result<()> {
    if !state.dirty {
        return Ok(());
    }
    let index = state.cursor;
    let slot = state.slots[index].take().ok_or_else(|| Error::Failed {
        reason: format!("slot {index} unavailable for commit"),
    })?;

    state.currently_syncing = Some(index);
    state.cursor = next_slot(index);
    state.dirty = false;
    state.handoff = Some((index, slot));
    Ok(())
}

fn sync_loop(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if let Some((index, mut slot)) = state.handoff.take() {
            let result = MutexGuard::unlocked(&mut state, || slot.commit());
            let version = slot.last_written_version();
            state.slots[index] = Some(slot);
            state.currently_syncing = None;

            match result {
                Ok(()) => {
                    state.stats.commits += 1;
                    if let Some(version) = version {
                        state.stats.committed_version = i64::from(version);
                    }
                    if state.dirty {
                        state.sync_throttle.request();
                    }
                }
                Err(e) => state.fail(e),
            }
            shared.signal.notify_all();
            continue;
        }

        if matches!(state.phase, Phase::Closed | Phase::Failed) {
            break;
        }
        shared.signal.wait(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &Path) -> (SnapshotStore, Option<Vec<u8>>) {
        SnapshotStore::open(dir, StoreConfig::for_testing()).unwrap()
    }

    #[test]
    fn test_worker_panic_fails_store() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = open(temp_dir.path());

        let handle = spawn_worker(
            temp_dir.path(),
            "trislot-test-worker",
            Arc::clone(&store.shared),
            |_| panic!("worker died"),
        )
        .unwrap();
        assert!(handle.join().is_err());

        // Shutdown returns instead of waiting on a dead worker
        assert!(matches!(
            store.shutdown(),
            Err(Error::WorkerPanicked("trislot-test-worker"))
        ));
        assert!(matches!(store.submit(b"late".to_vec()), Err(Error::Failed { .. })));
    }

    #[test]
    fn test_fresh_store_recovers_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (store, recovered) = open(temp_dir.path());

        assert!(recovered.is_none());
        assert_eq!(store.version(), 0);
        assert_eq!(store.stats().cursor, 0);
        for name in crate::paths::SLOT_FILE_NAMES {
            assert!(temp_dir.path().join(name).exists());
        }
        store.shutdown().unwrap();
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("store");

        let (store, _) = open(&dir);
        assert_eq!(store.dir(), dir.as_path());
        assert!(dir.join("a.bin").exists());
    }

    #[test]
    fn test_submit_then_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let (store, _) = open(temp_dir.path());
            store.submit(b"hello".to_vec()).unwrap();
            store.shutdown().unwrap();
            assert_eq!(store.version(), 1);
        }

        let (store, recovered) = open(temp_dir.path());
        assert_eq!(recovered, Some(b"hello".to_vec()));
        assert_eq!(store.version(), 1);
        assert_eq!(store.stats().cursor, 1);
        assert_eq!(store.stats().committed_version, 1);
    }

    #[test]
    fn test_rapid_submissions_coalesce() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(Duration::from_millis(500));
        let (store, _) = SnapshotStore::open(temp_dir.path(), config).unwrap();

        // The first write fires immediately; the rest wait out the write interval
        store.submit(b"one".to_vec()).unwrap();
        store.wait_idle().unwrap();
        for i in 0..20u8 {
            store.submit(vec![i]).unwrap();
        }
        store.submit(b"last".to_vec()).unwrap();
        store.shutdown().unwrap();

        let stats = store.stats();
        assert!(stats.coalesced >= 1);
        assert!(stats.writes < 22);
        drop(store);

        let (_, recovered) = SnapshotStore::open(temp_dir.path(), StoreConfig::for_testing()).unwrap();
        assert_eq!(recovered, Some(b"last".to_vec()));
    }

    #[test]
    fn test_wait_idle_commits_each_version() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = open(temp_dir.path());

        for i in 1..=4i64 {
            store.submit(format!("v{i}").into_bytes()).unwrap();
            store.wait_idle().unwrap();
            let stats = store.stats();
            assert_eq!(stats.version, i);
            assert_eq!(stats.committed_version, i);
        }
        assert_eq!(store.stats().commits, 4);
    }

    #[test]
    fn test_rotation_visits_slots_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = open(temp_dir.path());

        let mut cursors = Vec::new();
        for i in 0..4u8 {
            store.submit(vec![i]).unwrap();
            store.wait_idle().unwrap();
            cursors.push(store.stats().cursor);
        }
        assert_eq!(cursors, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = open(temp_dir.path());
        store.shutdown().unwrap();

        assert!(matches!(store.submit(b"late".to_vec()), Err(Error::Closed)));
        // Second shutdown is a no-op
        store.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_idle_store_returns_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = open(temp_dir.path());
        let started = Instant::now();
        store.shutdown().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(store.stats().writes, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = SnapshotStore::open(temp_dir.path(), StoreConfig::new(Duration::ZERO));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
