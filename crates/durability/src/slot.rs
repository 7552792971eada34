//! Slot file: one version header plus one opaque payload
//!
//! # Format
//!
//! ```text
//! offset 0..4   : i32 big-endian version, or -1 while the slot is provisional
//! offset 4..EOF : payload (exactly file_length - 4 bytes)
//! ```
//!
//! # Commit protocol
//!
//! A slot moves through six syscalls, split over two calls:
//!
//! 1. `write`: header := -1
//! 2. `write`: truncate to 4 + payload length
//! 3. `write`: payload at offset 4
//! 4. `commit`: fsync
//! 5. `commit`: header := version
//! 6. `commit`: fsync
//!
//! The version header only reaches the file after the payload fsync has
//! returned. A header reading `V >= 0` therefore vouches for a complete,
//! durable payload; a slot interrupted anywhere before step 5 reads `-1` (or
//! is empty) and is ignored by recovery.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use trislot_core::{encode_header, read_i32_be, Error, Result, HEADER_LEN, UNCOMMITTED_VERSION};

use crate::testing::{CrashPoint, FaultInjector};

/// Contents recovered from a slot at open time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredSlot {
    /// Committed version found in the header
    pub version: i32,
    /// Payload following the header
    pub payload: Vec<u8>,
}

/// A single slot file held open for the lifetime of the store
#[derive(Debug)]
pub struct SlotFile {
    path: PathBuf,
    file: File,
    /// Version of the last `write`, committed or not
    last_written_version: Option<i32>,
    faults: Option<Arc<FaultInjector>>,
}

impl SlotFile {
    /// Open the slot at `path`, creating it if absent
    ///
    /// This is the only read path: the slot is never read again after
    /// startup. Files shorter than the header, and files whose header is
    /// negative (an interrupted write), yield no recovered data.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<(SlotFile, Option<RecoveredSlot>)> {
        Self::open_with_faults(path, None)
    }

    /// Open like [`SlotFile::open_or_create`], consulting `faults` before every write syscall
    pub fn open_with_faults(
        path: impl Into<PathBuf>,
        faults: Option<Arc<FaultInjector>>,
    ) -> Result<(SlotFile, Option<RecoveredSlot>)> {
        let path = path.into();
        let recovered = Self::recover(&path)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(Error::io("open", &path))?;

        let slot = SlotFile {
            path,
            file,
            last_written_version: None,
            faults,
        };
        Ok((slot, recovered))
    }

    fn recover(path: &Path) -> Result<Option<RecoveredSlot>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io("read", path)(e)),
        };

        if data.len() < HEADER_LEN {
            if !data.is_empty() {
                warn!(path = %path.display(), len = data.len(), "Slot shorter than header, ignoring");
            }
            return Ok(None);
        }

        let version = read_i32_be(&data, 0);
        if version < 0 {
            warn!(path = %path.display(), version, "Slot holds an interrupted write, ignoring");
            return Ok(None);
        }

        debug!(path = %path.display(), version, payload_len = data.len() - HEADER_LEN, "Recovered slot");
        Ok(Some(RecoveredSlot {
            version,
            payload: data[HEADER_LEN..].to_vec(),
        }))
    }

    /// Path of the slot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version passed to the last `write`, if any
    pub fn last_written_version(&self) -> Option<i32> {
        self.last_written_version
    }

    /// Stage `payload` as `version`
    ///
    /// Marks the slot provisional, resizes it and writes the payload. Nothing
    /// is fsynced and the version header is not written yet; until
    /// [`SlotFile::commit`] completes the slot reads as interrupted.
    pub fn write(&mut self, version: i32, payload: &[u8]) -> Result<()> {
        debug_assert!(version >= 0, "slot versions are non-negative");
        self.last_written_version = Some(version);

        self.checkpoint(CrashPoint::BeforeHeaderInvalidate)?;
        self.write_header(UNCOMMITTED_VERSION, "invalidate header")?;

        self.checkpoint(CrashPoint::BeforeTruncate)?;
        self.file
            .set_len((HEADER_LEN + payload.len()) as u64)
            .map_err(Error::io("truncate", &self.path))?;

        self.checkpoint(CrashPoint::BeforePayloadWrite)?;
        self.file
            .seek(SeekFrom::Start(HEADER_LEN as u64))
            .and_then(|_| self.file.write_all(payload))
            .map_err(Error::io("write payload", &self.path))?;

        debug!(path = %self.path.display(), version, len = payload.len(), "Slot written");
        Ok(())
    }

    /// Make the last `write` durable
    ///
    /// fsyncs the payload, then writes the version header and fsyncs again,
    /// so the header can only become durable after the payload has.
    pub fn commit(&mut self) -> Result<()> {
        let Some(version) = self.last_written_version else {
            return Ok(());
        };

        self.checkpoint(CrashPoint::BeforePayloadSync)?;
        self.file
            .sync_all()
            .map_err(Error::io("fsync payload", &self.path))?;

        self.checkpoint(CrashPoint::BeforeHeaderCommit)?;
        self.write_header(version, "write version header")?;

        self.checkpoint(CrashPoint::BeforeHeaderSync)?;
        self.file
            .sync_all()
            .map_err(Error::io("fsync header", &self.path))?;

        debug!(path = %self.path.display(), version, "Slot committed");
        Ok(())
    }

    fn write_header(&mut self, value: i32, op: &'static str) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(&encode_header(value)))
            .map_err(Error::io(op, &self.path))
    }

    fn checkpoint(&self, point: CrashPoint) -> Result<()> {
        match &self.faults {
            Some(faults) => faults.check(point).map_err(Error::io(point.op(), &self.path)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reopen(path: &Path) -> Option<RecoveredSlot> {
        SlotFile::open_or_create(path).unwrap().1
    }

    #[test]
    fn test_open_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");

        let (slot, recovered) = SlotFile::open_or_create(&path).unwrap();

        assert!(recovered.is_none());
        assert!(path.exists());
        assert_eq!(slot.path(), path.as_path());
        assert_eq!(slot.last_written_version(), None);
    }

    #[test]
    fn test_write_commit_recover() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");

        {
            let (mut slot, _) = SlotFile::open_or_create(&path).unwrap();
            slot.write(7, b"payload").unwrap();
            slot.commit().unwrap();
            assert_eq!(slot.last_written_version(), Some(7));
        }

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[..4], &[0, 0, 0, 7]);
        assert_eq!(&data[4..], b"payload");

        assert_eq!(
            reopen(&path),
            Some(RecoveredSlot {
                version: 7,
                payload: b"payload".to_vec()
            })
        );
    }

    #[test]
    fn test_uncommitted_write_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");

        {
            let (mut slot, _) = SlotFile::open_or_create(&path).unwrap();
            slot.write(1, b"first").unwrap();
            slot.commit().unwrap();
            slot.write(2, b"second").unwrap();
        }

        let data = fs::read(&path).unwrap();
        assert_eq!(&data[..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(reopen(&path).is_none());
    }

    #[test]
    fn test_shorter_payload_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");

        let (mut slot, _) = SlotFile::open_or_create(&path).unwrap();
        slot.write(1, &[9u8; 100]).unwrap();
        slot.commit().unwrap();
        slot.write(2, b"tiny").unwrap();
        slot.commit().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 8);
        assert_eq!(reopen(&path).unwrap().payload, b"tiny");
    }

    #[test]
    fn test_empty_payload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");

        let (mut slot, _) = SlotFile::open_or_create(&path).unwrap();
        slot.write(3, b"").unwrap();
        slot.commit().unwrap();

        let recovered = reopen(&path).unwrap();
        assert_eq!(recovered.version, 3);
        assert!(recovered.payload.is_empty());
    }

    #[test]
    fn test_short_file_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");
        fs::write(&path, [0, 0, 1]).unwrap();

        assert!(reopen(&path).is_none());
        // Still usable for writing
        let (mut slot, _) = SlotFile::open_or_create(&path).unwrap();
        slot.write(1, b"ok").unwrap();
        slot.commit().unwrap();
        assert_eq!(reopen(&path).unwrap().version, 1);
    }

    #[test]
    fn test_commit_without_write_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");

        let (mut slot, _) = SlotFile::open_or_create(&path).unwrap();
        slot.commit().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_crash_before_header_commit_leaves_marker() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.bin");
        let faults = Arc::new(FaultInjector::new());

        let (mut slot, _) = SlotFile::open_with_faults(&path, Some(faults.clone())).unwrap();
        slot.write(1, b"old").unwrap();
        slot.commit().unwrap();

        faults.crash_at(CrashPoint::BeforeHeaderCommit);
        slot.write(2, b"new payload").unwrap();
        let err = slot.commit().unwrap_err();
        assert!(err.is_io());

        // Payload fully written and synced, but the header never claimed it
        let data = fs::read(&path).unwrap();
        assert_eq!(&data[4..], b"new payload");
        assert!(reopen(&path).is_none());
    }
}
