//! Crash injection for the slot protocol
//!
//! Every syscall a slot issues is preceded by a checkpoint naming the gap it
//! sits in. A [`FaultInjector`] armed at one of those points makes that
//! checkpoint fail, and every checkpoint after it too: from the store's point
//! of view the process died there. Whatever reached the file system before
//! the crash is still on disk, so reopening the directory with a fresh store
//! shows exactly what recovery would see after a process kill.

use std::io;

use parking_lot::Mutex;

/// Crash injection points between slot syscalls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashPoint {
    /// Before the `-1` header is written
    BeforeHeaderInvalidate,
    /// After the `-1` header, before the truncate
    BeforeTruncate,
    /// After the truncate, before the payload write
    BeforePayloadWrite,
    /// After the payload write, before the first fsync
    BeforePayloadSync,
    /// After the first fsync, before the version header write
    BeforeHeaderCommit,
    /// After the version header write, before the second fsync
    BeforeHeaderSync,
}

impl CrashPoint {
    /// Get all crash points, in syscall order
    pub fn all() -> Vec<CrashPoint> {
        vec![
            CrashPoint::BeforeHeaderInvalidate,
            CrashPoint::BeforeTruncate,
            CrashPoint::BeforePayloadWrite,
            CrashPoint::BeforePayloadSync,
            CrashPoint::BeforeHeaderCommit,
            CrashPoint::BeforeHeaderSync,
        ]
    }

    /// True for points inside `write` (before any fsync has run)
    pub fn is_write_phase(&self) -> bool {
        matches!(
            self,
            CrashPoint::BeforeHeaderInvalidate
                | CrashPoint::BeforeTruncate
                | CrashPoint::BeforePayloadWrite
        )
    }

    /// Name of the syscall the point precedes
    pub fn op(&self) -> &'static str {
        match self {
            CrashPoint::BeforeHeaderInvalidate => "invalidate header",
            CrashPoint::BeforeTruncate => "truncate",
            CrashPoint::BeforePayloadWrite => "write payload",
            CrashPoint::BeforePayloadSync => "fsync payload",
            CrashPoint::BeforeHeaderCommit => "write version header",
            CrashPoint::BeforeHeaderSync => "fsync header",
        }
    }
}

#[derive(Debug, Default)]
struct InjectorState {
    armed: Option<(CrashPoint, usize)>,
    crashed_at: Option<CrashPoint>,
}

/// Shared crash trigger consulted by every slot checkpoint
#[derive(Debug, Default)]
pub struct FaultInjector {
    state: Mutex<InjectorState>,
}

impl FaultInjector {
    /// Create an unarmed injector
    pub fn new() -> Self {
        Self::default()
    }

    /// Crash at the next time `point` is reached
    pub fn crash_at(&self, point: CrashPoint) {
        self.crash_at_nth(point, 1);
    }

    /// Crash the `n`th time `point` is reached (1-based)
    pub fn crash_at_nth(&self, point: CrashPoint, n: usize) {
        let mut state = self.state.lock();
        state.armed = Some((point, n.max(1)));
    }

    /// Point the simulated crash happened at, if it has
    pub fn crashed_at(&self) -> Option<CrashPoint> {
        self.state.lock().crashed_at
    }

    /// True once the simulated crash happened
    pub fn has_crashed(&self) -> bool {
        self.crashed_at().is_some()
    }

    /// Checkpoint before the syscall following `point`
    ///
    /// Fails if the armed crash fires here or already fired earlier.
    pub fn check(&self, point: CrashPoint) -> io::Result<()> {
        let mut state = self.state.lock();
        if let Some(crashed) = state.crashed_at {
            return Err(injected(crashed));
        }
        if let Some((armed, remaining)) = state.armed {
            if armed == point {
                if remaining <= 1 {
                    state.armed = None;
                    state.crashed_at = Some(point);
                    return Err(injected(point));
                }
                state.armed = Some((armed, remaining - 1));
            }
        }
        Ok(())
    }
}

fn injected(point: CrashPoint) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("injected crash before {}", point.op()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_injector_passes() {
        let faults = FaultInjector::new();
        for point in CrashPoint::all() {
            assert!(faults.check(point).is_ok());
        }
        assert!(!faults.has_crashed());
    }

    #[test]
    fn test_crash_is_sticky() {
        let faults = FaultInjector::new();
        faults.crash_at(CrashPoint::BeforeTruncate);

        assert!(faults.check(CrashPoint::BeforeHeaderInvalidate).is_ok());
        assert!(faults.check(CrashPoint::BeforeTruncate).is_err());
        // Every later syscall fails too
        assert!(faults.check(CrashPoint::BeforeHeaderInvalidate).is_err());
        assert!(faults.check(CrashPoint::BeforeHeaderSync).is_err());
        assert_eq!(faults.crashed_at(), Some(CrashPoint::BeforeTruncate));
    }

    #[test]
    fn test_crash_at_nth() {
        let faults = FaultInjector::new();
        faults.crash_at_nth(CrashPoint::BeforePayloadSync, 3);

        assert!(faults.check(CrashPoint::BeforePayloadSync).is_ok());
        assert!(faults.check(CrashPoint::BeforePayloadSync).is_ok());
        let err = faults.check(CrashPoint::BeforePayloadSync).unwrap_err();
        assert!(err.to_string().contains("fsync payload"));
    }

    #[test]
    fn test_write_phase_points() {
        let write_phase: Vec<_> = CrashPoint::all()
            .into_iter()
            .filter(CrashPoint::is_write_phase)
            .collect();
        assert_eq!(write_phase.len(), 3);
        assert!(!CrashPoint::BeforePayloadSync.is_write_phase());
    }
}
