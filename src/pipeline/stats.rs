//! Stream counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of pipeline activity since start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    /// Windows submitted to the sink.
    pub windows_dispatched: u64,
    /// Windows dropped by the silence gate.
    pub windows_silent: u64,
    /// Windows dropped because all dispatch slots were busy.
    pub windows_dropped: u64,
    /// Submissions the sink rejected or failed.
    pub dispatch_failures: u64,
}

/// Shared counters behind the snapshot. Relaxed ordering is enough:
/// these are monotonic tallies, not synchronization points.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) windows_dispatched: AtomicU64,
    pub(crate) windows_silent: AtomicU64,
    pub(crate) windows_dropped: AtomicU64,
    pub(crate) dispatch_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> StreamStats {
        StreamStats {
            windows_dispatched: self.windows_dispatched.load(Ordering::Relaxed),
            windows_silent: self.windows_silent.load(Ordering::Relaxed),
            windows_dropped: self.windows_dropped.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}
