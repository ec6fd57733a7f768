//! The recorded event.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A timed trace point: the caller's event ID and the time it was emitted.
///
/// ```text
/// +----------+----------+----------+----------+
/// | timestamp (8 bytes)                       |
/// +----------+----------+----------+----------+
/// | id (4 bytes)        | padding (4 bytes)   |
/// +----------+----------+----------+----------+
/// ```
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    /// Nanoseconds since the epoch or since boot, depending on the clock mode
    /// that was selected for the capture session.
    pub timestamp: u64,
    /// Caller-defined event identifier.
    pub id: u32,
}

impl TraceEvent {
    #[inline(always)]
    pub const fn new(id: u32, timestamp: u64) -> Self {
        Self { timestamp, id }
    }
}

const _: () = assert!(
    core::mem::size_of::<TraceEvent>() == 16,
    "TraceEvent must be exactly 16 bytes"
);

/// Storage cell for one event inside a shard.
///
/// Fields are atomics so a late writer racing a reader yields a stale
/// event, never a torn one. On the owning unit a relaxed store compiles to
/// a plain move.
#[derive(Debug, Default)]
pub(crate) struct EventSlot {
    timestamp: AtomicU64,
    id: AtomicU32,
}

impl EventSlot {
    pub(crate) const fn empty() -> Self {
        Self {
            timestamp: AtomicU64::new(0),
            id: AtomicU32::new(0),
        }
    }

    #[inline(always)]
    pub(crate) fn store(&self, event: TraceEvent) {
        self.timestamp.store(event.timestamp, Ordering::Relaxed);
        self.id.store(event.id, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn load(&self) -> TraceEvent {
        TraceEvent {
            timestamp: self.timestamp.load(Ordering::Relaxed),
            id: self.id.load(Ordering::Relaxed),
        }
    }
}
