//! Clock source selection for trace timestamps.
//!
//! Two time bases are available per capture session:
//! - `WallClock`: calendar time in nanoseconds since the Unix epoch
//! - `Monotonic`: nanoseconds since boot, shifted by the caller's
//!   time-namespace offset
//!
//! The mode is only changed while capture is disarmed, so a whole session
//! is stamped from one base.

use core::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Selectable time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ClockMode {
    #[default]
    WallClock = 0,
    Monotonic = 1,
}

impl ClockMode {
    /// Decode a stored mode. Unknown values yield `None`.
    #[inline(always)]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ClockMode::WallClock),
            1 => Some(ClockMode::Monotonic),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// POSIX name of the underlying clock.
    pub const fn name(self) -> &'static str {
        match self {
            ClockMode::WallClock => "CLOCK_REALTIME",
            ClockMode::Monotonic => "CLOCK_MONOTONIC",
        }
    }
}

/// A provider of the two time bases.
///
/// Implementations are called from the emit hot path and must not block.
pub trait ClockSource: Send + Sync {
    /// Wall-clock time, nanoseconds since the Unix epoch.
    fn realtime_ns(&self) -> u64;

    /// Time since boot in nanoseconds, before namespace adjustment.
    fn monotonic_ns(&self) -> u64;

    /// Offset of the caller's time namespace relative to the host.
    fn namespace_offset_ns(&self) -> i64 {
        0
    }
}

impl<C: ClockSource + ?Sized> ClockSource for alloc::boxed::Box<C> {
    fn realtime_ns(&self) -> u64 {
        (**self).realtime_ns()
    }

    fn monotonic_ns(&self) -> u64 {
        (**self).monotonic_ns()
    }

    fn namespace_offset_ns(&self) -> i64 {
        (**self).namespace_offset_ns()
    }
}

/// Read the current time in the base selected by `mode`.
#[inline]
pub fn read_clock<C: ClockSource + ?Sized>(clock: &C, mode: ClockMode) -> u64 {
    match mode {
        ClockMode::WallClock => clock.realtime_ns(),
        ClockMode::Monotonic => clock
            .monotonic_ns()
            .saturating_add_signed(clock.namespace_offset_ns()),
    }
}

// =============================================================================
// Manual clock
// =============================================================================

/// A clock that only moves when told to.
///
/// Used for deterministic harnesses and for targets without a calibrated
/// time source.
#[derive(Debug, Default)]
pub struct ManualClock {
    realtime: AtomicU64,
    monotonic: AtomicU64,
    offset: AtomicI64,
}

impl ManualClock {
    pub const fn new(realtime_ns: u64, monotonic_ns: u64) -> Self {
        Self {
            realtime: AtomicU64::new(realtime_ns),
            monotonic: AtomicU64::new(monotonic_ns),
            offset: AtomicI64::new(0),
        }
    }

    /// Move both time bases forward by `delta_ns`.
    pub fn advance(&self, delta_ns: u64) {
        self.realtime.fetch_add(delta_ns, Ordering::Relaxed);
        self.monotonic.fetch_add(delta_ns, Ordering::Relaxed);
    }

    pub fn set_realtime(&self, ns: u64) {
        self.realtime.store(ns, Ordering::Relaxed);
    }

    pub fn set_monotonic(&self, ns: u64) {
        self.monotonic.store(ns, Ordering::Relaxed);
    }

    pub fn set_namespace_offset(&self, offset_ns: i64) {
        self.offset.store(offset_ns, Ordering::Relaxed);
    }
}

impl ClockSource for ManualClock {
    fn realtime_ns(&self) -> u64 {
        self.realtime.load(Ordering::Relaxed)
    }

    fn monotonic_ns(&self) -> u64 {
        self.monotonic.load(Ordering::Relaxed)
    }

    fn namespace_offset_ns(&self) -> i64 {
        self.offset.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Host clock
// =============================================================================

/// Host time: `SystemTime` for the wall clock and an `Instant` captured at
/// construction as the boot reference.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    boot: std::time::Instant,
    namespace_offset_ns: i64,
}

#[cfg(feature = "std")]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: std::time::Instant::now(),
            namespace_offset_ns: 0,
        }
    }

    /// Shift monotonic readings as a nested time namespace would.
    pub fn with_namespace_offset(mut self, offset_ns: i64) -> Self {
        self.namespace_offset_ns = offset_ns;
        self
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl ClockSource for SystemClock {
    fn realtime_ns(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_nanos() as u64)
            .unwrap_or(0)
    }

    fn monotonic_ns(&self) -> u64 {
        self.boot.elapsed().as_nanos() as u64
    }

    fn namespace_offset_ns(&self) -> i64 {
        self.namespace_offset_ns
    }
}
