//! Processing-unit identification.
//!
//! The capture engine indexes the shard table by the calling unit's id.
//! On a kernel this is the CPU number read from per-CPU data with
//! preemption disabled; on a host it is a per-thread index.
//!
//! # Contract
//!
//! One logical unit = one writer. An implementation must never report the
//! same index to two contexts that can emit concurrently. Breaking this
//! loses events; it does not corrupt memory.

use core::sync::atomic::{AtomicUsize, Ordering};

/// Source of the calling context's processing-unit index.
pub trait ProcessingUnit: Send + Sync {
    /// Index of the unit the caller is running on.
    fn current(&self) -> usize;
}

impl<U: ProcessingUnit + ?Sized> ProcessingUnit for alloc::boxed::Box<U> {
    #[inline(always)]
    fn current(&self) -> usize {
        (**self).current()
    }
}

/// Always reports the same unit. For single-context callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedUnit(pub usize);

impl ProcessingUnit for FixedUnit {
    #[inline(always)]
    fn current(&self) -> usize {
        self.0
    }
}

/// Reports whichever unit was last selected.
///
/// Lets a single-threaded harness play the part of several CPUs.
#[derive(Debug, Default)]
pub struct ManualUnit {
    unit: AtomicUsize,
}

impl ManualUnit {
    pub const fn new(unit: usize) -> Self {
        Self {
            unit: AtomicUsize::new(unit),
        }
    }

    pub fn select(&self, unit: usize) {
        self.unit.store(unit, Ordering::Relaxed);
    }
}

impl ProcessingUnit for ManualUnit {
    #[inline(always)]
    fn current(&self) -> usize {
        self.unit.load(Ordering::Relaxed)
    }
}

/// Gives every OS thread its own unit index, assigned on first use in
/// process-wide order (0, 1, 2, ...).
///
/// Threads beyond the shard count get an out-of-range index and their
/// events are refused by the bounds check in `emit`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadUnit;

#[cfg(feature = "std")]
static NEXT_THREAD_UNIT: AtomicUsize = AtomicUsize::new(0);

#[cfg(feature = "std")]
std::thread_local! {
    static THREAD_UNIT: usize = NEXT_THREAD_UNIT.fetch_add(1, Ordering::Relaxed);
}

#[cfg(feature = "std")]
impl ProcessingUnit for ThreadUnit {
    #[inline]
    fn current(&self) -> usize {
        THREAD_UNIT.with(|unit| *unit)
    }
}

/// Number of processing units present on the host.
#[cfg(feature = "std")]
pub fn present_units() -> usize {
    std::thread::available_parallelism()
        .map(|units| units.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_unit_follows_selection() {
        let unit = ManualUnit::new(0);
        assert_eq!(unit.current(), 0);
        unit.select(3);
        assert_eq!(unit.current(), 3);
    }

    #[cfg(feature = "std")]
    #[test]
    fn thread_units_are_stable_and_distinct() {
        let here = ThreadUnit.current();
        assert_eq!(ThreadUnit.current(), here);

        let there = std::thread::spawn(|| ThreadUnit.current()).join().unwrap();
        assert_ne!(here, there);
    }
}
