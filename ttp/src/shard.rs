//! Per-CPU event storage.
//!
//! Each processing unit owns one [`ShardBuffer`], preallocated at
//! initialization and never resized. Appends are not lock-protected.
//!
//! # Single writer
//!
//! Only the owning unit appends to its shard, and `emit` is not reentrant
//! on one unit. The count is a plain load-then-store, not a read-modify-write:
//! two concurrent writers on one shard lose events but never corrupt memory.
//!
//! # Memory Layout
//!
//! ```text
//! ShardTable
//! +---------------------+---------------------+-----
//! | ShardBuffer (cpu 0) | ShardBuffer (cpu 1) | ...   each 64-byte aligned
//! +---------------------+---------------------+-----
//!   | count | dropped | slots ---> [EventSlot; capacity]
//! ```
//!
//! Readers load `count` with acquire ordering and only touch slots below it,
//! which the writer published with a release store.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::TtpError;
use crate::event::{EventSlot, TraceEvent};

// =============================================================================
// Per-CPU Buffer
// =============================================================================

/// Fixed-capacity append-only event buffer for one processing unit.
#[repr(C, align(64))]
pub struct ShardBuffer {
    /// Number of recorded events, `0 <= count <= capacity`.
    count: AtomicU64,

    /// Events refused because the buffer was full.
    dropped: AtomicU64,

    slots: Box<[EventSlot]>,
}

/// Returned by [`ShardBuffer::append`] when the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardFull;

impl ShardBuffer {
    /// Allocate a shard able to hold `capacity` events.
    pub fn with_capacity(capacity: usize) -> Result<Self, TtpError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| TtpError::OutOfMemory)?;
        slots.resize_with(capacity, EventSlot::empty);

        Ok(Self {
            count: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            slots: slots.into_boxed_slice(),
        })
    }

    /// Maximum number of events this shard holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of recorded events.
    #[inline]
    pub fn len(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.slots.len() as u64
    }

    /// Number of events dropped since the last reset.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Append an event at `slots[count]`.
    ///
    /// Must only be called by the unit owning this shard. Fails with
    /// [`ShardFull`] once `count == capacity`; the count never moves past
    /// capacity.
    #[inline(always)]
    pub fn append(&self, event: TraceEvent) -> Result<(), ShardFull> {
        let count = self.count.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(count as usize) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(ShardFull);
        };

        slot.store(event);
        self.count.store(count + 1, Ordering::Release);
        Ok(())
    }

    /// Read the event at `index`, if it has been recorded.
    pub fn get(&self, index: u64) -> Option<TraceEvent> {
        if index >= self.len() {
            return None;
        }
        self.slots.get(index as usize).map(EventSlot::load)
    }

    /// Recorded events in append order.
    pub fn iter(&self) -> impl Iterator<Item = TraceEvent> + '_ {
        let count = self.len() as usize;
        self.slots[..count].iter().map(EventSlot::load)
    }

    /// Forget all recorded events. The slots stay allocated.
    pub(crate) fn clear(&self) {
        self.count.store(0, Ordering::Release);
        self.dropped.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// Shard Table
// =============================================================================

/// One [`ShardBuffer`] per processing unit, indexed by unit id.
pub struct ShardTable {
    shards: Box<[ShardBuffer]>,
}

impl ShardTable {
    /// Allocate `units` shards of `capacity` events each.
    ///
    /// If any allocation fails, the shards built so far are released before
    /// the error is returned.
    pub fn new(units: usize, capacity: usize) -> Result<Self, TtpError> {
        let mut shards = Vec::new();
        shards
            .try_reserve_exact(units)
            .map_err(|_| TtpError::OutOfMemory)?;

        for _ in 0..units {
            shards.push(ShardBuffer::with_capacity(capacity)?);
        }

        Ok(Self {
            shards: shards.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, unit: usize) -> Option<&ShardBuffer> {
        self.shards.get(unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardBuffer> {
        self.shards.iter()
    }

    /// Total events recorded across all shards.
    pub fn total_recorded(&self) -> u64 {
        self.shards.iter().map(ShardBuffer::len).sum()
    }

    /// Zero every shard's count. Only valid while capture is disarmed.
    pub(crate) fn clear_all(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_call_order() {
        let shard = ShardBuffer::with_capacity(8).unwrap();
        for id in 0..5 {
            shard.append(TraceEvent::new(id, 100 + id as u64)).unwrap();
        }

        assert_eq!(shard.len(), 5);
        let ids: Vec<u32> = shard.iter().map(|ev| ev.id).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4]);
        assert_eq!(shard.get(2), Some(TraceEvent::new(2, 102)));
        assert_eq!(shard.get(5), None);
    }

    #[test]
    fn full_shard_refuses_and_counts_drops() {
        let shard = ShardBuffer::with_capacity(2).unwrap();
        shard.append(TraceEvent::new(1, 1)).unwrap();
        shard.append(TraceEvent::new(2, 2)).unwrap();

        assert!(shard.is_full());
        assert_eq!(shard.append(TraceEvent::new(3, 3)), Err(ShardFull));
        assert_eq!(shard.append(TraceEvent::new(4, 4)), Err(ShardFull));
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.dropped(), 2);
    }

    #[test]
    fn clear_keeps_capacity() {
        let shard = ShardBuffer::with_capacity(4).unwrap();
        shard.append(TraceEvent::new(9, 9)).unwrap();
        shard.clear();

        assert!(shard.is_empty());
        assert_eq!(shard.capacity(), 4);
        assert_eq!(shard.dropped(), 0);
        shard.append(TraceEvent::new(10, 10)).unwrap();
        assert_eq!(shard.get(0), Some(TraceEvent::new(10, 10)));
    }

    #[test]
    fn oversized_allocation_fails_cleanly() {
        assert_eq!(
            ShardTable::new(2, usize::MAX / 2).err(),
            Some(TtpError::OutOfMemory)
        );
    }

    #[test]
    fn table_clear_all_zeroes_every_shard() {
        let table = ShardTable::new(3, 4).unwrap();
        for unit in 0..3 {
            table.get(unit).unwrap().append(TraceEvent::new(1, 1)).unwrap();
        }
        assert_eq!(table.total_recorded(), 3);

        table.clear_all();
        assert_eq!(table.total_recorded(), 0);
        assert!(table.iter().all(|shard| shard.capacity() == 4));
    }
}
