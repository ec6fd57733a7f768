//! Initialization that runs out of memory part-way through the shard table.
//!
//! Installs a global allocator that refuses shard-sized allocations once a
//! budget is spent, so this binary holds a single test.

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use ttp::{FixedUnit, ManualClock, Tracer, TtpConfig, TtpError};

const CAPACITY: usize = 12_345;
// Each slot holds a u64 timestamp and a u32 id, padded to 16 bytes
const SHARD_BYTES: usize = CAPACITY * 16;

/// Passes through to `System`, but only grants `budget` allocations of
/// `target` bytes and counts how many of those are handed out and freed.
struct ShardBudget {
    target: AtomicUsize,
    budget: AtomicUsize,
    granted: AtomicUsize,
    released: AtomicUsize,
}

unsafe impl GlobalAlloc for ShardBudget {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == self.target.load(Ordering::Relaxed) {
            let spent = self
                .budget
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1));
            if spent.is_err() {
                return ptr::null_mut();
            }
            self.granted.fetch_add(1, Ordering::Relaxed);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() == self.target.load(Ordering::Relaxed) {
            self.released.fetch_add(1, Ordering::Relaxed);
        }
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static ALLOCATOR: ShardBudget = ShardBudget {
    target: AtomicUsize::new(0),
    budget: AtomicUsize::new(0),
    granted: AtomicUsize::new(0),
    released: AtomicUsize::new(0),
};

#[test]
fn later_shard_failure_releases_earlier_shards() {
    ALLOCATOR.target.store(SHARD_BYTES, Ordering::Relaxed);
    let config = TtpConfig::new(4).with_max_events(CAPACITY);

    // Shards 0 and 1 allocate, shard 2 is refused
    ALLOCATOR.budget.store(2, Ordering::Relaxed);
    let result = Tracer::new(config, ManualClock::default(), FixedUnit(0));
    assert_eq!(result.err(), Some(TtpError::OutOfMemory));
    assert_eq!(ALLOCATOR.granted.load(Ordering::Relaxed), 2);
    assert_eq!(ALLOCATOR.released.load(Ordering::Relaxed), 2);

    // With enough memory the same configuration succeeds and frees on drop
    ALLOCATOR.budget.store(4, Ordering::Relaxed);
    let tracer = Tracer::new(config, ManualClock::default(), FixedUnit(0)).unwrap();
    assert_eq!(tracer.shards().len(), 4);
    assert_eq!(ALLOCATOR.granted.load(Ordering::Relaxed), 6);
    drop(tracer);
    assert_eq!(ALLOCATOR.released.load(Ordering::Relaxed), 6);

    ALLOCATOR.target.store(0, Ordering::Relaxed);
}
