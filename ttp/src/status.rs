//! Point-in-time view of the tracer for diagnostics.
//!
//! Rendered in the same line-per-fact style as the procfs trace entries:
//!
//! ```text
//! armed: 0
//! clock: CLOCK_MONOTONIC
//! capacity: 30000
//! shards: 2
//! suppressed: 0
//! cpu0: recorded=12 dropped=0
//! cpu1: recorded=30000 dropped=17
//! ```

use alloc::vec::Vec;
use core::fmt;

use crate::clock::ClockMode;
use crate::tracer::Tracer;

/// Counters for one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardStatus {
    pub recorded: u64,
    pub dropped: u64,
}

/// Snapshot returned by [`Tracer::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtpStatus {
    pub armed: bool,
    pub clock_mode: ClockMode,
    pub capacity: usize,
    pub suppressed_overflows: u64,
    pub shards: Vec<ShardStatus>,
}

impl TtpStatus {
    pub fn total_recorded(&self) -> u64 {
        self.shards.iter().map(|shard| shard.recorded).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.shards.iter().map(|shard| shard.dropped).sum()
    }
}

impl<C, U> Tracer<C, U> {
    /// Take a snapshot of the capture state and per-shard counters.
    pub fn status(&self) -> TtpStatus {
        let state = *self.control.lock();
        TtpStatus {
            armed: state.armed,
            clock_mode: state.clock_mode,
            capacity: self.config.max_events,
            suppressed_overflows: self.suppressed_overflows(),
            shards: self
                .shards
                .iter()
                .map(|shard| ShardStatus {
                    recorded: shard.len(),
                    dropped: shard.dropped(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for TtpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "armed: {}", u8::from(self.armed))?;
        writeln!(f, "clock: {}", self.clock_mode.name())?;
        writeln!(f, "capacity: {}", self.capacity)?;
        writeln!(f, "shards: {}", self.shards.len())?;
        writeln!(f, "suppressed: {}", self.suppressed_overflows)?;
        for (cpu, shard) in self.shards.iter().enumerate() {
            writeln!(f, "cpu{}: recorded={} dropped={}", cpu, shard.recorded, shard.dropped)?;
        }
        Ok(())
    }
}
