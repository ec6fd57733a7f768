//! The tracer context object.
//!
//! One [`Tracer`] owns everything the subsystem needs: the shard table,
//! the capture state and the clock and unit sources. It is built once at
//! startup and torn down once at shutdown; the hot path and the control
//! plane both work through a shared reference to it.
//!
//! ```text
//!  emit() (any context)          start/stop/reset/0/1        open()/read()
//!         |                              |                         |
//!         v                              v                         v
//!  +-------------+  relaxed load  +---------------+        +--------------+
//!  | armed flag  |<---------------| control lock  |        | drain cursor |
//!  | clock mode  |   (written     | (spin::Mutex) |        | per session  |
//!  +-------------+  under lock)   +---------------+        +--------------+
//!         |                              | reset                   |
//!         v                              v                         v
//!  +------------------------------------------------------------------------+
//!  |                 SHARD TABLE (one ShardBuffer per CPU)                  |
//!  +------------------------------------------------------------------------+
//! ```

use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use spin::Mutex;

use crate::clock::{ClockMode, ClockSource};
use crate::config::TtpConfig;
use crate::cpu::ProcessingUnit;
use crate::error::TtpError;
use crate::shard::ShardTable;

/// Capture state as seen by the control plane.
///
/// Only mutated while holding the control lock; the hot path reads the
/// atomic mirrors in [`Tracer`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ControlState {
    pub(crate) armed: bool,
    pub(crate) clock_mode: ClockMode,
}

/// Timed trace point recorder.
pub struct Tracer<C, U> {
    pub(crate) config: TtpConfig,
    pub(crate) shards: ShardTable,

    pub(crate) control: Mutex<ControlState>,

    /// Lock-free mirror of `ControlState::armed`.
    pub(crate) armed: AtomicBool,
    /// Lock-free mirror of `ControlState::clock_mode`, stored raw.
    pub(crate) clock_mode: AtomicU8,

    /// Set by the first overflow of a capture session.
    pub(crate) overflow_logged: AtomicBool,
    /// Overflows after the first, counted without logging.
    pub(crate) suppressed_overflows: AtomicU64,

    pub(crate) clock: C,
    pub(crate) units: U,
}

impl<C: ClockSource, U: ProcessingUnit> Tracer<C, U> {
    /// Allocate all shards and build a disarmed tracer using the wall clock.
    ///
    /// Fails with `InvalidConfig` for zero shards or zero capacity and with
    /// `OutOfMemory` if any shard cannot be allocated; in that case every
    /// shard allocated so far is released.
    pub fn new(config: TtpConfig, clock: C, units: U) -> Result<Self, TtpError> {
        config.validate()?;

        log::info!("ttp: allocating space for {} CPUs", config.shards);
        let shards = ShardTable::new(config.shards, config.max_events).map_err(|err| {
            log::error!(
                "ttp: failed to allocate {} events for {} CPUs",
                config.max_events,
                config.shards
            );
            err
        })?;

        let clock_mode = ClockMode::default();
        Ok(Self {
            config,
            shards,
            control: Mutex::new(ControlState {
                armed: false,
                clock_mode,
            }),
            armed: AtomicBool::new(false),
            clock_mode: AtomicU8::new(clock_mode.as_raw()),
            overflow_logged: AtomicBool::new(false),
            suppressed_overflows: AtomicU64::new(0),
            clock,
            units,
        })
    }
}

impl<C, U> Tracer<C, U> {
    /// The configuration the tracer was built with.
    pub fn config(&self) -> &TtpConfig {
        &self.config
    }

    pub fn shards(&self) -> &ShardTable {
        &self.shards
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn units(&self) -> &U {
        &self.units
    }

    /// Whether capture is armed. Lock-free and possibly stale.
    #[inline(always)]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }

    /// The clock mode for the current or next capture session.
    pub fn clock_mode(&self) -> ClockMode {
        self.control.lock().clock_mode
    }

    /// Overflows counted after the first one of the current session.
    pub fn suppressed_overflows(&self) -> u64 {
        self.suppressed_overflows.load(Ordering::Relaxed)
    }
}

impl<C, U> Drop for Tracer<C, U> {
    fn drop(&mut self) {
        log::info!(
            "ttp: releasing event storage ({} events recorded)",
            self.shards.total_recorded()
        );
    }
}
