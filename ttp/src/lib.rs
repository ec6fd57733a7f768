//! Timed trace points (ttp): a low-overhead per-CPU event recorder.
//!
//! Instrumented code emits integer event IDs from any context, interrupt
//! handlers included. Each event is stamped with the current time and
//! appended to the calling CPU's preallocated shard without taking a lock.
//! A management path arms and disarms capture through short text commands;
//! once disarmed, the recorded events are drained as text lines.
//!
//! # Design Principles
//!
//! 1. **One logical unit = one writer**: each CPU appends only to its own
//!    shard, so the hot path needs no synchronization beyond atomics
//! 2. **Fixed capacity**: shards are allocated once and never grow; a full
//!    shard drops events, logging the first drop of a session only
//! 3. **Light control lock**: `start`/`stop`/`reset`/clock selection are
//!    serialized by a spinning mutex the hot path never touches
//! 4. **Drain only while disarmed**: reads are refused while armed
//!
//! # Usage
//!
//! ```rust
//! use ttp::{ClockMode, FixedUnit, ManualClock, Tracer, TtpConfig};
//!
//! let tracer = Tracer::new(TtpConfig::new(1), ManualClock::new(0, 1_000), FixedUnit(0)).unwrap();
//! tracer.select_clock(ClockMode::Monotonic).unwrap();
//! tracer.start().unwrap();
//! tracer.emit(5);
//! tracer.stop();
//!
//! let mut file = tracer.open();
//! let mut buf = [0u8; 128];
//! let n = file.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"5,0,1000\n");
//! assert_eq!(file.read(&mut buf).unwrap(), 0);
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

mod capture;
pub mod clock;
pub mod config;
pub mod control;
pub mod cpu;
pub mod device;
pub mod drain;
pub mod errno;
pub mod error;
pub mod event;
pub mod global;
pub mod shard;
pub mod status;
mod tracer;

pub use self::clock::{read_clock, ClockMode, ClockSource, ManualClock};
#[cfg(feature = "std")]
pub use self::clock::SystemClock;
pub use self::config::{TtpConfig, DEFAULT_MAX_EVENTS};
pub use self::control::{Command, MAX_INPUT_SIZE};
pub use self::cpu::{FixedUnit, ManualUnit, ProcessingUnit};
#[cfg(feature = "std")]
pub use self::cpu::ThreadUnit;
pub use self::device::{errno_result, TtpFile, DEVICE_NAME};
pub use self::drain::{DrainCursor, DrainSession, DrainedEvent, LineBuf, MAX_LINE_LEN};
pub use self::error::TtpError;
pub use self::event::TraceEvent;
pub use self::shard::{ShardBuffer, ShardTable};
pub use self::status::{ShardStatus, TtpStatus};
pub use self::tracer::Tracer;
