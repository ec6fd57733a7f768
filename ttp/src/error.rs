//! Error types for the ttp subsystem.

use core::fmt;

use crate::errno::{EBUSY, EINVAL, ENOMEM, ENOSPC};

/// Errors returned by the control plane, the drain protocol and
/// initialization.
///
/// The hot path (`Tracer::emit`) never returns one of these; its failures
/// are logged and absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtpError {
    /// Capture is armed and the operation needs it disarmed
    Busy,
    /// `reset` was requested while capture is armed
    InvalidState,
    /// The command token is not recognised
    InvalidCommand,
    /// The read buffer cannot hold a full formatted line
    NoSpace,
    /// No event storage has been set up
    NotInitialized,
    /// The kernel-wide instance is already installed
    AlreadyInitialized,
    /// Shard storage could not be allocated
    OutOfMemory,
    /// Zero shards or zero capacity requested
    InvalidConfig,
}

impl TtpError {
    /// POSIX errno for this error, as the device reports it to user space.
    pub const fn errno(self) -> i32 {
        match self {
            TtpError::Busy | TtpError::AlreadyInitialized => EBUSY,
            TtpError::InvalidState | TtpError::InvalidCommand | TtpError::InvalidConfig => EINVAL,
            TtpError::NoSpace => ENOSPC,
            // Matches the device's behaviour when storage is missing
            TtpError::NotInitialized | TtpError::OutOfMemory => ENOMEM,
        }
    }
}

impl fmt::Display for TtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TtpError::Busy => write!(f, "capture is armed"),
            TtpError::InvalidState => write!(f, "cannot reset while capture is armed"),
            TtpError::InvalidCommand => write!(f, "unrecognised command"),
            TtpError::NoSpace => write!(f, "read buffer too small for a trace line"),
            TtpError::NotInitialized => write!(f, "event storage not initialized"),
            TtpError::AlreadyInitialized => write!(f, "ttp already initialized"),
            TtpError::OutOfMemory => write!(f, "failed to allocate event storage"),
            TtpError::InvalidConfig => write!(f, "shard count and capacity must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TtpError {}
