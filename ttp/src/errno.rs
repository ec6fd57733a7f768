//! POSIX errno values
//!
//! The subset of error codes the ttp device hands back to its callers.

/// Cannot allocate memory
pub const ENOMEM: i32 = 12;

/// Device or resource busy
pub const EBUSY: i32 = 16;

/// Invalid argument
pub const EINVAL: i32 = 22;

/// No space left on device
pub const ENOSPC: i32 = 28;
