//! Initialization-time configuration.
//!
//! Both values are fixed once the tracer is built: the shard count mirrors
//! the processing units present at boot and the capacity is the per-shard
//! event limit.

use crate::error::TtpError;

/// Default number of events each shard can hold.
pub const DEFAULT_MAX_EVENTS: usize = 30_000;

/// Tracer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtpConfig {
    /// Events each shard can hold before further events are dropped.
    pub max_events: usize,
    /// Number of shards, one per processing unit.
    pub shards: usize,
}

impl TtpConfig {
    /// Configuration for `shards` processing units with the default capacity.
    pub const fn new(shards: usize) -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            shards,
        }
    }

    /// Override the per-shard capacity.
    pub const fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Configuration sized to the host's available parallelism.
    #[cfg(feature = "std")]
    pub fn detect() -> Self {
        Self::new(crate::cpu::present_units())
    }

    /// Reject configurations that cannot record anything.
    pub fn validate(&self) -> Result<(), TtpError> {
        if self.shards == 0 || self.max_events == 0 {
            return Err(TtpError::InvalidConfig);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_capacity_only() {
        let config = TtpConfig::new(4).with_max_events(16);
        assert_eq!(config.shards, 4);
        assert_eq!(config.max_events, 16);
        assert_eq!(TtpConfig::new(2).max_events, DEFAULT_MAX_EVENTS);
    }

    #[test]
    fn zero_sized_configs_are_rejected() {
        assert_eq!(TtpConfig::new(0).validate(), Err(TtpError::InvalidConfig));
        assert_eq!(
            TtpConfig::new(1).with_max_events(0).validate(),
            Err(TtpError::InvalidConfig)
        );
        assert!(TtpConfig::new(1).validate().is_ok());
    }

    #[cfg(feature = "std")]
    #[test]
    fn detect_finds_at_least_one_unit() {
        assert!(TtpConfig::detect().shards >= 1);
    }
}
