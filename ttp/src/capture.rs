//! The emit hot path.
//!
//! `emit` is called from arbitrary contexts, interrupt handlers included.
//! It never blocks, allocates or takes the control lock. Per call it does:
//! - 1 relaxed load (armed check)
//! - 1 unit id lookup and bounds check
//! - 1 relaxed load (clock mode) and 1 clock read
//! - 1 slot write and 1 release store of the shard count
//!
//! Failures have no return channel; they are logged and absorbed.

use core::sync::atomic::Ordering;

use crate::clock::{read_clock, ClockMode, ClockSource};
use crate::cpu::ProcessingUnit;
use crate::event::TraceEvent;
use crate::tracer::Tracer;

impl<C: ClockSource, U: ProcessingUnit> Tracer<C, U> {
    /// Record `id` with the current time in the calling unit's shard.
    ///
    /// No-op while disarmed. The armed check is a relaxed read: an emit
    /// racing `start` or `stop` may record or miss a few events, nothing
    /// more. Must not be re-entered on the same unit (see [`crate::cpu`]).
    #[inline]
    pub fn emit(&self, id: u32) {
        if !self.is_armed() {
            return;
        }

        let unit = self.units.current();
        let Some(shard) = self.shards.get(unit) else {
            log::error!(
                "ttp: FATAL - CPU {} outside shard table ({} shards)",
                unit,
                self.shards.len()
            );
            return;
        };

        let raw_mode = self.clock_mode.load(Ordering::Relaxed);
        let Some(mode) = ClockMode::from_raw(raw_mode) else {
            log::error!("ttp: FATAL - unknown clock mode {}", raw_mode);
            return;
        };

        let event = TraceEvent::new(id, read_clock(&self.clock, mode));
        if shard.append(event).is_err() {
            self.note_overflow(unit);
        }
    }

    /// Log the first overflow of a session, count the rest silently.
    #[cold]
    fn note_overflow(&self, unit: usize) {
        if !self.overflow_logged.swap(true, Ordering::Relaxed) {
            log::warn!(
                "ttp: max events reached on CPU {} ({} events), dropping further events",
                unit,
                self.config.max_events
            );
            return;
        }

        // Saturates instead of wrapping
        let _ = self
            .suppressed_overflows
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                count.checked_add(1)
            });
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use core::sync::atomic::{AtomicU64, Ordering};

    use crate::clock::{ClockMode, ManualClock};
    use crate::config::TtpConfig;
    use crate::cpu::{FixedUnit, ManualUnit};
    use crate::event::TraceEvent;
    use crate::tracer::Tracer;

    #[test]
    fn disarmed_emit_records_nothing() {
        let tracer = Tracer::new(TtpConfig::new(1), ManualClock::new(1, 1), FixedUnit(0)).unwrap();
        tracer.emit(42);
        assert_eq!(tracer.shards().total_recorded(), 0);
    }

    #[test]
    fn events_land_in_the_calling_units_shard() {
        let tracer =
            Tracer::new(TtpConfig::new(2), ManualClock::new(100, 7), ManualUnit::new(1)).unwrap();
        tracer.start().unwrap();
        tracer.emit(3);
        tracer.units().select(0);
        tracer.emit(4);

        assert_eq!(
            tracer.shards().get(1).unwrap().get(0),
            Some(TraceEvent::new(3, 100))
        );
        assert_eq!(
            tracer.shards().get(0).unwrap().get(0),
            Some(TraceEvent::new(4, 100))
        );
    }

    #[test]
    fn out_of_range_unit_is_absorbed() {
        let tracer = Tracer::new(TtpConfig::new(2), ManualClock::new(1, 1), FixedUnit(5)).unwrap();
        tracer.start().unwrap();
        tracer.emit(1);
        assert_eq!(tracer.shards().total_recorded(), 0);
    }

    /// Counts error records about unknown clock modes. Other tests in this
    /// binary log freely, so records are matched on their text.
    struct ClockModeErrors(AtomicU64);

    impl log::Log for ClockModeErrors {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() == log::Level::Error
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata())
                && record.args().to_string().contains("unknown clock mode")
            {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        fn flush(&self) {}
    }

    static CLOCK_MODE_ERRORS: ClockModeErrors = ClockModeErrors(AtomicU64::new(0));

    #[test]
    fn unknown_clock_mode_drops_the_event() {
        let _ = log::set_logger(&CLOCK_MODE_ERRORS);
        log::set_max_level(log::LevelFilter::Error);

        let tracer = Tracer::new(TtpConfig::new(1), ManualClock::new(1, 1), FixedUnit(0)).unwrap();
        tracer.start().unwrap();
        tracer.clock_mode.store(7, Ordering::Relaxed);
        tracer.emit(1);
        assert_eq!(tracer.shards().total_recorded(), 0);
        assert_eq!(CLOCK_MODE_ERRORS.0.load(Ordering::Relaxed), 1);

        // Nothing is left behind once a valid mode is back
        tracer.clock_mode.store(ClockMode::Monotonic.as_raw(), Ordering::Relaxed);
        tracer.emit(2);
        assert_eq!(
            tracer.shards().get(0).unwrap().get(0),
            Some(TraceEvent::new(2, 1))
        );
    }

    #[test]
    fn overflow_counts_only_drops_after_the_first() {
        let config = TtpConfig::new(1).with_max_events(2);
        let tracer = Tracer::new(config, ManualClock::new(1, 1), FixedUnit(0)).unwrap();
        tracer.start().unwrap();
        for id in 0..6 {
            tracer.emit(id);
        }

        let shard = tracer.shards().get(0).unwrap();
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.dropped(), 4);
        assert_eq!(tracer.suppressed_overflows(), 3);
    }
}
