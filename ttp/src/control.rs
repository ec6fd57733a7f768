//! Control plane: arming, disarming, reset and clock selection.
//!
//! Commands arrive as short text tokens written to the device:
//!
//! | Token   | Allowed while armed | Effect                           |
//! |---------|---------------------|----------------------------------|
//! | `start` | no (`Busy`)         | arm capture                      |
//! | `stop`  | yes                 | disarm capture                   |
//! | `reset` | no (`InvalidState`) | zero every shard's count         |
//! | `0`     | no (`Busy`)         | timestamps from the wall clock   |
//! | `1`     | no (`Busy`)         | timestamps from the monotonic clock |
//!
//! Every command runs under the control lock, which is held for O(shards)
//! at most and never across anything that can sleep.

use core::str::FromStr;
use core::sync::atomic::Ordering;

use crate::clock::ClockMode;
use crate::error::TtpError;
use crate::tracer::Tracer;

/// Longest command input considered; longer writes are truncated.
pub const MAX_INPUT_SIZE: usize = 31;

/// A control-plane command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Reset,
    SelectClock(ClockMode),
}

impl Command {
    /// Parse raw device input: truncate to [`MAX_INPUT_SIZE`] bytes, trim
    /// surrounding whitespace, then match exactly.
    pub fn parse(input: &[u8]) -> Result<Self, TtpError> {
        let input = &input[..input.len().min(MAX_INPUT_SIZE)];
        let text = core::str::from_utf8(input).map_err(|_| TtpError::InvalidCommand)?;
        text.parse()
    }

    /// The token that selects this command.
    pub const fn token(self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Reset => "reset",
            Command::SelectClock(ClockMode::WallClock) => "0",
            Command::SelectClock(ClockMode::Monotonic) => "1",
        }
    }
}

impl FromStr for Command {
    type Err = TtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_matches(is_space) {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "reset" => Ok(Command::Reset),
            "0" => Ok(Command::SelectClock(ClockMode::WallClock)),
            "1" => Ok(Command::SelectClock(ClockMode::Monotonic)),
            _ => Err(TtpError::InvalidCommand),
        }
    }
}

/// The C locale `isspace` set: Unicode spaces are not separators.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

impl<C, U> Tracer<C, U> {
    /// Run one command under the control lock.
    pub fn execute(&self, command: Command) -> Result<(), TtpError> {
        let mut state = self.control.lock();

        match command {
            Command::Start => {
                if state.armed {
                    return Err(TtpError::Busy);
                }
                self.overflow_logged.store(false, Ordering::Relaxed);
                self.suppressed_overflows.store(0, Ordering::Relaxed);
                state.armed = true;
                self.armed.store(true, Ordering::Release);
                log::info!("ttp: Armed");
            }
            Command::Stop => {
                state.armed = false;
                self.armed.store(false, Ordering::Release);
                log::info!("ttp: Stopped");

                let suppressed = self.suppressed_overflows.load(Ordering::Relaxed);
                if suppressed > 0 {
                    log::info!("ttp: {} further events dropped after the first overflow", suppressed);
                }
            }
            Command::Reset => {
                if state.armed {
                    return Err(TtpError::InvalidState);
                }
                self.shards.clear_all();
                log::info!("ttp: Reset event storage");
            }
            Command::SelectClock(mode) => {
                if state.armed {
                    return Err(TtpError::Busy);
                }
                state.clock_mode = mode;
                self.clock_mode.store(mode.as_raw(), Ordering::Relaxed);
                log::info!("ttp: using {}", mode.name());
            }
        }

        Ok(())
    }

    /// Arm capture. `Busy` if already armed.
    pub fn start(&self) -> Result<(), TtpError> {
        self.execute(Command::Start)
    }

    /// Disarm capture. Never fails.
    pub fn stop(&self) {
        // Stop is accepted in every state
        let _ = self.execute(Command::Stop);
    }

    /// Zero every shard's count without freeing storage.
    pub fn reset(&self) -> Result<(), TtpError> {
        self.execute(Command::Reset)
    }

    /// Choose the time base for the next capture session.
    pub fn select_clock(&self, mode: ClockMode) -> Result<(), TtpError> {
        self.execute(Command::SelectClock(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_after_trimming() {
        assert_eq!(Command::parse(b"start\n"), Ok(Command::Start));
        assert_eq!(Command::parse(b"  stop \t"), Ok(Command::Stop));
        assert_eq!(Command::parse(b"reset"), Ok(Command::Reset));
        assert_eq!(Command::parse(b"\x0bstart\r\x0c"), Ok(Command::Start));
        assert_eq!(
            Command::parse(b"0\n"),
            Ok(Command::SelectClock(ClockMode::WallClock))
        );
        assert_eq!(
            Command::parse(b"1"),
            Ok(Command::SelectClock(ClockMode::Monotonic))
        );
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        for input in [&b"START"[..], b"sta", b"", b"   ", b"starts", b"2", b"stop now"] {
            assert_eq!(Command::parse(input), Err(TtpError::InvalidCommand), "{:?}", input);
        }

        // Only ASCII whitespace is trimmed
        for input in ["start\u{a0}", "\u{3000}stop", "\u{2003}reset"] {
            assert_eq!(
                Command::parse(input.as_bytes()),
                Err(TtpError::InvalidCommand),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn input_is_truncated_before_matching() {
        let mut long = b"start".to_vec();
        long.resize(64, b' ');
        assert_eq!(Command::parse(&long), Ok(Command::Start));

        // The token itself starts past the cut-off
        let mut hidden = [b' '; 40].to_vec();
        hidden.extend_from_slice(b"start");
        assert_eq!(Command::parse(&hidden), Err(TtpError::InvalidCommand));
    }

    #[test]
    fn invalid_utf8_is_an_invalid_command() {
        assert_eq!(Command::parse(&[0xff, 0xfe]), Err(TtpError::InvalidCommand));
    }

    #[test]
    fn token_parses_back_to_the_command() {
        for command in [
            Command::Start,
            Command::Stop,
            Command::Reset,
            Command::SelectClock(ClockMode::WallClock),
            Command::SelectClock(ClockMode::Monotonic),
        ] {
            assert_eq!(command.token().parse::<Command>(), Ok(command));
        }
    }
}
