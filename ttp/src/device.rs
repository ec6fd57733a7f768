//! Character-device front end (`/dev/ttp`).
//!
//! ```text
//! open("/dev/ttp")  -> TtpFile { fresh drain cursor }
//! write(fd, "start") -> Command::parse -> Tracer::execute
//! read(fd, buf, 128) -> DrainSession::read -> "<id>,<cpu>,<ts>\n"
//! close(fd)          -> cursor dropped
//! ```
//!
//! Each open file has its own cursor; files never share drain state.

use crate::control::{Command, MAX_INPUT_SIZE};
use crate::drain::DrainSession;
use crate::error::TtpError;
use crate::tracer::Tracer;

/// Name the device is registered under.
pub const DEVICE_NAME: &str = "ttp";

/// An open handle on the ttp device.
pub struct TtpFile<'a, C, U> {
    session: DrainSession<'a, C, U>,
}

impl<C, U> Tracer<C, U> {
    /// Open the device, creating a fresh drain cursor.
    pub fn open(&self) -> TtpFile<'_, C, U> {
        TtpFile {
            session: DrainSession::new(self),
        }
    }
}

impl<'a, C, U> TtpFile<'a, C, U> {
    /// Command endpoint.
    ///
    /// Input longer than [`MAX_INPUT_SIZE`] is truncated before matching.
    /// On success returns the number of bytes consumed, which is the
    /// truncated length.
    pub fn write(&mut self, input: &[u8]) -> Result<usize, TtpError> {
        let consumed = input.len().min(MAX_INPUT_SIZE);
        let command = Command::parse(&input[..consumed])?;
        log::debug!("ttp: command {:?}", command);

        self.session.tracer().execute(command)?;
        Ok(consumed)
    }

    /// Drain endpoint: one formatted line per call, 0 at end of data.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, TtpError> {
        self.session.read(out)
    }

    /// The drain session backing this file.
    pub fn session(&mut self) -> &mut DrainSession<'a, C, U> {
        &mut self.session
    }
}

/// Convert a file-operation result to the kernel convention: the byte
/// count on success, the negated errno on failure.
pub fn errno_result(result: Result<usize, TtpError>) -> isize {
    match result {
        Ok(bytes) => bytes as isize,
        Err(err) => -(err.errno() as isize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::{EBUSY, ENOSPC};

    #[test]
    fn errno_result_negates_errors() {
        assert_eq!(errno_result(Ok(12)), 12);
        assert_eq!(errno_result(Err(TtpError::Busy)), -(EBUSY as isize));
        assert_eq!(errno_result(Err(TtpError::NoSpace)), -(ENOSPC as isize));
    }
}
