//! Drain protocol: sequential export of recorded events.
//!
//! A drain session walks every shard in order with a cursor
//! `(shard, event)` and produces one text line per event:
//!
//! ```text
//! <id>,<shard>,<timestamp>\n
//! 5,0,1718000000000000123
//! 7,0,1718000000000000456
//! 3,1,1718000000000000200
//! ```
//!
//! Lines from one shard are in emit order; lines from different shards are
//! not merged. Consumers that want a global order sort by timestamp.
//!
//! Draining is refused while capture is armed. A session cannot be rewound;
//! open a new one to start over.

use core::fmt::{self, Write};

use crate::error::TtpError;
use crate::event::TraceEvent;
use crate::tracer::Tracer;

/// Upper bound on a formatted line. Reads must offer at least this much room.
pub const MAX_LINE_LEN: usize = 128;

// =============================================================================
// Cursor
// =============================================================================

/// Position of a drain session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainCursor {
    shard: usize,
    event: u64,
}

impl DrainCursor {
    /// Cursor at the first event of the first shard.
    pub const fn new() -> Self {
        Self { shard: 0, event: 0 }
    }

    pub const fn shard_index(&self) -> usize {
        self.shard
    }

    pub const fn event_index(&self) -> u64 {
        self.event
    }
}

/// One drained event together with the shard it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainedEvent {
    pub shard: usize,
    pub event: TraceEvent,
}

impl DrainedEvent {
    /// Format as `"<id>,<shard>,<timestamp>\n"`.
    pub fn to_line(&self) -> LineBuf {
        let mut line = LineBuf::new();
        // A u32, a shard index and a u64 always fit in MAX_LINE_LEN
        let _ = writeln!(line, "{},{},{}", self.event.id, self.shard, self.event.timestamp);
        line
    }
}

impl<C, U> Tracer<C, U> {
    /// Advance `cursor` to the next recorded event.
    ///
    /// Returns `Ok(None)` once every shard is exhausted, and keeps doing so.
    pub fn next_event(&self, cursor: &mut DrainCursor) -> Result<Option<DrainedEvent>, TtpError> {
        if self.is_armed() {
            return Err(TtpError::Busy);
        }

        loop {
            let Some(shard) = self.shards.get(cursor.shard) else {
                return Ok(None);
            };

            // `>=` rather than `==`: a reset between reads ends this shard
            if cursor.event >= shard.len() {
                cursor.shard += 1;
                cursor.event = 0;
                continue;
            }

            let index = cursor.event;
            cursor.event += 1;
            if let Some(event) = shard.get(index) {
                return Ok(Some(DrainedEvent {
                    shard: cursor.shard,
                    event,
                }));
            }
        }
    }

    /// Start a drain session at the beginning of the first shard.
    pub fn drain(&self) -> DrainSession<'_, C, U> {
        DrainSession::new(self)
    }
}

// =============================================================================
// Session
// =============================================================================

/// A consumer's drain state: the tracer and a private cursor.
pub struct DrainSession<'a, C, U> {
    tracer: &'a Tracer<C, U>,
    cursor: DrainCursor,
    finished: bool,
}

impl<'a, C, U> DrainSession<'a, C, U> {
    pub fn new(tracer: &'a Tracer<C, U>) -> Self {
        Self {
            tracer,
            cursor: DrainCursor::new(),
            finished: false,
        }
    }

    pub fn cursor(&self) -> DrainCursor {
        self.cursor
    }

    pub fn tracer(&self) -> &'a Tracer<C, U> {
        self.tracer
    }

    /// Next formatted line, or `None` at end of data.
    pub fn next_line(&mut self) -> Result<Option<LineBuf>, TtpError> {
        Ok(self
            .tracer
            .next_event(&mut self.cursor)?
            .map(|drained| drained.to_line()))
    }

    /// Copy exactly one formatted line into `out`.
    ///
    /// Returns the number of bytes written, 0 at end of data. Fails with
    /// `Busy` while armed and with `NoSpace` if `out` is shorter than
    /// [`MAX_LINE_LEN`]; a line is never truncated.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, TtpError> {
        if self.tracer.is_armed() {
            return Err(TtpError::Busy);
        }
        if out.len() < MAX_LINE_LEN {
            return Err(TtpError::NoSpace);
        }

        match self.next_line()? {
            Some(line) => {
                let bytes = line.as_bytes();
                out[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            None => Ok(0),
        }
    }
}

impl<C, U> Iterator for DrainSession<'_, C, U> {
    type Item = Result<LineBuf, TtpError>;

    /// Yields lines until end of data; an error is yielded once and then
    /// the iterator is finished.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = self.next_line().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

// =============================================================================
// Line buffer
// =============================================================================

/// Stack buffer holding one formatted line.
#[derive(Clone, Copy)]
pub struct LineBuf {
    bytes: [u8; MAX_LINE_LEN],
    len: usize,
}

impl LineBuf {
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_LINE_LEN],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled through fmt::Write with whole `str`s
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for LineBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > MAX_LINE_LEN {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

impl fmt::Debug for LineBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LineBuf").field(&self.as_str()).finish()
    }
}

impl PartialEq<str> for LineBuf {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for LineBuf {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widest_line_fits_the_bound() {
        let drained = DrainedEvent {
            shard: u32::MAX as usize,
            event: TraceEvent::new(u32::MAX, u64::MAX),
        };
        let line = drained.to_line();
        assert_eq!(line, "4294967295,4294967295,18446744073709551615\n");
        assert!(line.len() < MAX_LINE_LEN);
    }

    #[test]
    fn line_buffer_refuses_overflow() {
        let mut line = LineBuf::new();
        let filler = [b'x'; MAX_LINE_LEN];
        let filler = core::str::from_utf8(&filler).unwrap();
        assert!(line.write_str(filler).is_ok());
        assert!(line.write_str("y").is_err());
        assert_eq!(line.len(), MAX_LINE_LEN);
    }

    #[test]
    fn fresh_cursor_starts_at_origin() {
        let cursor = DrainCursor::new();
        assert_eq!((cursor.shard_index(), cursor.event_index()), (0, 0));
        assert_eq!(cursor, DrainCursor::default());
    }
}
