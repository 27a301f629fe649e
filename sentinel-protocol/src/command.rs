//! Byte-at-a-time line command decoder
//!
//! Bytes are accumulated until a line terminator (`\n` or `\r`). The
//! completed line is matched exactly against [`COMMAND_TABLE`] and the
//! accumulator is reset for the next line.
//!
//! The accumulator holds at most `N - 1` bytes (one slot stays reserved for
//! the terminator). Bytes past that are discarded until the next terminator,
//! which then matches whatever was kept: with `N = 4`, `INVALID` is read as
//! `INV`.

use heapless::Vec;

/// Reference accumulator size
pub const DEFAULT_LINE_CAPACITY: usize = 16;

/// Decoded command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Invert the display
    Invert,
    /// Return the display to normal
    Normal,
    /// Liveness check
    Ping,
}

/// Exact token to command mapping
pub const COMMAND_TABLE: &[(&[u8], Command)] = &[
    (b"INV", Command::Invert),
    (b"NORM", Command::Normal),
    (b"PING", Command::Ping),
];

impl Command {
    /// Look up an exact, case-sensitive token
    pub fn from_token(token: &[u8]) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(t, _)| *t == token)
            .map(|&(_, cmd)| cmd)
    }

    /// Wire token for this command
    pub fn token(self) -> &'static str {
        match self {
            Command::Invert => "INV",
            Command::Normal => "NORM",
            Command::Ping => "PING",
        }
    }
}

/// Returns true for either accepted line terminator
#[inline]
pub fn is_terminator(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// Line accumulator and matcher
///
/// Single-threaded; may be fed from several byte sources in the same loop
/// iteration, but interleaving bytes of two sources mid-line is the
/// caller's problem.
#[derive(Debug, Clone)]
pub struct CommandDecoder<const N: usize = DEFAULT_LINE_CAPACITY> {
    line: Vec<u8, N>,
}

impl<const N: usize> Default for CommandDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CommandDecoder<N> {
    /// Create an empty decoder
    pub const fn new() -> Self {
        Self { line: Vec::new() }
    }

    /// Feed one byte
    ///
    /// Returns `Some(command)` when a terminator completes a line that
    /// matches the table exactly, `None` otherwise (including while a line
    /// is still being accumulated).
    pub fn feed(&mut self, byte: u8) -> Option<Command> {
        if is_terminator(byte) {
            let result = Command::from_token(&self.line);
            self.reset();
            return result;
        }

        if self.line.len() < N.saturating_sub(1) {
            // Cannot fail: length checked against capacity above
            let _ = self.line.push(byte);
        }

        None
    }

    /// Feed a slice, returning the first command completed
    ///
    /// Bytes after that command's terminator are not consumed; the returned
    /// count says how many were.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Option<Command>) {
        for (i, &byte) in bytes.iter().enumerate() {
            if let Some(cmd) = self.feed(byte) {
                return (i + 1, Some(cmd));
            }
        }
        (bytes.len(), None)
    }

    /// Bytes accumulated on the current line
    pub fn pending(&self) -> usize {
        self.line.len()
    }

    /// Drop the current line
    pub fn reset(&mut self) {
        self.line.clear();
    }
}
