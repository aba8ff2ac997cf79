// MIT License - Copyright (c) 2026 Peter Wright
// Line framing for the inbound byte stream

use tracing::error;

use crate::constants::{CANONICAL_DELIMITER, INBOUND_DELIMITERS, MAX_BUFFER_BYTES};
use crate::error::{AlarmError, Result};

/// Splits the panel's byte stream into text frames.
///
/// All four accepted line endings (`\n`, `\n\r`, `\r\n`, `\r`) are rewritten
/// to `\n` before splitting. Bytes after the last delimiter are kept until the
/// next [`push`](Self::push).
#[derive(Debug)]
pub struct Framer {
    buffer: Vec<u8>,
    limit: usize,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub fn new() -> Self {
        Self::with_limit(MAX_BUFFER_BYTES)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
        }
    }

    /// Append received bytes and return every complete, non-empty frame.
    ///
    /// Empty frames are dropped rather than returned for acking: a `\r\n`
    /// split across two reads normalizes to two delimiters, and the blank line
    /// between them was never sent by the panel.
    ///
    /// If the data contains no delimiter and the pending buffer grows past the
    /// limit, the buffer is discarded and [`AlarmError::BufferOverflow`] is
    /// returned.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(data);
        self.buffer = normalize_delimiters(&self.buffer);

        let mut frames = Vec::new();
        let mut start = 0;
        for i in 0..self.buffer.len() {
            if self.buffer[i] == CANONICAL_DELIMITER {
                let line = &self.buffer[start..i];
                if !line.is_empty() {
                    frames.push(String::from_utf8_lossy(line).into_owned());
                }
                start = i + 1;
            }
        }
        self.buffer.drain(..start);

        if frames.is_empty() && self.buffer.len() > self.limit {
            let pending = self.buffer.len();
            self.buffer.clear();
            error!(pending, limit = self.limit, "Frame buffer overflow, discarding");
            return Err(AlarmError::BufferOverflow { limit: self.limit });
        }

        Ok(frames)
    }

    /// Bytes held back waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Rewrite every accepted delimiter variant to the canonical `\n`.
///
/// Two-byte forms are matched before single-byte ones, so `\r\n` and `\n\r`
/// each become a single `\n`.
fn normalize_delimiters(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    'outer: while i < data.len() {
        for delim in INBOUND_DELIMITERS {
            if data[i..].starts_with(delim) {
                out.push(CANONICAL_DELIMITER);
                i += delim.len();
                continue 'outer;
            }
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_frames() {
        let mut framer = Framer::new();
        let frames = framer.push(b"ZO5\r\nZC5\r\n").unwrap();
        assert_eq!(frames, vec!["ZO5", "ZC5"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_every_delimiter_form() {
        for input in [
            &b"ZO5\nZC5\n"[..],
            b"ZO5\n\rZC5\n\r",
            b"ZO5\r\nZC5\r\n",
            b"ZO5\rZC5\r",
            b"ZO5\rZC5\r\n",
        ] {
            let mut framer = Framer::new();
            assert_eq!(framer.push(input).unwrap(), vec!["ZO5", "ZC5"], "input {input:?}");
        }
    }

    #[test]
    fn test_partial_frame_is_kept() {
        let mut framer = Framer::new();
        assert!(framer.push(b"ZO").unwrap().is_empty());
        assert_eq!(framer.pending(), 2);
        assert_eq!(framer.push(b"5\nRO").unwrap(), vec!["ZO5"]);
        assert_eq!(framer.push(b"1\n").unwrap(), vec!["RO1"]);
    }

    #[test]
    fn test_split_two_byte_delimiter_yields_no_empty_frame() {
        let mut framer = Framer::new();
        assert_eq!(framer.push(b"ZO5\r").unwrap(), vec!["ZO5"]);
        assert!(framer.push(b"\nZC5\r").unwrap().len() == 1);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let mut framer = Framer::new();
        assert_eq!(framer.push(b"\n\n\nOK STATUS\n\n").unwrap(), vec!["OK STATUS"]);
    }

    #[test]
    fn test_overflow_discards_buffer() {
        let mut framer = Framer::new();
        let junk = vec![b'X'; MAX_BUFFER_BYTES + 1];
        assert!(matches!(
            framer.push(&junk),
            Err(AlarmError::BufferOverflow { limit: MAX_BUFFER_BYTES })
        ));
        assert_eq!(framer.pending(), 0);
        // The framer keeps working after an overflow.
        assert_eq!(framer.push(b"ZO1\n").unwrap(), vec!["ZO1"]);
    }

    #[test]
    fn test_overflow_accumulated_across_reads() {
        let mut framer = Framer::with_limit(16);
        assert!(framer.push(b"0123456789").unwrap().is_empty());
        assert!(framer.push(b"0123456789").is_err());
    }

    #[test]
    fn test_at_limit_is_not_overflow() {
        let mut framer = Framer::with_limit(8);
        assert!(framer.push(b"01234567").unwrap().is_empty());
        assert_eq!(framer.pending(), 8);
    }
}
