//! Manager protocol frame reassembly
//!
//! The manager protocol is line oriented: a message block is a run of
//! `Field: Value\r\n` lines closed by an empty line, so every block on the
//! wire ends with `\r\n\r\n`. TCP gives no guarantee that a read returns a
//! whole block (or only one), so incoming bytes are accumulated here and
//! complete blocks are cut out as soon as their terminator has arrived.

use bytes::{Buf, BytesMut};

/// Terminator closing every message block.
pub const DELIMITER: &[u8; 4] = b"\r\n\r\n";

/// Buffers stream bytes and yields complete message blocks.
///
/// One accumulator belongs to exactly one connection. A new connection
/// starts with a new, empty accumulator.
///
/// # Example
///
/// ```
/// use ami_gsm::frame::FrameAccumulator;
///
/// let mut accumulator = FrameAccumulator::new();
///
/// assert!(accumulator.feed(b"Response: Success\r\n\r").is_empty());
/// let frames = accumulator.feed(b"\n");
///
/// assert_eq!(frames, vec!["Response: Success".to_string()]);
/// ```
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: BytesMut,
    // Offset up to which the buffer is known not to contain a delimiter.
    scanned: usize,
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAccumulator {
    /// Create an empty accumulator with a 4KB buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            scanned: 0,
        }
    }

    /// Append `chunk` and return every block completed by it, in order.
    ///
    /// The delimiter itself is dropped and each block is trimmed of
    /// surrounding whitespace. Blocks that are empty after trimming are
    /// swallowed. A delimiter split across two calls is still recognised.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();

        while let Some(end) = self.find_delimiter() {
            let block = self.buffer.split_to(end);
            self.buffer.advance(DELIMITER.len());
            self.scanned = 0;

            if let Some(frame) = decode_block(&block) {
                frames.push(frame);
            }
        }

        // A partial delimiter may sit at the tail; rescan those bytes next time.
        self.scanned = self.buffer.len().saturating_sub(DELIMITER.len() - 1);

        frames
    }

    /// Number of buffered bytes not yet part of a complete block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received block.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    fn find_delimiter(&self) -> Option<usize> {
        self.buffer[self.scanned..]
            .windows(DELIMITER.len())
            .position(|window| window == DELIMITER)
            .map(|position| position + self.scanned)
    }
}

fn decode_block(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let text = text.trim();

    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "Asterisk Call Manager/1.1\r\nResponse: Success\r\nMessage: Authentication accepted\r\n\r\nEvent: FullyBooted\r\nStatus: Fully Booted\r\n\r\nResponse: Success\r\nActionID: 7\r\n\r\n";

    fn feed_in_pieces(input: &[u8], splits: &[usize]) -> Vec<String> {
        let mut accumulator = FrameAccumulator::new();
        let mut frames = Vec::new();
        let mut start = 0;

        for &split in splits {
            frames.extend(accumulator.feed(&input[start..split]));
            start = split;
        }
        frames.extend(accumulator.feed(&input[start..]));

        frames
    }

    #[test]
    fn test_single_feed_emits_all_frames() {
        let frames = FrameAccumulator::new().feed(STREAM.as_bytes());

        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("Asterisk Call Manager/1.1"));
        assert_eq!(frames[1], "Event: FullyBooted\r\nStatus: Fully Booted");
        assert_eq!(frames[2], "Response: Success\r\nActionID: 7");
    }

    #[test]
    fn test_any_single_split_matches_single_feed() {
        let input = STREAM.as_bytes();
        let expected = FrameAccumulator::new().feed(input);

        for split in 0..=input.len() {
            assert_eq!(feed_in_pieces(input, &[split]), expected, "split at {split}");
        }
    }

    #[test]
    fn test_byte_by_byte_matches_single_feed() {
        let input = STREAM.as_bytes();
        let expected = FrameAccumulator::new().feed(input);
        let splits: Vec<usize> = (1..input.len()).collect();

        assert_eq!(feed_in_pieces(input, &splits), expected);
    }

    #[test]
    fn test_delimiter_straddling_calls() {
        let mut accumulator = FrameAccumulator::new();

        assert!(accumulator.feed(b"Event: Hangup\r").is_empty());
        assert!(accumulator.feed(b"\n\r").is_empty());
        assert_eq!(accumulator.feed(b"\nEvent"), vec!["Event: Hangup".to_string()]);
        assert_eq!(accumulator.pending(), "Event".len());
    }

    #[test]
    fn test_delimiter_not_retained() {
        let frames = FrameAccumulator::new().feed(b"A: 1\r\n\r\nB: 2\r\n\r\n");

        assert_eq!(frames, vec!["A: 1".to_string(), "B: 2".to_string()]);
        assert!(frames.iter().all(|f| !f.contains("\r\n\r\n")));
    }

    #[test]
    fn test_whitespace_only_blocks_are_skipped() {
        let mut accumulator = FrameAccumulator::new();

        assert!(accumulator.feed(b"\r\n\r\n").is_empty());
        assert!(accumulator.feed(b"   \t\r\n\r\n").is_empty());
        assert!(accumulator.feed(b"\r\n\r\n\r\n").is_empty());
        assert_eq!(accumulator.feed(b"X: y\r\n\r\n"), vec!["X: y".to_string()]);
    }

    #[test]
    fn test_incomplete_block_stays_buffered() {
        let mut accumulator = FrameAccumulator::new();

        assert!(accumulator.feed(b"Response: Follows\r\n").is_empty());
        assert_eq!(accumulator.pending(), 19);

        accumulator.clear();
        assert_eq!(accumulator.pending(), 0);
        assert!(accumulator.feed(b"\r\n").is_empty());
    }

    #[test]
    fn test_multibyte_text_survives_reassembly() {
        let input = "Message: привет\r\n\r\n".as_bytes();
        let splits: Vec<usize> = (1..input.len()).collect();

        assert_eq!(feed_in_pieces(input, &splits), vec!["Message: привет".to_string()]);
    }
}
