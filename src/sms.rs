//! SMS segmentation
//!
//! A single SMS carries 160 characters of 7-bit text or 70 characters of
//! wider text. Longer messages are sent as concatenated parts, each of
//! which loses room to the concatenation header: 8 characters for 7-bit
//! text, 3 for wide text.
//!
//! Lengths are counted in characters (Unicode scalar values), not bytes.

/// Single-message limit for 7-bit text
pub const NARROW_SINGLE_LIMIT: usize = 160;
/// Single-message limit for wide text
pub const EXTENDED_SINGLE_LIMIT: usize = 70;

const NARROW_HEADER: usize = 8;
const EXTENDED_HEADER: usize = 3;

/// Character class of a message, which decides its size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsEncoding {
    /// Every character is 7-bit ASCII
    Narrow,
    /// At least one character outside 7-bit ASCII
    Extended,
}

impl SmsEncoding {
    /// Classify `text`. Characters beyond U+00FF are not rejected; they
    /// are simply treated as extended.
    pub fn detect(text: &str) -> Self {
        if text.is_ascii() {
            SmsEncoding::Narrow
        } else {
            SmsEncoding::Extended
        }
    }

    pub fn single_limit(self) -> usize {
        match self {
            SmsEncoding::Narrow => NARROW_SINGLE_LIMIT,
            SmsEncoding::Extended => EXTENDED_SINGLE_LIMIT,
        }
    }

    /// Characters per part of a concatenated message.
    pub fn part_size(self) -> usize {
        match self {
            SmsEncoding::Narrow => NARROW_SINGLE_LIMIT - NARROW_HEADER,
            SmsEncoding::Extended => EXTENDED_SINGLE_LIMIT - EXTENDED_HEADER,
        }
    }
}

/// A message split into transport units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsSegments {
    pub encoding: SmsEncoding,
    pub parts: Vec<String>,
}

impl SmsSegments {
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_concatenated(&self) -> bool {
        self.parts.len() > 1
    }
}

/// Split `text` into parts.
///
/// Text within the single-message limit is returned unchanged as one part.
/// Anything longer, even by one character, is cut into parts of
/// [`SmsEncoding::part_size`] characters with a shorter final part for the
/// remainder. Empty text yields no parts.
///
/// ```
/// use ami_gsm::sms::{segment, SmsEncoding};
///
/// let segments = segment(&"a".repeat(161));
///
/// assert_eq!(segments.encoding, SmsEncoding::Narrow);
/// assert_eq!(segments.parts[0].len(), 152);
/// assert_eq!(segments.parts[1].len(), 9);
/// ```
pub fn segment(text: &str) -> SmsSegments {
    let encoding = SmsEncoding::detect(text);

    if text.is_empty() {
        return SmsSegments {
            encoding,
            parts: Vec::new(),
        };
    }

    let chars: Vec<char> = text.chars().collect();

    let parts = if chars.len() <= encoding.single_limit() {
        vec![text.to_string()]
    } else {
        chars
            .chunks(encoding.part_size())
            .map(|chunk| chunk.iter().collect())
            .collect()
    };

    SmsSegments { encoding, parts }
}
