//! Message block parsing
//!
//! A block is a sequence of `Name: Value` lines. Parsing is deliberately
//! lenient: the PBX mixes free text (greeting banner, command output) into
//! blocks, and such lines must not abort the parse.

use std::fmt;

/// Separator between a field name and its value.
pub const FIELD_SEPARATOR: &str = ": ";

/// Ordered field mapping of one message block.
///
/// Insertion order is kept. Inserting a name that is already present
/// overwrites the value in place, so the last write wins while the field
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// Case-insensitive lookup, used for protocol-level names such as
    /// `Event`, `Response` and `ActionID`. When several spellings are
    /// present the most recently inserted one wins.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.get_ignore_case(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}{FIELD_SEPARATOR}{value}\r\n")?;
        }
        Ok(())
    }
}

/// Parse one block into its fields.
///
/// Lines are split on `\n` and then once on `": "`; both halves are
/// trimmed, which also drops the `\r` of a CRLF line ending. Blank lines
/// are skipped. Any other line without the separator yields an empty name
/// with an empty value.
pub fn parse_fields(frame: &str) -> Fields {
    frame
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once(FIELD_SEPARATOR) {
            Some((name, value)) => (name.trim(), value.trim()),
            None => ("", ""),
        })
        .collect()
}

/// A received message block together with its parsed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The block as received, delimiter stripped
    pub raw: String,
    /// Fields parsed from `raw`
    pub fields: Fields,
}

impl Message {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let fields = parse_fields(&raw);

        Self { raw, fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_block() {
        let fields = parse_fields("Response: Success\r\nActionID: 42\r\nMessage: Command output follows");

        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("Response"), Some("Success"));
        assert_eq!(fields.get("ActionID"), Some("42"));
        assert_eq!(fields.get("Message"), Some("Command output follows"));
    }

    #[test]
    fn test_serialize_then_parse_restores_fields() {
        let original: Fields = [
            ("Event", "Newchannel"),
            ("Channel", "SIP/101-00000001"),
            ("CallerIDNum", "101"),
            ("Uniqueid", "1712345678.1"),
        ]
        .into_iter()
        .collect();

        assert_eq!(parse_fields(&original.to_string()), original);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let fields = parse_fields("  Event :   Hangup  \r\n\tCause: 16\r");

        assert_eq!(fields.get("Event"), Some("Hangup"));
        assert_eq!(fields.get("Cause"), Some("16"));
    }

    #[test]
    fn test_last_duplicate_wins_in_place() {
        let fields = parse_fields("A: 1\nB: 2\nA: 3");

        assert_eq!(fields.get("A"), Some("3"));
        let order: Vec<_> = fields.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn test_line_without_separator_yields_empty_entry() {
        let fields = parse_fields("Asterisk Call Manager/1.1\r\nResponse: Success");

        assert_eq!(fields.get(""), Some(""));
        assert_eq!(fields.get("Response"), Some("Success"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_blank_lines_add_no_entries() {
        let fields = parse_fields("Event: Hangup\r\n\r\n  \r\nCause: 16\r\n");

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get(""), None);
    }

    #[test]
    fn test_value_keeps_further_separators() {
        let fields = parse_fields("Output: key: value");

        assert_eq!(fields.get("Output"), Some("key: value"));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let fields = parse_fields("actionid: 5\r\nEVENT: Hangup");

        assert_eq!(fields.get("ActionID"), None);
        assert_eq!(fields.get_ignore_case("ActionID"), Some("5"));
        assert!(fields.contains_ignore_case("event"));
        assert!(!fields.contains_ignore_case("Response"));
    }

    #[test]
    fn test_insert_reports_previous_value() {
        let mut fields = Fields::new();

        assert_eq!(fields.insert("State", "READY"), None);
        assert_eq!(fields.insert("State", "DOWN"), Some("READY".to_string()));
        assert_eq!(fields.get("State"), Some("DOWN"));
    }

    #[test]
    fn test_message_keeps_raw_text() {
        let message = Message::parse("Event: FullyBooted");

        assert_eq!(message.raw, "Event: FullyBooted");
        assert_eq!(message.fields.get("Event"), Some("FullyBooted"));
    }
}
