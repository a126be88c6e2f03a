// ABOUTME: Supporting types for manager client operations including credentials, spans and SMS requests
// ABOUTME: Provides simplified interfaces for common gateway operations with sensible defaults

use crate::event::ActionResponse;
use crate::message::Fields;
use crate::sms::SmsEncoding;
use std::collections::BTreeMap;
use std::time::Duration;

/// Manager login credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
    /// Overrides the configured login timeout
    pub timeout: Option<Duration>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Status of one GSM span as listed by `gsm show spans`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Span number, the digits after `GSM` in the field name
    pub id: String,
    pub power_status: String,
    pub provisioned: String,
    pub card_status: String,
    pub is_active: bool,
}

impl Span {
    /// Parse one `GSM<n>: <power>, <provisioned>, <card>, <activity>` field.
    ///
    /// Returns `None` when `name` is not `GSM` followed by digits. Missing
    /// positions in the value come out empty rather than failing.
    ///
    /// ```
    /// use ami_gsm::client::Span;
    ///
    /// let span = Span::parse("GSM3", "POWERON 220, PROVISIONED, OK, ACTIVE").unwrap();
    ///
    /// assert_eq!(span.id, "3");
    /// assert_eq!(span.power_status, "220");
    /// assert!(span.is_active);
    /// ```
    pub fn parse(name: &str, value: &str) -> Option<Span> {
        let id = name.strip_prefix("GSM")?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let parts: Vec<&str> = value
            .trim()
            .split(',')
            .map(|part| part.strip_prefix(char::is_whitespace).unwrap_or(part))
            .collect();
        let part = |index: usize| parts.get(index).copied().unwrap_or_default();

        Some(Span {
            id: id.to_string(),
            power_status: part(0).split(' ').nth(1).unwrap_or_default().to_string(),
            provisioned: part(1).to_string(),
            card_status: part(2).to_string(),
            is_active: part(3).to_lowercase() == "active",
        })
    }

    /// Collect every span field of a `gsm show spans` response, keyed by id.
    pub fn parse_all(fields: &Fields) -> BTreeMap<String, Span> {
        fields
            .iter()
            .filter_map(|(name, value)| Span::parse(name, value))
            .map(|span| (span.id.clone(), span))
            .collect()
    }
}

/// How a ready-span lookup picks its answer.
///
/// Span details are requested concurrently; the policies differ in which
/// answer they act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadySpanPolicy {
    /// The first detail to arrive decides. If that span is not `READY`
    /// the lookup yields nothing, even when a slower span would have been.
    #[default]
    FirstResponse,
    /// Wait for the first `READY` detail, or until every detail arrived.
    FirstReady,
}

/// A span whose detail reported `State: READY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadySpan {
    pub span_id: String,
    /// The full `gsm show span` response
    pub fields: Fields,
}

/// Outbound SMS
#[derive(Debug, Clone)]
pub struct SmsMessage {
    /// Message text; surrounding whitespace is dropped before sending
    pub text: String,
    /// Destination phone number
    pub destination: String,
    /// Span to send through
    pub span_id: String,
    /// Overrides the configured SMS timeout
    pub timeout: Option<Duration>,
    /// ActionID shared by all parts; generated when unset
    pub action_id: Option<String>,
}

impl SmsMessage {
    pub fn new(
        text: impl Into<String>,
        destination: impl Into<String>,
        span_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            destination: destination.into(),
            span_id: span_id.into(),
            timeout: None,
            action_id: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_action_id(mut self, action_id: impl Into<String>) -> Self {
        self.action_id = Some(action_id.into());
        self
    }
}

/// Acknowledgement of an SMS submission.
///
/// The PBX only confirms that it accepted the command. This is not a
/// delivery report.
#[derive(Debug, Clone)]
pub struct SmsReceipt {
    pub action_id: String,
    /// Number of transport parts the text was sent as
    pub parts: usize,
    pub encoding: SmsEncoding,
    pub response: ActionResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse_fields;

    #[test]
    fn test_span_example() {
        let span = Span::parse("GSM3", "POWERON 220, PROVISIONED, OK, ACTIVE").unwrap();

        assert_eq!(
            span,
            Span {
                id: "3".to_string(),
                power_status: "220".to_string(),
                provisioned: "PROVISIONED".to_string(),
                card_status: "OK".to_string(),
                is_active: true,
            }
        );
    }

    #[test]
    fn test_span_name_must_be_gsm_digits() {
        assert!(Span::parse("GSM", "POWERON 1, P, OK, ACTIVE").is_none());
        assert!(Span::parse("GSMx1", "POWERON 1, P, OK, ACTIVE").is_none());
        assert!(Span::parse("Response", "Success").is_none());
        assert!(Span::parse("GSM12", "POWERON 1, P, OK, ACTIVE").is_some());
    }

    #[test]
    fn test_span_tolerates_short_values() {
        let span = Span::parse("GSM1", "POWEROFF").unwrap();

        assert_eq!(span.power_status, "");
        assert_eq!(span.provisioned, "");
        assert!(!span.is_active);
    }

    #[test]
    fn test_activity_is_case_insensitive() {
        assert!(Span::parse("GSM1", "POWERON 1,P,OK,Active").unwrap().is_active);
        assert!(!Span::parse("GSM1", "POWERON 1, P, OK, INACTIVE").unwrap().is_active);
    }

    #[test]
    fn test_parse_all_selects_span_fields() {
        let fields = parse_fields(
            "Response: Success\r\nActionID: 1\r\nGSM1: POWERON 220, PROVISIONED, OK, ACTIVE\r\nGSM2: POWEROFF 0, NOT PROVISIONED, NO CARD, INACTIVE",
        );
        let spans = Span::parse_all(&fields);

        assert_eq!(spans.len(), 2);
        assert!(spans["1"].is_active);
        assert_eq!(spans["2"].provisioned, "NOT PROVISIONED");
        assert_eq!(spans["2"].card_status, "NO CARD");
    }
}
