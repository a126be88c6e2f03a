//! Outbound actions
//!
//! An action is an ordered list of `Name: Value` lines followed by an
//! empty line. Field names are sent exactly as given: the PBX matches them
//! case-insensitively, and the spellings used here follow what existing
//! deployments send.

use crate::message::{FIELD_SEPARATOR, Fields};
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Validity period (relative format) sent with every concatenated SMS part.
pub const CSMS_VALIDITY_PERIOD: u8 = 20;

/// Prefix of the per-caller dial plan contexts.
pub const DIAL_PLAN_CONTEXT_PREFIX: &str = "DLPN_DialPlan";

/// An outbound manager action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    fields: Fields,
}

impl Action {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append (or overwrite) a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name, value);
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The ActionID carried by this action, whatever its spelling.
    pub fn action_id(&self) -> Option<&str> {
        self.fields.get_ignore_case("ActionID")
    }

    /// Encode as wire text: one `Name: Value\r\n` line per field and a
    /// closing `\r\n`.
    pub fn encode(&self, buf: &mut BytesMut) {
        for (name, value) in self.fields.iter() {
            buf.put_slice(name.as_bytes());
            buf.put_slice(FIELD_SEPARATOR.as_bytes());
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// `action: login`
    pub fn login(username: &str, secret: &str) -> Self {
        Self::new()
            .field("action", "login")
            .field("username", username)
            .field("secret", secret)
    }

    /// CLI command used for span queries: `Action: command`.
    pub fn command(action_id: &str, command: &GsmCommand) -> Self {
        Self::new()
            .field("Action", "command")
            .field("ActionID", action_id)
            .field("command", command.to_string())
    }

    /// CLI command used for SMS submission: `action: command`.
    pub fn sms_command(action_id: &str, command: &GsmCommand) -> Self {
        Self::new()
            .field("action", "command")
            .field("actionId", action_id)
            .field("command", command.to_string())
    }

    /// Call `to` from the SIP peer `from` through the caller's dial plan.
    pub fn originate(from: &str, to: &str, timeout_ms: u128, action_id: &str) -> Self {
        Self::new()
            .field("action", "Originate")
            .field("channel", format!("SIP/{from}"))
            .field("context", format!("{DIAL_PLAN_CONTEXT_PREFIX}{from}"))
            .field("exten", to)
            .field("priority", "1")
            .field("async", "YES")
            .field("timeout", timeout_ms.to_string())
            .field("callerid", to)
            .field("actionId", action_id)
    }

    /// Move an existing channel into the dial plan of `to_tel`.
    pub fn redirect(channel: &str, to_tel: &str, action_id: &str) -> Self {
        Self::new()
            .field("action", "Redirect")
            .field("channel", channel)
            .field("exten", to_tel)
            .field("priority", "1")
            .field("context", format!("{DIAL_PLAN_CONTEXT_PREFIX}{to_tel}"))
            .field("extraPriority", "1")
            .field("actionId", action_id)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.fields)
    }
}

/// GSM gateway CLI commands carried inside a `command` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GsmCommand {
    ShowSpans,
    ShowSpan(String),
    SendSms {
        span: String,
        destination: String,
        text: String,
    },
    /// One part of a concatenated SMS
    SendCsms {
        span: String,
        destination: String,
        text: String,
        reference: CsmsReference,
        total: usize,
        sequence: usize,
    },
}

impl fmt::Display for GsmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GsmCommand::ShowSpans => write!(f, "gsm show spans"),
            GsmCommand::ShowSpan(span) => write!(f, "gsm show span {span}"),
            GsmCommand::SendSms {
                span,
                destination,
                text,
            } => write!(f, "gsm send sms {span} {destination} \"{text}\""),
            GsmCommand::SendCsms {
                span,
                destination,
                text,
                reference,
                total,
                sequence,
            } => write!(
                f,
                "gsm send sync csms {span} {destination} \"{text}\" {reference} {total} {sequence} {CSMS_VALIDITY_PERIOD}"
            ),
        }
    }
}

/// Three digit reference tying the parts of a concatenated SMS together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsmsReference(u16);

impl CsmsReference {
    pub fn random() -> Self {
        Self(rand::rng().random_range(0..1000))
    }

    pub fn new(value: u16) -> Self {
        Self(value % 1000)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for CsmsReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Source of ActionIDs for one client.
///
/// Ids are `<prefix>-<counter>`: the counter makes them unique within the
/// client, the random prefix keeps two clients talking to the same PBX
/// from producing identical ids.
#[derive(Debug)]
pub struct ActionIdGenerator {
    prefix: u32,
    next: AtomicU64,
}

impl Default for ActionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionIdGenerator {
    pub fn new() -> Self {
        Self::with_prefix(rand::rng().random())
    }

    pub fn with_prefix(prefix: u32) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> String {
        let sequence = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{:08x}-{sequence}", self.prefix)
    }
}
