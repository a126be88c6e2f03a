//! Message classification and signal dispatch
//!
//! A single block can mean several things at once: the greeting banner is
//! usually glued to the first response, and a response may also carry an
//! `Event` header. Classification therefore produces a *list* of signals
//! per message, and the [`Dispatcher`] hands every one of them to every
//! handler registered for its kind.

use crate::message::{Fields, Message};
use tracing::trace;

/// Banner the PBX sends when a connection is accepted.
pub const GREETING_BANNER: &str = "Asterisk Call Manager";

const LOGIN_ACCEPTED: &str = "authentication accepted";
const LOGIN_FAILED: &str = "authentication failed";

/// Asynchronous event pushed by the PBX (`Event:` header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerEvent {
    /// Value of the `Event` field
    pub kind: String,
    pub raw: String,
    pub fields: Fields,
}

/// Reply to an action (`Response:` header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Value of the `Response` field (`Success`, `Error`, `Follows`, ...)
    pub kind: String,
    pub raw: String,
    pub fields: Fields,
}

impl ActionResponse {
    /// Command output follows in the same block.
    pub fn is_follows(&self) -> bool {
        self.kind.eq_ignore_ascii_case("follows")
    }

    pub fn action_id(&self) -> Option<&str> {
        self.fields.get_ignore_case("ActionID")
    }
}

/// Kinds of signal a message can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Connected,
    LoginSuccess,
    LoginFail,
    Event,
    Response,
    ResponseFollows,
    Action,
    /// Raised once by the read loop when the stream ends
    Disconnected,
}

/// One meaning extracted from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Connected,
    LoginSuccess,
    LoginFail,
    Event(ManagerEvent),
    Response(ActionResponse),
    ResponseFollows(ActionResponse),
    /// A response scoped to the action that carried `action_id`
    Action {
        action_id: String,
        response: ActionResponse,
    },
    Disconnected,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Connected => SignalKind::Connected,
            Signal::LoginSuccess => SignalKind::LoginSuccess,
            Signal::LoginFail => SignalKind::LoginFail,
            Signal::Event(_) => SignalKind::Event,
            Signal::Response(_) => SignalKind::Response,
            Signal::ResponseFollows(_) => SignalKind::ResponseFollows,
            Signal::Action { .. } => SignalKind::Action,
            Signal::Disconnected => SignalKind::Disconnected,
        }
    }
}

/// Derive every signal `message` carries, in a fixed order.
pub fn classify(message: &Message) -> Vec<Signal> {
    let mut signals = Vec::new();
    let fields = &message.fields;

    if starts_with_banner(&message.raw) {
        signals.push(Signal::Connected);
    }

    if let Some(text) = fields.get_ignore_case("Message") {
        if text.eq_ignore_ascii_case(LOGIN_ACCEPTED) {
            signals.push(Signal::LoginSuccess);
        } else if text.eq_ignore_ascii_case(LOGIN_FAILED) {
            signals.push(Signal::LoginFail);
        }
    }

    if let Some(kind) = fields.get_ignore_case("Event") {
        signals.push(Signal::Event(ManagerEvent {
            kind: kind.to_string(),
            raw: message.raw.clone(),
            fields: fields.clone(),
        }));
    }

    if let Some(kind) = fields.get_ignore_case("Response") {
        let response = ActionResponse {
            kind: kind.to_string(),
            raw: message.raw.clone(),
            fields: fields.clone(),
        };

        signals.push(Signal::Response(response.clone()));

        if response.is_follows() {
            signals.push(Signal::ResponseFollows(response.clone()));
        }

        if let Some(action_id) = response.action_id() {
            signals.push(Signal::Action {
                action_id: action_id.to_string(),
                response,
            });
        }
    }

    signals
}

fn starts_with_banner(raw: &str) -> bool {
    raw.get(..GREETING_BANNER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(GREETING_BANNER))
}

type Handler = Box<dyn Fn(&Signal) + Send + Sync>;

/// Fans signals out to registered handlers.
///
/// Several handlers may listen to the same kind; all of them run, in
/// registration order.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<(SignalKind, Handler)>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for signals of `kind`.
    pub fn on<F>(&mut self, kind: SignalKind, handler: F) -> &mut Self
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
        self
    }

    /// Run every matching handler for every signal. Returns the number of
    /// handler invocations.
    pub fn dispatch(&self, signals: &[Signal]) -> usize {
        let mut invoked = 0;

        for signal in signals {
            let kind = signal.kind();
            let mut matched = false;

            for (_, handler) in self.handlers.iter().filter(|(k, _)| *k == kind) {
                handler(signal);
                matched = true;
                invoked += 1;
            }

            if !matched {
                trace!(?kind, "no handler registered");
            }
        }

        invoked
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.handlers.iter().map(|(kind, _)| kind).collect();
        f.debug_struct("Dispatcher").field("handlers", &kinds).finish()
    }
}
