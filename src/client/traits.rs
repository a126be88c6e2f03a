// ABOUTME: Core manager client traits using native async functions
// ABOUTME: Defines layered interfaces for connection management, login, GSM gateway and call control

use crate::action::Action;
use crate::client::error::AmiResult;
use crate::client::types::{Credentials, ReadySpan, ReadySpanPolicy, SmsMessage, SmsReceipt, Span};
use crate::event::ActionResponse;
use crate::message::Fields;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::net::ToSocketAddrs;

/// Base connection management for manager clients
///
/// Provides the connection lifecycle every client needs regardless of
/// which commands it issues.
pub trait AmiConnection {
    /// Establish a TCP connection to the PBX manager port
    ///
    /// The returned client is connected but not yet authenticated.
    async fn connect<T: ToSocketAddrs>(addr: T) -> AmiResult<Self>
    where
        Self: Sized;

    /// Close the connection
    ///
    /// Outstanding actions fail with `ConnectionClosed`.
    async fn disconnect(&self) -> AmiResult<()>;

    /// Check if connection is active
    ///
    /// Turns false once `disconnect` ran or the PBX closed the stream.
    fn is_connected(&self) -> bool;
}

/// Core manager operations
///
/// Authentication plus the raw action primitives the higher level traits
/// are built on. Methods take `&self` so several actions can be in flight
/// at once; responses are matched by ActionID.
pub trait AmiClient: AmiConnection {
    /// Log in to the PBX
    ///
    /// Succeeds on `Authentication accepted`, fails with `ProtocolRejected`
    /// on `Authentication failed` and with `Timeout` if neither arrives.
    async fn login(&self, credentials: &Credentials) -> AmiResult<()>;

    /// Whether a login has succeeded on this connection
    fn is_authenticated(&self) -> bool;

    /// Write an action without waiting for any response
    ///
    /// Fails with `EmptyInput` when the action has no fields.
    async fn send_action(&self, action: &Action) -> AmiResult<()>;

    /// Write an action and wait up to `timeout` for its response
    ///
    /// The action's own ActionID is used when it carries one; otherwise a
    /// fresh id is added.
    async fn request(&self, action: Action, timeout: Duration) -> AmiResult<ActionResponse>;
}

/// GSM gateway operations
///
/// All of them require an authenticated session and fail with
/// `NotAuthenticated` without touching the connection otherwise.
pub trait GsmGateway: AmiClient {
    /// List every span with its power, provisioning, card and activity status
    async fn gsm_show_spans(&self) -> AmiResult<BTreeMap<String, Span>>;

    /// Detailed status of one span, as the raw response fields
    async fn gsm_show_span(&self, span_id: &str) -> AmiResult<Fields>;

    /// Find a span in `READY` state using [`ReadySpanPolicy::FirstResponse`]
    async fn get_gsm_ready_span(&self) -> AmiResult<Option<ReadySpan>>;

    /// Find a span in `READY` state using the given policy
    async fn get_gsm_ready_span_with(&self, policy: ReadySpanPolicy) -> AmiResult<Option<ReadySpan>>;

    /// Send an SMS through a span, split into parts when needed
    ///
    /// Resolves when the PBX acknowledges the command. There is no delivery
    /// report.
    async fn gsm_send_sms(&self, message: &SmsMessage) -> AmiResult<SmsReceipt>;
}

/// Call control operations
pub trait CallControl: AmiClient {
    /// Ring `from` and connect it to `to` through `from`'s dial plan
    async fn dial(&self, from: &str, to: &str) -> AmiResult<ActionResponse>;

    /// `dial` with an explicit call timeout
    async fn dial_with_timeout(&self, from: &str, to: &str, timeout: Duration) -> AmiResult<ActionResponse>;

    /// Move `channel` into the dial plan of `to_tel`
    async fn redirect(&self, channel: &str, to_tel: &str) -> AmiResult<ActionResponse>;

    /// `redirect` with an explicit timeout
    async fn redirect_with_timeout(
        &self,
        channel: &str,
        to_tel: &str,
        timeout: Duration,
    ) -> AmiResult<ActionResponse>;
}
