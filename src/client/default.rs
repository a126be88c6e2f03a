// ABOUTME: Default manager client implementation providing complete trait implementations
// ABOUTME: Wires the read loop signals to session state, response correlation and event subscribers

use crate::action::{Action, ActionIdGenerator, CsmsReference, GsmCommand};
use crate::client::config::ClientConfig;
use crate::client::error::{AmiError, AmiResult};
use crate::client::traits::{AmiClient, AmiConnection, CallControl, GsmGateway};
use crate::client::types::{Credentials, ReadySpan, ReadySpanPolicy, SmsMessage, SmsReceipt, Span};
use crate::connection::Connection;
use crate::correlator::{Correlator, LoginOutcome};
use crate::event::{ActionResponse, Dispatcher, ManagerEvent, Signal, SignalKind};
use crate::message::Fields;
use crate::session::{Session, SessionState};
use crate::sms::segment;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

/// `State` value of a span that can take an SMS or a call.
pub const READY_STATE: &str = "READY";

/// Default manager client implementation
///
/// Implements every client trait over one connection. The client is a
/// cheap handle: clones share the connection, the session and the table
/// of outstanding actions, so it can be handed to several tasks.
///
/// A client belongs to exactly one connection. Reconnecting means
/// building a new client, which starts unauthenticated with empty buffers.
#[derive(Debug, Clone)]
pub struct DefaultClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    connection: Connection,
    session: Arc<Session>,
    correlator: Arc<Correlator>,
    ids: ActionIdGenerator,
    config: ClientConfig,
    events: broadcast::Sender<ManagerEvent>,
    responses: broadcast::Sender<ActionResponse>,
    greeted: watch::Receiver<bool>,
}

impl DefaultClient {
    /// Connect to `addr` with a custom configuration
    pub async fn connect_with_config<T: ToSocketAddrs>(addr: T, config: ClientConfig) -> AmiResult<Self> {
        let socket = TcpStream::connect(addr).await?;
        if let Ok(peer) = socket.peer_addr() {
            info!(%peer, "Connected to PBX");
        }

        Ok(Self::from_stream(socket, config))
    }

    /// Run the manager protocol over an already established stream.
    ///
    /// Must be called from within a tokio runtime: the read loop is spawned
    /// immediately.
    pub fn from_stream<S>(stream: S, config: ClientConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let session = Arc::new(Session::new());
        let correlator = Arc::new(Correlator::new());
        // `broadcast::channel` rejects a zero capacity.
        let capacity = config.event_capacity.max(1);
        let (events, _) = broadcast::channel(capacity);
        let (responses, _) = broadcast::channel(capacity);
        let (greeted_tx, greeted) = watch::channel(false);

        let dispatcher = build_dispatcher(&session, &correlator, &events, &responses, greeted_tx);
        let connection = Connection::new(stream, dispatcher);

        DefaultClient {
            inner: Arc::new(Inner {
                connection,
                session,
                correlator,
                ids: ActionIdGenerator::new(),
                config,
                events,
                responses,
                greeted,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.state()
    }

    /// Number of actions still waiting for their response
    pub fn pending_actions(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Receive every asynchronous event the PBX pushes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.inner.events.subscribe()
    }

    /// Receive every response from now on, correlated or not
    pub fn subscribe_responses(&self) -> broadcast::Receiver<ActionResponse> {
        self.inner.responses.subscribe()
    }

    /// Wait until the greeting banner has been received
    pub async fn wait_connected(&self, timeout: Duration) -> AmiResult<()> {
        let mut greeted = self.inner.greeted.clone();

        match tokio::time::timeout(timeout, greeted.wait_for(|greeted| *greeted)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(AmiError::ConnectionClosed),
            Err(_) => Err(AmiError::Timeout("wait_connected")),
        }
    }
}

fn build_dispatcher(
    session: &Arc<Session>,
    correlator: &Arc<Correlator>,
    events: &broadcast::Sender<ManagerEvent>,
    responses: &broadcast::Sender<ActionResponse>,
    greeted: watch::Sender<bool>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();

    dispatcher.on(SignalKind::Connected, move |_| {
        debug!("Greeting received");
        greeted.send_replace(true);
    });

    let (login, session) = (correlator.clone(), session.clone());
    dispatcher.on(SignalKind::LoginSuccess, move |_| {
        login.complete_login(LoginOutcome::Accepted, || {
            session.authenticate();
        });
    });

    let login = correlator.clone();
    dispatcher.on(SignalKind::LoginFail, move |_| {
        login.complete_login(LoginOutcome::Rejected, || {});
    });

    let events = events.clone();
    dispatcher.on(SignalKind::Event, move |signal| {
        if let Signal::Event(event) = signal {
            trace!(kind = %event.kind, "Event");
            // No subscribers is fine.
            let _ = events.send(event.clone());
        }
    });

    let responses = responses.clone();
    dispatcher.on(SignalKind::Response, move |signal| {
        if let Signal::Response(response) = signal {
            let _ = responses.send(response.clone());
        }
    });

    dispatcher.on(SignalKind::ResponseFollows, |signal| {
        if let Signal::ResponseFollows(response) = signal {
            trace!(action_id = ?response.action_id(), "Command output follows");
        }
    });

    let pending = correlator.clone();
    dispatcher.on(SignalKind::Action, move |signal| {
        if let Signal::Action {
            action_id,
            response,
        } = signal
        {
            pending.resolve(action_id, response.clone());
        }
    });

    let pending = correlator.clone();
    dispatcher.on(SignalKind::Disconnected, move |_| {
        pending.close();
    });

    dispatcher
}

impl Inner {
    /// Register, write, wait. The waiter is registered before the write so
    /// a fast response cannot slip past it.
    async fn issue(
        &self,
        action: &Action,
        action_id: &str,
        wait: Duration,
        operation: &'static str,
    ) -> AmiResult<ActionResponse> {
        let pending = self.correlator.register(action_id)?;
        self.connection.write_action(action).await?;
        debug!(operation, action_id, "Action sent");

        pending.wait(wait, operation).await
    }

    async fn show_spans(&self) -> AmiResult<BTreeMap<String, Span>> {
        self.session.require_authenticated("gsm_show_spans")?;

        let action_id = self.ids.next_id();
        let action = Action::command(&action_id, &GsmCommand::ShowSpans);
        let response = self
            .issue(&action, &action_id, self.config.command_timeout, "gsm_show_spans")
            .await?;

        Ok(Span::parse_all(&response.fields))
    }

    async fn show_span(&self, span_id: &str) -> AmiResult<Fields> {
        self.session.require_authenticated("gsm_show_span")?;

        let action_id = self.ids.next_id();
        let action = Action::command(&action_id, &GsmCommand::ShowSpan(span_id.to_string()));
        let response = self
            .issue(&action, &action_id, self.config.command_timeout, "gsm_show_span")
            .await?;

        Ok(response.fields)
    }

    async fn ready_span(self: &Arc<Self>, policy: ReadySpanPolicy) -> AmiResult<Option<ReadySpan>> {
        let spans = self.show_spans().await?;

        // Span ids are queried in descending lexicographic order.
        let mut details = JoinSet::new();
        for span_id in spans.into_keys().rev() {
            let inner = Arc::clone(self);
            details.spawn(async move {
                let detail = inner.show_span(&span_id).await;
                (span_id, detail)
            });
        }

        let lookup = async {
            while let Some(joined) = details.join_next().await {
                let Ok((span_id, detail)) = joined else {
                    continue;
                };

                let ready = match detail {
                    Ok(fields) if fields.get_ignore_case("State") == Some(READY_STATE) => {
                        Some(ReadySpan { span_id, fields })
                    }
                    Ok(_) => {
                        debug!(span = %span_id, "Span not ready");
                        None
                    }
                    // A failed detail counts as "not ready".
                    Err(e) => {
                        debug!(span = %span_id, "Span detail failed: {e}");
                        None
                    }
                };

                match (ready, policy) {
                    (Some(span), _) => return Some(span),
                    (None, ReadySpanPolicy::FirstResponse) => return None,
                    (None, ReadySpanPolicy::FirstReady) => continue,
                }
            }
            None
        };

        // Dropping `details` afterwards aborts the detail requests still
        // running, which releases their waiters.
        tokio::time::timeout(self.config.ready_span_deadline, lookup)
            .await
            .map_err(|_| AmiError::Timeout("get_gsm_ready_span"))
    }

    async fn send_sms(&self, message: &SmsMessage) -> AmiResult<SmsReceipt> {
        self.session.require_authenticated("gsm_send_sms")?;

        let segments = segment(message.text.trim());
        if segments.is_empty() {
            return Err(AmiError::InvalidArgument(
                "gsm_send_sms: message text is empty".to_string(),
            ));
        }

        let action_id = message
            .action_id
            .clone()
            .unwrap_or_else(|| self.ids.next_id());

        let actions: Vec<Action> = if segments.is_concatenated() {
            let reference = CsmsReference::random();
            let total = segments.len();

            segments
                .parts
                .iter()
                .enumerate()
                .map(|(index, part)| {
                    let command = GsmCommand::SendCsms {
                        span: message.span_id.clone(),
                        destination: message.destination.clone(),
                        text: part.clone(),
                        reference,
                        total,
                        sequence: index + 1,
                    };
                    Action::sms_command(&action_id, &command)
                })
                .collect()
        } else {
            let command = GsmCommand::SendSms {
                span: message.span_id.clone(),
                destination: message.destination.clone(),
                text: segments.parts[0].clone(),
            };
            vec![Action::sms_command(&action_id, &command)]
        };

        let pending = self.correlator.register(&action_id)?;
        self.connection.write_actions(&actions).await?;
        info!(
            action_id = %action_id,
            span = %message.span_id,
            parts = segments.len(),
            encoding = ?segments.encoding,
            "SMS submitted"
        );

        let wait = message.timeout.unwrap_or(self.config.sms_timeout);
        let response = pending.wait(wait, "gsm_send_sms").await?;

        Ok(SmsReceipt {
            action_id,
            parts: segments.len(),
            encoding: segments.encoding,
            response,
        })
    }

    async fn dial(&self, from: &str, to: &str, timeout: Duration) -> AmiResult<ActionResponse> {
        self.session.require_authenticated("dial")?;
        require_non_empty("dial", "from", from)?;
        require_non_empty("dial", "to", to)?;

        let action_id = self.ids.next_id();
        let action = Action::originate(from, to, timeout.as_millis(), &action_id);

        self.issue(&action, &action_id, self.config.call_wait(timeout), "dial")
            .await
    }

    async fn redirect(&self, channel: &str, to_tel: &str, timeout: Duration) -> AmiResult<ActionResponse> {
        self.session.require_authenticated("redirect")?;
        require_non_empty("redirect", "channel", channel)?;
        require_non_empty("redirect", "to_tel", to_tel)?;

        let action_id = self.ids.next_id();
        let action = Action::redirect(channel, to_tel, &action_id);

        self.issue(&action, &action_id, self.config.call_wait(timeout), "redirect")
            .await
    }
}

fn require_non_empty(operation: &str, name: &str, value: &str) -> AmiResult<()> {
    if value.is_empty() {
        return Err(AmiError::InvalidArgument(format!(
            "{operation}: {name} must not be empty"
        )));
    }
    Ok(())
}

impl AmiConnection for DefaultClient {
    async fn connect<T: ToSocketAddrs>(addr: T) -> AmiResult<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    async fn disconnect(&self) -> AmiResult<()> {
        info!("Disconnecting from PBX");
        self.inner.connection.close().await
    }

    fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }
}

impl AmiClient for DefaultClient {
    async fn login(&self, credentials: &Credentials) -> AmiResult<()> {
        let pending = self.inner.correlator.register_login()?;

        let action = Action::login(&credentials.username, &credentials.secret);
        self.inner.connection.write_action(&action).await?;

        let wait = credentials.timeout.unwrap_or(self.inner.config.login_timeout);
        match pending.wait(wait).await? {
            LoginOutcome::Accepted => {
                info!(username = %credentials.username, "Logged in");
                Ok(())
            }
            LoginOutcome::Rejected => Err(AmiError::ProtocolRejected(format!(
                "login: authentication failed for {}",
                credentials.username
            ))),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    async fn send_action(&self, action: &Action) -> AmiResult<()> {
        if action.is_empty() {
            return Err(AmiError::EmptyInput);
        }
        self.inner.connection.write_action(action).await
    }

    async fn request(&self, action: Action, timeout: Duration) -> AmiResult<ActionResponse> {
        if action.is_empty() {
            return Err(AmiError::EmptyInput);
        }

        let (action, action_id) = match action.action_id().map(str::to_string) {
            Some(action_id) => (action, action_id),
            None => {
                let action_id = self.inner.ids.next_id();
                (action.field("ActionID", action_id.as_str()), action_id)
            }
        };

        self.inner.issue(&action, &action_id, timeout, "request").await
    }
}

impl GsmGateway for DefaultClient {
    async fn gsm_show_spans(&self) -> AmiResult<BTreeMap<String, Span>> {
        self.inner.show_spans().await
    }

    async fn gsm_show_span(&self, span_id: &str) -> AmiResult<Fields> {
        self.inner.show_span(span_id).await
    }

    async fn get_gsm_ready_span(&self) -> AmiResult<Option<ReadySpan>> {
        self.inner.ready_span(ReadySpanPolicy::default()).await
    }

    async fn get_gsm_ready_span_with(&self, policy: ReadySpanPolicy) -> AmiResult<Option<ReadySpan>> {
        self.inner.ready_span(policy).await
    }

    async fn gsm_send_sms(&self, message: &SmsMessage) -> AmiResult<SmsReceipt> {
        self.inner.send_sms(message).await
    }
}

impl CallControl for DefaultClient {
    async fn dial(&self, from: &str, to: &str) -> AmiResult<ActionResponse> {
        self.inner.dial(from, to, self.inner.config.call_timeout).await
    }

    async fn dial_with_timeout(&self, from: &str, to: &str, timeout: Duration) -> AmiResult<ActionResponse> {
        self.inner.dial(from, to, timeout).await
    }

    async fn redirect(&self, channel: &str, to_tel: &str) -> AmiResult<ActionResponse> {
        self.inner
            .redirect(channel, to_tel, self.inner.config.call_timeout)
            .await
    }

    async fn redirect_with_timeout(
        &self,
        channel: &str,
        to_tel: &str,
        timeout: Duration,
    ) -> AmiResult<ActionResponse> {
        self.inner.redirect(channel, to_tel, timeout).await
    }
}
