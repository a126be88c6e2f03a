pub mod action;
pub mod client;
pub mod connection;
pub mod correlator;
pub mod event;
pub mod frame;
pub mod message;
pub mod session;
pub mod sms;


// Re-export protocol types for direct access
pub use action::{Action, ActionIdGenerator, CsmsReference, GsmCommand};
pub use event::{ActionResponse, ManagerEvent, Signal, SignalKind};
pub use message::{Fields, Message};
pub use session::SessionState;

// Re-export the main client API for easy access
pub use client::{
    AmiClient, AmiConnection, AmiError, AmiResult, CallControl, ClientBuilder, ClientConfig,
    Credentials, DefaultClient, GsmGateway, ReadySpanPolicy, SmsMessage,
};

/// Error returned by most functions.
///
/// Library operations return the concrete [`AmiError`]; this alias is for
/// applications that mix it with other error types.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for applications built on this crate.
///
/// # Examples
///
/// ## Sending an SMS through the first ready span
///
/// ```rust,no_run
/// use ami_gsm::client::{ClientBuilder, GsmGateway, SmsMessage};
///
/// #[tokio::main]
/// async fn main() -> ami_gsm::Result<()> {
///     let client = ClientBuilder::quick_gateway("192.168.1.10:5038", "admin", "secret").await?;
///
///     let Some(span) = client.get_gsm_ready_span().await? else {
///         println!("No span is ready");
///         return Ok(());
///     };
///
///     let sms = SmsMessage::new("Hello, World!", "5551234", span.span_id);
///     let receipt = client.gsm_send_sms(&sms).await?;
///     println!("Accepted with ActionID {}", receipt.action_id);
///
///     Ok(())
/// }
/// ```
///
/// ## Placing a call
///
/// ```rust,no_run
/// use ami_gsm::client::{CallControl, ClientBuilder};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> ami_gsm::Result<()> {
///     let client = ClientBuilder::quick_gateway("192.168.1.10:5038", "admin", "secret").await?;
///
///     let response = client
///         .dial_with_timeout("201", "5551234", Duration::from_secs(20))
///         .await?;
///     println!("PBX answered {}", response.kind);
///
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
