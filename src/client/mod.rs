// ABOUTME: Manager client module providing trait-based interfaces for the GSM gateway PBX
// ABOUTME: Exports all client components including traits, builders, configuration, error types, and default implementation

//! Manager Client Module
//!
//! This module provides a trait-based client for the PBX manager interface
//! with the following features:
//!
//! * **Native async traits** - Uses async fn in traits (no async_trait dependency)
//! * **Layered design** - Separate traits for connection, login and the operations built on top
//! * **Concurrent actions** - Responses are matched to callers by ActionID, so calls may overlap
//! * **Builder patterns** - Easy client creation with sensible defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ami_gsm::client::{ClientBuilder, GsmGateway, SmsMessage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::quick_gateway("192.168.1.10:5038", "admin", "secret").await?;
//!
//! if let Some(span) = client.get_gsm_ready_span().await? {
//!     let sms = SmsMessage::new("Hello!", "5551234", span.span_id);
//!     let receipt = client.gsm_send_sms(&sms).await?;
//!     println!("Sent as {} part(s)", receipt.parts);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Events
//!
//! Asynchronous PBX events are broadcast to every subscriber:
//!
//! ```rust,no_run
//! use ami_gsm::client::{ClientBuilder, ClientConfig, Credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::authenticated(
//!     "192.168.1.10:5038",
//!     Credentials::new("admin", "secret"),
//!     ClientConfig::default(),
//! )
//! .await?;
//!
//! let mut events = client.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("{}: {:?}", event.kind, event.fields.get("Channel"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! * `AmiConnection` - Basic TCP connection management
//! * `AmiClient` - Login and raw actions (extends AmiConnection)
//! * `GsmGateway` - Span queries and SMS (extends AmiClient)
//! * `CallControl` - Originate and redirect (extends AmiClient)

pub mod builder;
pub mod config;
pub mod default;
pub mod error;
pub mod traits;
pub mod types;

// Re-export the main types for easy access
pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use default::{DefaultClient, READY_STATE};
pub use error::{AmiError, AmiResult};
pub use traits::{AmiClient, AmiConnection, CallControl, GsmGateway};
pub use types::{Credentials, ReadySpan, ReadySpanPolicy, SmsMessage, SmsReceipt, Span};
