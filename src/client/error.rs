// ABOUTME: Manager client error types covering authentication, correlation timeouts and argument validation
// ABOUTME: Provides structured error reporting with automatic conversion from underlying I/O errors

use std::io;
use thiserror::Error;

/// Error type for every manager client operation
///
/// Each variant carries enough context (operation name or reason) to tell
/// which call failed and why. None of them are retried locally: a failure
/// is terminal for the one call that produced it.
#[derive(Debug, Error)]
pub enum AmiError {
    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// Operation attempted before the session was authenticated
    #[error("Not authenticated: {0} requires a successful login")]
    NotAuthenticated(&'static str),

    /// No matching response arrived within the allotted window
    #[error("Operation timeout: {0}")]
    Timeout(&'static str),

    /// The PBX explicitly refused the request (login failure)
    #[error("Rejected by PBX: {0}")]
    ProtocolRejected(String),

    /// A required argument was missing or unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An action without any fields was handed to the send primitive
    #[error("Action has no fields")]
    EmptyInput,

    /// The connection ended while a response was still awaited
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,
}

/// Result type alias for manager client operations
pub type AmiResult<T> = Result<T, AmiError>;

impl AmiError {
    /// True for the `Timeout` kind
    pub fn is_timeout(&self) -> bool {
        matches!(self, AmiError::Timeout(_))
    }
}
