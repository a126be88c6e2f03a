// ABOUTME: Client factory for easy manager client creation
// ABOUTME: Provides constructors that connect, wait for the greeting and log in in one step

use crate::client::config::ClientConfig;
use crate::client::default::DefaultClient;
use crate::client::error::AmiResult;
use crate::client::traits::{AmiClient, AmiConnection, CallControl, GsmGateway};
use crate::client::types::Credentials;
use tokio::net::ToSocketAddrs;

/// Factory for manager clients
///
/// Handles the connect + login sequence so callers get back a client that
/// is ready for gateway and call operations.
pub struct ClientBuilder;

impl ClientBuilder {
    /// Create an authenticated client with an explicit configuration
    ///
    /// Connects, waits for the `Asterisk Call Manager` greeting and logs in.
    /// Returns the concrete client so event subscriptions stay available.
    pub async fn authenticated<T: ToSocketAddrs + Send>(
        addr: T,
        credentials: Credentials,
        config: ClientConfig,
    ) -> AmiResult<DefaultClient> {
        let greeting_wait = config.login_timeout;
        let client = DefaultClient::connect_with_config(addr, config).await?;

        client.wait_connected(greeting_wait).await?;
        client.login(&credentials).await?;
        Ok(client)
    }

    /// Create a gateway client (span queries and SMS)
    pub async fn gateway<T: ToSocketAddrs + Send>(
        addr: T,
        credentials: Credentials,
    ) -> AmiResult<impl GsmGateway + CallControl> {
        Self::authenticated(addr, credentials, ClientConfig::default()).await
    }

    /// Create a connection without logging in
    ///
    /// Just establishes the TCP connection. You must call `login()` separately.
    pub async fn connection<T: ToSocketAddrs + Send>(addr: T) -> AmiResult<impl AmiClient> {
        DefaultClient::connect(addr).await
    }
}

/// Convenience functions for quick client creation
impl ClientBuilder {
    /// Quick gateway creation with minimal parameters
    ///
    /// Equivalent to `gateway(addr, Credentials::new(username, secret))`.
    pub async fn quick_gateway<T: ToSocketAddrs + Send>(
        addr: T,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> AmiResult<impl GsmGateway + CallControl> {
        Self::gateway(addr, Credentials::new(username, secret)).await
    }
}
