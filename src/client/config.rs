// ABOUTME: Timing and channel configuration for the manager client
// ABOUTME: Provides defaults matching the PBX's usual response times with builder-style overrides

use std::time::Duration;

/// Configuration for a [`DefaultClient`](crate::client::DefaultClient)
///
/// Every timeout bounds how long one call waits for its answer. None of
/// them tears the connection down; an expired wait only fails that call.
///
/// # Example
///
/// ```rust
/// use ami_gsm::client::ClientConfig;
/// use std::time::Duration;
///
/// // Defaults: 15s login/command/SMS, 30s calls, 3s call cushion
/// let config = ClientConfig::default();
///
/// // Faster failure detection on a local PBX
/// let config = ClientConfig::default()
///     .with_login_timeout(Duration::from_secs(5))
///     .with_command_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum wait for the login outcome (default: 15 seconds)
    pub login_timeout: Duration,

    /// Maximum wait for the response to a span query (default: 15 seconds)
    pub command_timeout: Duration,

    /// Maximum wait for an SMS submission to be acknowledged (default: 15 seconds)
    pub sms_timeout: Duration,

    /// Call timeout handed to the PBX for dial/redirect (default: 30 seconds)
    ///
    /// The client itself waits this long plus [`call_cushion`](Self::call_cushion).
    pub call_timeout: Duration,

    /// Extra wait on top of the call timeout covering transport latency
    /// (default: 3 seconds)
    pub call_cushion: Duration,

    /// Overall deadline of a ready-span lookup (default: 15 seconds)
    pub ready_span_deadline: Duration,

    /// Buffered events per subscriber before the slowest one starts
    /// missing events (default: 256)
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            login_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(15),
            sms_timeout: Duration::from_secs(15),
            call_timeout: Duration::from_secs(30),
            call_cushion: Duration::from_secs(3),
            ready_span_deadline: Duration::from_secs(15),
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_sms_timeout(mut self, timeout: Duration) -> Self {
        self.sms_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_call_cushion(mut self, cushion: Duration) -> Self {
        self.call_cushion = cushion;
        self
    }

    pub fn with_ready_span_deadline(mut self, deadline: Duration) -> Self {
        self.ready_span_deadline = deadline;
        self
    }

    /// Set the per-subscriber event buffer. Zero is bumped to one.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// How long the client waits on a call placed with `timeout`.
    /// Saturates at `Duration::MAX`.
    pub fn call_wait(&self, timeout: Duration) -> Duration {
        timeout.saturating_add(self.call_cushion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.login_timeout, Duration::from_millis(15000));
        assert_eq!(config.sms_timeout, Duration::from_millis(15000));
        assert_eq!(config.call_timeout, Duration::from_millis(30000));
        assert_eq!(config.call_wait(config.call_timeout), Duration::from_millis(33000));
    }

    #[test]
    fn test_call_wait_saturates() {
        let config = ClientConfig::default();

        assert_eq!(config.call_wait(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn test_event_capacity_never_zero() {
        assert_eq!(ClientConfig::new().with_event_capacity(0).event_capacity, 1);
    }
}
