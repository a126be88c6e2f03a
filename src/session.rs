//! Session authentication state
//!
//! ```text
//! Unauthenticated ──login-success──▶ Authenticated
//! ```
//!
//! The transition is one way. A session never returns to
//! `Unauthenticated`; a new connection gets a new `Session`.
//!
//! The state is shared between the read loop (which observes the login
//! outcome) and callers (which check it before issuing commands), so it is
//! kept in an atomic byte and converted back with `num_enum`.

use crate::client::error::{AmiError, AmiResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::info;

/// Authentication state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SessionState {
    Unauthenticated = 0x00,
    Authenticated = 0x01,
}

/// Per-connection session.
///
/// The frame accumulation buffer is owned by the connection's read loop
/// and lives exactly as long as this session's connection does.
#[derive(Debug)]
pub struct Session {
    state: AtomicU8,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Unauthenticated.into()),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::try_from(self.state.load(Ordering::Acquire))
            .unwrap_or(SessionState::Unauthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Move to `Authenticated`. Returns `true` only for the call that
    /// performed the transition.
    pub fn authenticate(&self) -> bool {
        let previous = self
            .state
            .fetch_max(SessionState::Authenticated.into(), Ordering::AcqRel);

        let transitioned = previous == u8::from(SessionState::Unauthenticated);
        if transitioned {
            info!("Session authenticated");
        }
        transitioned
    }

    /// Gate for commands that need a logged-in session.
    pub fn require_authenticated(&self, operation: &'static str) -> AmiResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(AmiError::NotAuthenticated(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new();

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(matches!(
            session.require_authenticated("gsm_show_spans"),
            Err(AmiError::NotAuthenticated("gsm_show_spans"))
        ));
    }

    #[test]
    fn test_authenticate_is_forward_only() {
        let session = Session::new();

        assert!(session.authenticate());
        assert!(!session.authenticate());
        assert_eq!(session.state(), SessionState::Authenticated);
        assert!(session.require_authenticated("dial").is_ok());
    }

    #[test]
    fn test_state_round_trips_through_raw_value() {
        assert_eq!(SessionState::try_from(0x01), Ok(SessionState::Authenticated));
        assert!(SessionState::try_from(0x02).is_err());
        assert_eq!(u8::from(SessionState::Unauthenticated), 0x00);
    }
}
