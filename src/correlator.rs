//! Response correlation
//!
//! Every correlated action registers a single-shot waiter under its
//! ActionID before the action is written. The read loop resolves the
//! waiter when a response with that id arrives. Waiters are owned by a
//! guard ([`PendingAction`] / [`PendingLogin`]) whose drop removes the
//! table entry, so an abandoned or timed-out action never leaves a stale
//! entry behind and a late response simply finds nobody to deliver to.

use crate::client::error::{AmiError, AmiResult};
use crate::event::ActionResponse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Outcome of a login attempt as reported by the PBX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug)]
struct Waiter<T> {
    // Distinguishes successive registrations under the same key.
    token: u64,
    tx: oneshot::Sender<T>,
}

/// Table of outstanding actions plus the login slot.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: Mutex<HashMap<String, Waiter<ActionResponse>>>,
    login: Mutex<Option<Waiter<LoginOutcome>>>,
    tokens: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `action_id`.
    ///
    /// Fails when another action with the same id is still outstanding.
    pub fn register(self: &Arc<Self>, action_id: &str) -> AmiResult<PendingAction> {
        let (tx, rx) = oneshot::channel();
        let token = self.tokens.fetch_add(1, Ordering::Relaxed);

        let mut pending = lock(&self.pending);
        if pending.contains_key(action_id) {
            return Err(AmiError::InvalidArgument(format!(
                "ActionID {action_id} is already outstanding"
            )));
        }
        pending.insert(action_id.to_string(), Waiter { token, tx });

        Ok(PendingAction {
            action_id: action_id.to_string(),
            token,
            rx,
            correlator: Arc::clone(self),
        })
    }

    /// Deliver `response` to the waiter registered for `action_id`.
    ///
    /// Returns `false` when no waiter is registered (unknown id, already
    /// answered, or abandoned by its caller).
    pub fn resolve(&self, action_id: &str, response: ActionResponse) -> bool {
        let waiter = lock(&self.pending).remove(action_id);

        match waiter {
            Some(waiter) => waiter.tx.send(response).is_ok(),
            None => {
                debug!(action_id, "Dropping response with no waiting action");
                false
            }
        }
    }

    pub fn is_pending(&self, action_id: &str) -> bool {
        lock(&self.pending).contains_key(action_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Claim the login slot. Only one login may await its outcome at a time.
    pub fn register_login(self: &Arc<Self>) -> AmiResult<PendingLogin> {
        let (tx, rx) = oneshot::channel();
        let token = self.tokens.fetch_add(1, Ordering::Relaxed);

        let mut slot = lock(&self.login);
        if slot.is_some() {
            return Err(AmiError::InvalidArgument(
                "a login is already in progress".to_string(),
            ));
        }
        *slot = Some(Waiter { token, tx });

        Ok(PendingLogin {
            token,
            rx,
            correlator: Arc::clone(self),
        })
    }

    /// Whether a login is currently awaiting its outcome.
    pub fn login_pending(&self) -> bool {
        lock(&self.login).is_some()
    }

    /// Complete the outstanding login, if any. `on_accept` runs before the
    /// waiter is woken so state derived from the login is visible to it.
    pub fn complete_login<F: FnOnce()>(&self, outcome: LoginOutcome, on_accept: F) -> bool {
        let Some(waiter) = lock(&self.login).take() else {
            debug!(?outcome, "Login outcome with no login in progress");
            return false;
        };

        if outcome == LoginOutcome::Accepted {
            on_accept();
        }
        waiter.tx.send(outcome).is_ok()
    }

    /// Drop every waiter; their callers observe `ConnectionClosed`.
    pub fn close(&self) {
        let abandoned = {
            let mut pending = lock(&self.pending);
            let count = pending.len();
            pending.clear();
            count
        };
        let login = lock(&self.login).take().is_some();

        if abandoned > 0 || login {
            warn!(abandoned, login, "Connection closed with outstanding actions");
        }
    }

    fn forget(&self, action_id: &str, token: u64) {
        let mut pending = lock(&self.pending);
        if pending.get(action_id).is_some_and(|w| w.token == token) {
            pending.remove(action_id);
        }
    }

    fn forget_login(&self, token: u64) {
        let mut slot = lock(&self.login);
        if slot.as_ref().is_some_and(|w| w.token == token) {
            *slot = None;
        }
    }
}

async fn await_waiter<T>(
    rx: &mut oneshot::Receiver<T>,
    wait: Duration,
    operation: &'static str,
) -> AmiResult<T> {
    match tokio::time::timeout(wait, rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(AmiError::ConnectionClosed),
        Err(_) => {
            warn!(operation, ?wait, "Timed out waiting for response");
            Err(AmiError::Timeout(operation))
        }
    }
}

/// Guard for one outstanding action.
#[derive(Debug)]
pub struct PendingAction {
    action_id: String,
    token: u64,
    rx: oneshot::Receiver<ActionResponse>,
    correlator: Arc<Correlator>,
}

impl PendingAction {
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    /// Wait up to `wait` for the response. The registration is released
    /// whichever way this ends.
    pub async fn wait(mut self, wait: Duration, operation: &'static str) -> AmiResult<ActionResponse> {
        await_waiter(&mut self.rx, wait, operation).await
    }
}

impl Drop for PendingAction {
    fn drop(&mut self) {
        self.correlator.forget(&self.action_id, self.token);
    }
}

/// Guard for the login slot.
#[derive(Debug)]
pub struct PendingLogin {
    token: u64,
    rx: oneshot::Receiver<LoginOutcome>,
    correlator: Arc<Correlator>,
}

impl PendingLogin {
    pub async fn wait(mut self, wait: Duration) -> AmiResult<LoginOutcome> {
        await_waiter(&mut self.rx, wait, "login").await
    }
}

impl Drop for PendingLogin {
    fn drop(&mut self) {
        self.correlator.forget_login(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn response(action_id: &str) -> ActionResponse {
        let message = Message::parse(format!("Response: Success\r\nActionID: {action_id}"));
        ActionResponse {
            kind: "Success".to_string(),
            raw: message.raw,
            fields: message.fields,
        }
    }

    #[tokio::test]
    async fn test_response_resolves_only_its_own_waiter() {
        let correlator = Arc::new(Correlator::new());
        let first = correlator.register("42").unwrap();
        let second = correlator.register("43").unwrap();

        assert!(correlator.resolve("42", response("42")));

        let resolved = first.wait(Duration::from_millis(100), "test").await.unwrap();
        assert_eq!(resolved.action_id(), Some("42"));
        assert!(correlator.is_pending("43"));
        assert!(!correlator.is_pending("42"));

        drop(second);
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_removes_registration() {
        let correlator = Arc::new(Correlator::new());
        let pending = correlator.register("7").unwrap();

        let result = pending.wait(Duration::from_millis(10), "gsm_show_spans").await;

        assert!(matches!(result, Err(AmiError::Timeout("gsm_show_spans"))));
        assert!(!correlator.is_pending("7"));
        assert!(!correlator.resolve("7", response("7")));
    }

    #[test]
    fn test_duplicate_outstanding_id_is_rejected() {
        let correlator = Arc::new(Correlator::new());
        let _held = correlator.register("dup").unwrap();

        assert!(matches!(
            correlator.register("dup"),
            Err(AmiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_stale_guard_does_not_remove_new_registration() {
        let correlator = Arc::new(Correlator::new());
        let old = correlator.register("5").unwrap();

        assert!(correlator.resolve("5", response("5")));
        let _new = correlator.register("5").unwrap();
        drop(old);

        assert!(correlator.is_pending("5"));
    }

    #[test]
    fn test_second_response_for_same_id_is_unroutable() {
        let correlator = Arc::new(Correlator::new());
        let _pending = correlator.register("1").unwrap();

        assert!(correlator.resolve("1", response("1")));
        assert!(!correlator.resolve("1", response("1")));
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let correlator = Arc::new(Correlator::new());
        let pending = correlator.register("9").unwrap();
        let login = correlator.register_login().unwrap();

        correlator.close();

        assert!(matches!(
            pending.wait(Duration::from_secs(1), "test").await,
            Err(AmiError::ConnectionClosed)
        ));
        assert!(matches!(
            login.wait(Duration::from_secs(1)).await,
            Err(AmiError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_login_slot_lifecycle() {
        let correlator = Arc::new(Correlator::new());
        let login = correlator.register_login().unwrap();

        assert!(correlator.register_login().is_err());

        let mut accepted = false;
        assert!(correlator.complete_login(LoginOutcome::Accepted, || accepted = true));
        assert!(accepted);
        assert_eq!(
            login.wait(Duration::from_millis(100)).await.unwrap(),
            LoginOutcome::Accepted
        );
        assert!(!correlator.login_pending());
    }

    #[tokio::test]
    async fn test_late_login_outcome_is_ignored() {
        let correlator = Arc::new(Correlator::new());
        let login = correlator.register_login().unwrap();

        assert!(login.wait(Duration::from_millis(10)).await.unwrap_err().is_timeout());
        assert!(!correlator.login_pending());

        let mut accepted = false;
        assert!(!correlator.complete_login(LoginOutcome::Accepted, || accepted = true));
        assert!(!correlator.complete_login(LoginOutcome::Rejected, || {}));
        assert!(!accepted);
    }
}
