//! Session management.
//!
//! The identity provider owns the session; this module mirrors it locally so
//! the rest of the client can ask who is signed in. State transitions are a
//! reducer run by the runtime [`Store`]; the provider calls happen in
//! [`SessionManager`], which dispatches the outcome.

use crate::config::SessionConfig;
use crate::error::{Result, SeatbookError};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use seatbook_core::environment::Clock;
use seatbook_core::identity::{AuthUser, IdentityProvider, UserId};
use seatbook_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use seatbook_runtime::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

// ============================================================================
// State & Actions
// ============================================================================

/// Local mirror of the provider session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Signed-in user, if any
    pub user: Option<AuthUser>,
    /// True until the provider has reported the session at least once, and
    /// while a sign-in is in flight
    pub loading: bool,
    /// Message of the last failed provider call
    pub error: Option<String>,
    /// When `user` last changed
    pub changed_at: Option<DateTime<Utc>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
            changed_at: None,
        }
    }
}

impl SessionState {
    /// Whether a user is signed in
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Inputs to the session reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Interactive sign-in started
    SignInStarted,
    /// Sign-in succeeded
    SignedIn(AuthUser),
    /// Sign-in failed with the provider's message
    SignInFailed(String),
    /// Sign-out started
    SignOutStarted,
    /// Sign-out succeeded
    SignedOut,
    /// Sign-out failed with the provider's message
    SignOutFailed(String),
    /// The provider reported the session (reload, expiry, another tab)
    SessionChanged(Option<AuthUser>),
    /// Forget the last error
    ClearError,
}

/// Dependencies of the session reducer
#[derive(Clone)]
pub struct SessionEnvironment {
    /// Time source for `changed_at`
    pub clock: Arc<dyn Clock>,
}

/// Session state transitions. Pure; every provider call happens outside.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionReducer;

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    fn reduce(
        &self,
        state: &mut SessionState,
        action: SessionAction,
        env: &SessionEnvironment,
    ) -> SmallVec<[Effect<SessionAction>; 4]> {
        match action {
            SessionAction::SignInStarted => {
                state.error = None;
                state.loading = true;
            },
            SessionAction::SignedIn(user) => {
                state.user = Some(user);
                state.loading = false;
                state.changed_at = Some(env.clock.now());
            },
            SessionAction::SignInFailed(message) => {
                state.error = Some(message);
                state.loading = false;
            },
            SessionAction::SignOutStarted | SessionAction::ClearError => {
                state.error = None;
            },
            SessionAction::SignedOut => {
                state.user = None;
                state.changed_at = Some(env.clock.now());
            },
            SessionAction::SignOutFailed(message) => {
                state.error = Some(message);
            },
            SessionAction::SessionChanged(user) => {
                if state.user != user {
                    state.changed_at = Some(env.clock.now());
                }
                state.user = user;
                state.loading = false;
            },
        }

        smallvec![Effect::None]
    }
}

/// Runtime store for the session reducer
pub type SessionStore = Store<SessionState, SessionAction, SessionEnvironment, SessionReducer>;

// ============================================================================
// Observer handle
// ============================================================================

/// Live subscription to provider session changes.
///
/// The listener runs until [`SessionObserver::unsubscribe`] is called or the
/// handle is dropped.
#[derive(Debug)]
#[must_use = "dropping the observer stops listening for session changes"]
pub struct SessionObserver {
    task: JoinHandle<()>,
}

impl SessionObserver {
    /// Stop listening
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Whether the listener is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Session façade over the identity provider.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    store: SessionStore,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager; the session starts out loading with no user.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        let store = Store::new(SessionState::default(), SessionReducer, SessionEnvironment { clock });
        Self {
            provider,
            store,
            config,
        }
    }

    async fn dispatch(&self, action: SessionAction) -> Result<()> {
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(())
    }

    /// Run the provider's interactive sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Auth`] when the provider rejects the flow; the
    /// message is also kept in [`SessionManager::error`].
    pub async fn sign_in(&self) -> Result<AuthUser> {
        self.dispatch(SessionAction::SignInStarted).await?;

        match self.provider.sign_in().await {
            Ok(user) => {
                info!(uid = %user.uid, name = ?user.display_name, "Successfully signed in");
                self.dispatch(SessionAction::SignedIn(user.clone())).await?;
                Ok(user)
            },
            Err(err) => {
                error!(error = %err, "Sign in error");
                self.dispatch(SessionAction::SignInFailed(err.to_string())).await?;
                Err(SeatbookError::Auth(err))
            },
        }
    }

    /// End the provider session and forget the local user.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Auth`] when the provider fails; the local user
    /// is kept in that case.
    pub async fn sign_out(&self) -> Result<()> {
        self.dispatch(SessionAction::SignOutStarted).await?;

        match self.provider.sign_out().await {
            Ok(()) => {
                info!("Successfully signed out");
                self.dispatch(SessionAction::SignedOut).await
            },
            Err(err) => {
                error!(error = %err, "Sign out error");
                self.dispatch(SessionAction::SignOutFailed(err.to_string())).await?;
                Err(SeatbookError::Auth(err))
            },
        }
    }

    /// Mirror provider session changes into local state until the returned
    /// observer is unsubscribed or dropped.
    ///
    /// The provider reports the current session first, which ends the
    /// initial loading state.
    pub fn observe_session(&self) -> SessionObserver {
        let mut changes = self.provider.session_changes();
        let store = self.store.clone();

        let task = tokio::spawn(async move {
            while let Some(user) = changes.next().await {
                match &user {
                    Some(user) => info!(uid = %user.uid, name = ?user.display_name, "User is signed in"),
                    None => info!("User is signed out"),
                }

                match store.send(SessionAction::SessionChanged(user)).await {
                    Ok(mut handle) => handle.wait().await,
                    Err(err) => {
                        debug!(error = %err, "Session store closed; observer stopping");
                        break;
                    },
                }
            }
        });

        SessionObserver { task }
    }

    /// Snapshot of the session state
    pub async fn state(&self) -> SessionState {
        self.store.state(SessionState::clone).await
    }

    /// Signed-in user
    pub async fn current_user(&self) -> Option<AuthUser> {
        self.store.state(|s| s.user.clone()).await
    }

    /// Signed-in user's id
    pub async fn user_id(&self) -> Option<UserId> {
        self.store.state(|s| s.user.as_ref().map(|u| u.uid.clone())).await
    }

    /// Whether a user is signed in
    pub async fn is_authenticated(&self) -> bool {
        self.store.state(SessionState::is_authenticated).await
    }

    /// Whether the session is still being established
    pub async fn is_loading(&self) -> bool {
        self.store.state(|s| s.loading).await
    }

    /// Message of the last failed provider call
    pub async fn error(&self) -> Option<String> {
        self.store.state(|s| s.error.clone()).await
    }

    /// Forget the last error.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Runtime`] after shutdown.
    pub async fn clear_error(&self) -> Result<()> {
        self.dispatch(SessionAction::ClearError).await
    }

    /// Name to show, falling back to the configured default
    pub async fn display_name(&self) -> String {
        let fallback = &self.config.default_display_name;
        self.store
            .state(|s| s.user.as_ref().and_then(|u| u.display_name.clone()))
            .await
            .unwrap_or_else(|| fallback.clone())
    }

    /// Email to show, falling back to the configured default
    pub async fn email(&self) -> String {
        let fallback = &self.config.default_email;
        self.store
            .state(|s| s.user.as_ref().and_then(|u| u.email.clone()))
            .await
            .unwrap_or_else(|| fallback.clone())
    }

    /// Avatar to show, falling back to the configured default
    pub async fn photo_url(&self) -> String {
        let fallback = &self.config.default_photo_url;
        self.store
            .state(|s| s.user.as_ref().and_then(|u| u.photo_url.clone()))
            .await
            .unwrap_or_else(|| fallback.clone())
    }

    /// Stop accepting session updates
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use seatbook_testing::{ReducerTest, assertions, test_clock};

    fn env() -> SessionEnvironment {
        SessionEnvironment {
            clock: Arc::new(test_clock()),
        }
    }

    fn ada() -> AuthUser {
        AuthUser::new("u-ada").with_display_name("Ada Lovelace")
    }

    #[test]
    fn session_starts_loading() {
        let state = SessionState::default();
        assert!(state.loading);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn sign_in_success_stores_user() {
        ReducerTest::new(SessionReducer)
            .with_env(env())
            .given_state(SessionState::default())
            .when_action(SessionAction::SignInStarted)
            .when_action(SessionAction::SignedIn(ada()))
            .then_state(|state| {
                assert_eq!(state.user, Some(ada()));
                assert!(!state.loading);
                assert!(state.error.is_none());
                assert_eq!(state.changed_at, Some(test_clock().now()));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn sign_in_failure_keeps_message() {
        ReducerTest::new(SessionReducer)
            .with_env(env())
            .given_state(SessionState::default())
            .when_action(SessionAction::SignInStarted)
            .when_action(SessionAction::SignInFailed("popup closed".into()))
            .then_state(|state| {
                assert!(state.user.is_none());
                assert!(!state.loading);
                assert_eq!(state.error.as_deref(), Some("popup closed"));
            })
            .run();
    }

    #[test]
    fn sign_out_failure_keeps_user() {
        ReducerTest::new(SessionReducer)
            .with_env(env())
            .given_state(SessionState {
                user: Some(ada()),
                loading: false,
                error: None,
                changed_at: None,
            })
            .when_action(SessionAction::SignOutStarted)
            .when_action(SessionAction::SignOutFailed("network".into()))
            .then_state(|state| {
                assert_eq!(state.user, Some(ada()));
                assert_eq!(state.error.as_deref(), Some("network"));
            })
            .run();
    }

    #[test]
    fn session_change_ends_loading() {
        ReducerTest::new(SessionReducer)
            .with_env(env())
            .given_state(SessionState::default())
            .when_action(SessionAction::SessionChanged(None))
            .then_state(|state| {
                assert!(!state.loading);
                assert!(state.user.is_none());
                assert!(state.changed_at.is_none());
            })
            .run();
    }
}
