//! Mock identity provider for testing.

use futures::stream;
use seatbook_core::identity::{
    AuthUser, IdentityError, IdentityFuture, IdentityProvider, SessionStream,
};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Mock identity provider.
///
/// Sign-in returns the configured account; failures can be scripted for the
/// next call. Session changes are broadcast through a `watch` channel, so
/// every subscriber first sees the current state and then each change.
#[derive(Debug, Clone)]
pub struct MockIdentityProvider {
    account: Arc<Mutex<Option<AuthUser>>>,
    sign_in_failure: Arc<Mutex<Option<IdentityError>>>,
    sign_out_failure: Arc<Mutex<Option<IdentityError>>>,
    session: Arc<watch::Sender<Option<AuthUser>>>,
}

impl MockIdentityProvider {
    /// A provider with no account; sign-in fails until one is configured.
    #[must_use]
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            account: Arc::new(Mutex::new(None)),
            sign_in_failure: Arc::new(Mutex::new(None)),
            sign_out_failure: Arc::new(Mutex::new(None)),
            session: Arc::new(session),
        }
    }

    /// A provider whose sign-in flow returns `user`.
    #[must_use]
    pub fn with_user(user: AuthUser) -> Self {
        let provider = Self::new();
        provider.set_account(Some(user));
        provider
    }

    /// A provider that already holds a session for `user` (a page reload).
    #[must_use]
    pub fn signed_in_as(user: AuthUser) -> Self {
        let provider = Self::with_user(user.clone());
        provider.session.send_replace(Some(user));
        provider
    }

    /// Change the account the sign-in flow returns.
    pub fn set_account(&self, user: Option<AuthUser>) {
        if let Ok(mut account) = self.account.lock() {
            *account = user;
        }
    }

    /// Make the next sign-in fail with `error`.
    pub fn fail_next_sign_in(&self, error: IdentityError) {
        if let Ok(mut failure) = self.sign_in_failure.lock() {
            *failure = Some(error);
        }
    }

    /// Make the next sign-out fail with `error`.
    pub fn fail_next_sign_out(&self, error: IdentityError) {
        if let Ok(mut failure) = self.sign_out_failure.lock() {
            *failure = Some(error);
        }
    }

    /// Change the session from outside the app (token expiry, another tab).
    pub fn simulate_session_change(&self, user: Option<AuthUser>) {
        self.session.send_replace(user);
    }

    fn take_failure(slot: &Mutex<Option<IdentityError>>) -> Option<IdentityError> {
        slot.lock().ok().and_then(|mut failure| failure.take())
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn sign_in(&self) -> IdentityFuture<'_, AuthUser> {
        Box::pin(async move {
            if let Some(error) = Self::take_failure(&self.sign_in_failure) {
                return Err(error);
            }

            let account = self
                .account
                .lock()
                .map_err(|_| IdentityError::Provider("Mutex lock failed".to_string()))?
                .clone();
            let user = account.ok_or(IdentityError::PopupClosed)?;

            self.session.send_replace(Some(user.clone()));
            tracing::debug!(uid = %user.uid, "Mock identity signed in");
            Ok(user)
        })
    }

    fn sign_out(&self) -> IdentityFuture<'_, ()> {
        Box::pin(async move {
            if let Some(error) = Self::take_failure(&self.sign_out_failure) {
                return Err(error);
            }

            self.session.send_replace(None);
            Ok(())
        })
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.session.borrow().clone()
    }

    fn session_changes(&self) -> SessionStream {
        let receiver = self.session.subscribe();
        Box::pin(stream::unfold(
            (receiver, true),
            |(mut receiver, first)| async move {
                if !first && receiver.changed().await.is_err() {
                    return None;
                }
                let user = receiver.borrow_and_update().clone();
                Some((user, (receiver, false)))
            },
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn ada() -> AuthUser {
        AuthUser::new("u-ada").with_display_name("Ada")
    }

    #[tokio::test]
    async fn sign_in_updates_session() {
        let provider = MockIdentityProvider::with_user(ada());
        assert!(provider.current_user().is_none());

        let user = provider.sign_in().await.unwrap();
        assert_eq!(user, ada());
        assert_eq!(provider.current_user(), Some(ada()));

        provider.sign_out().await.unwrap();
        assert!(provider.current_user().is_none());
    }

    #[tokio::test]
    async fn scripted_failure_applies_once() {
        let provider = MockIdentityProvider::with_user(ada());
        provider.fail_next_sign_in(IdentityError::Network("offline".into()));

        assert_eq!(
            provider.sign_in().await,
            Err(IdentityError::Network("offline".into()))
        );
        assert!(provider.sign_in().await.is_ok());
    }

    #[tokio::test]
    async fn sign_in_without_account_is_popup_closed() {
        let provider = MockIdentityProvider::new();
        assert_eq!(provider.sign_in().await, Err(IdentityError::PopupClosed));
    }

    #[tokio::test]
    async fn session_stream_yields_current_then_changes() {
        let provider = MockIdentityProvider::signed_in_as(ada());
        let mut changes = provider.session_changes();

        assert_eq!(changes.next().await, Some(Some(ada())));

        provider.simulate_session_change(None);
        assert_eq!(changes.next().await, Some(None));
    }
}
