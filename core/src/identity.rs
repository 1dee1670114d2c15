//! Identity provider trait.
//!
//! The managed auth service owns identity issuance and session persistence.
//! Seatbook only drives its interactive sign-in flow, asks it to end the
//! session, and listens for session changes (page reload, token expiry,
//! sign-out from another client).

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors reported by the identity provider.
///
/// Messages are free text coming from the provider; there are no structured
/// error codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The user dismissed the interactive sign-in flow.
    #[error("Sign-in popup was closed before completing")]
    PopupClosed,

    /// The provider could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider rejected the request.
    #[error("{0}")]
    Provider(String),
}

/// Unique identifier of an authenticated user, issued by the provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued uid
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Borrow the uid
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity returned by a successful sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider uid
    pub uid: UserId,
    /// Display name, if the provider has one
    pub display_name: Option<String>,
    /// Email address, if the provider has one
    pub email: Option<String>,
    /// Phone number, if the provider has one
    pub phone_number: Option<String>,
    /// Avatar URL, if the provider has one
    pub photo_url: Option<String>,
}

impl AuthUser {
    /// Creates an identity with only a uid set
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: UserId::new(uid),
            display_name: None,
            email: None,
            phone_number: None,
            photo_url: None,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the email address
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the phone number
    #[must_use]
    pub fn with_phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    /// Set the avatar URL
    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// Stream of session states.
///
/// Yields the current state immediately, then every subsequent change.
/// `None` means signed out.
pub type SessionStream = Pin<Box<dyn Stream<Item = Option<AuthUser>> + Send>>;

/// Boxed future returned by [`IdentityProvider`] methods.
pub type IdentityFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, IdentityError>> + Send + 'a>>;

/// Identity provider abstraction.
///
/// Like the document store, this trait returns boxed futures so it can be
/// shared as `Arc<dyn IdentityProvider>`.
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the flow fails or is dismissed.
    fn sign_in(&self) -> IdentityFuture<'_, AuthUser>;

    /// End the provider session.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the session cannot be ended.
    fn sign_out(&self) -> IdentityFuture<'_, ()>;

    /// The provider's current user, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Subscribe to session changes.
    fn session_changes(&self) -> SessionStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_optional_fields() {
        let user = AuthUser::new("u-1")
            .with_display_name("Ada")
            .with_email("ada@example.com");

        assert_eq!(user.uid.as_str(), "u-1");
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert!(user.phone_number.is_none());
    }

    #[test]
    fn provider_message_is_passed_through() {
        let err = IdentityError::Provider("auth/user-disabled".into());
        assert_eq!(err.to_string(), "auth/user-disabled");
    }
}
