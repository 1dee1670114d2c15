//! Application error taxonomy.
//!
//! Every component records the message of a failure in its local error field
//! and also returns the typed error to the caller.

use crate::types::SeatNumber;
use seatbook_core::document::{DocumentId, DocumentStoreError};
use seatbook_core::environment::StorageError;
use seatbook_core::identity::IdentityError;
use seatbook_runtime::StoreError;
use thiserror::Error;

/// Errors returned by Seatbook components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeatbookError {
    /// The identity provider rejected sign-in or sign-out.
    #[error("Authentication failed: {0}")]
    Auth(#[from] IdentityError),

    /// A document store write was rejected.
    #[error("Write failed: {0}")]
    Write(#[source] DocumentStoreError),

    /// A document store read was rejected.
    #[error("Read failed: {0}")]
    Read(#[source] DocumentStoreError),

    /// Caller input could not be accepted.
    #[error("{0}")]
    Validation(String),

    /// Booking requires a signed-in user.
    #[error("User must be authenticated to make a reservation")]
    NotAuthenticated,

    /// Someone else holds the seat.
    #[error("Seat {0} is not available")]
    SeatUnavailable(SeatNumber),

    /// No seat document carries this number.
    #[error("Seat {0} does not exist")]
    SeatNotFound(SeatNumber),

    /// A stored document is missing a required field or holds a bad value.
    #[error("Malformed document {id}: {reason}")]
    MalformedDocument {
        /// Offending document
        id: DocumentId,
        /// What was wrong with it
        reason: String,
    },

    /// Local preference storage failed.
    #[error("Preference storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The reducer runtime refused the action.
    #[error(transparent)]
    Runtime(#[from] StoreError),
}

impl SeatbookError {
    /// Whether the failure was caused by the user's input or situation
    /// rather than by a backend.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotAuthenticated
                | Self::SeatUnavailable(_)
                | Self::SeatNotFound(_)
                | Self::Auth(IdentityError::PopupClosed)
        )
    }
}

/// Result alias for Seatbook operations.
pub type Result<T> = std::result::Result<T, SeatbookError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_backend_text() {
        let err = SeatbookError::Write(DocumentStoreError::PermissionDenied(
            "missing or insufficient permissions".into(),
        ));
        assert_eq!(
            err.to_string(),
            "Write failed: Permission denied: missing or insufficient permissions"
        );

        let auth: SeatbookError = IdentityError::Provider("account disabled".into()).into();
        assert_eq!(auth.to_string(), "Authentication failed: account disabled");
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(SeatbookError::NotAuthenticated.is_user_error());
        assert!(SeatbookError::SeatUnavailable("A1".parse().unwrap()).is_user_error());
        assert!(SeatbookError::from(IdentityError::PopupClosed).is_user_error());
        assert!(!SeatbookError::Read(DocumentStoreError::Unavailable("down".into())).is_user_error());
    }
}
