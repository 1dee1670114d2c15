//! User profile store.
//!
//! Profiles live in one document per user, keyed by the user id. A user
//! without a document sees a profile synthesized from the identity provider
//! until something is saved.

use crate::error::{Result, SeatbookError};
use crate::session::SessionManager;
use crate::types::{ProfileUpdate, UserProfile};
use seatbook_core::document::{Document, DocumentId, DocumentStore, Value};
use seatbook_core::environment::Clock;
use seatbook_core::identity::{AuthUser, UserId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Default)]
struct ProfileState {
    profile: Option<UserProfile>,
    loading: bool,
    error: Option<String>,
}

/// Map a profile document, defaulting anything missing.
#[must_use]
pub fn profile_from_document(doc: &Document) -> UserProfile {
    let defaults = UserProfile::default();
    let text = |name: &str| doc.get_str(name).map(ToString::to_string).unwrap_or_default();

    UserProfile {
        display_name: text("displayName"),
        email: text("email"),
        phone: text("phone"),
        email_notifications: doc
            .get_bool("emailNotifications")
            .unwrap_or(defaults.email_notifications),
        sms_notifications: doc
            .get_bool("smsNotifications")
            .unwrap_or(defaults.sms_notifications),
        push_notifications: doc
            .get_bool("pushNotifications")
            .unwrap_or(defaults.push_notifications),
        created_at: doc.get_timestamp(CREATED_AT),
        updated_at: doc.get_timestamp(UPDATED_AT),
    }
}

/// Profile of one user at a time.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct ProfileStore {
    db: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    session: SessionManager,
    collection: String,
    state: Arc<RwLock<ProfileState>>,
}

impl ProfileStore {
    /// Create an empty store over `collection`
    #[must_use]
    pub fn new(
        db: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        session: SessionManager,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            db,
            clock,
            session,
            collection: collection.into(),
            state: Arc::new(RwLock::new(ProfileState::default())),
        }
    }

    /// Load a user's profile.
    ///
    /// Without a stored document the profile is synthesized from the
    /// signed-in identity and not written back.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Read`] when the store fails.
    pub async fn load(&self, user_id: &UserId) -> Result<()> {
        self.begin().await;
        let result = self.try_load(user_id).await;
        self.finish(result, "Error loading user profile").await
    }

    /// Write a full profile with fresh timestamps, then reload it.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Write`] or [`SeatbookError::Read`] when the
    /// store fails.
    pub async fn create(&self, user_id: &UserId, data: &ProfileUpdate) -> Result<()> {
        self.begin().await;
        let result = self.try_create(user_id, data).await;
        self.finish(result, "Error creating user profile").await
    }

    /// Patch the given fields, creating the profile if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Write`] or [`SeatbookError::Read`] when the
    /// store fails.
    pub async fn update(&self, user_id: &UserId, data: &ProfileUpdate) -> Result<()> {
        self.begin().await;
        let result = self.try_update(user_id, data).await;
        self.finish(result, "Error updating user profile").await
    }

    /// Make sure the signed-in user has a profile: load it, or create it
    /// from the identity provider's record. Failures are logged only.
    pub async fn initialize(&self, user_id: &UserId) {
        let Some(user) = self.session.current_user().await else {
            debug!("No signed-in user; profile not initialized");
            return;
        };

        if let Err(err) = self.try_initialize(user_id, &user).await {
            error!(user = %user_id, error = %err, "Error initializing user profile");
        }
    }

    async fn try_initialize(&self, user_id: &UserId, user: &AuthUser) -> Result<()> {
        if self.fetch(user_id).await?.is_some() {
            self.try_load(user_id).await
        } else {
            self.try_create(user_id, &ProfileUpdate::from_identity(user)).await
        }
    }

    async fn fetch(&self, user_id: &UserId) -> Result<Option<Document>> {
        self.db
            .get(self.collection.clone(), DocumentId::new(user_id.as_str()))
            .await
            .map_err(SeatbookError::Read)
    }

    async fn try_load(&self, user_id: &UserId) -> Result<()> {
        let profile = match self.fetch(user_id).await? {
            Some(doc) => Some(profile_from_document(&doc)),
            None => {
                debug!(user = %user_id, "No profile document; using identity defaults");
                self.session
                    .current_user()
                    .await
                    .map(|user| UserProfile::from_identity(&user))
            },
        };

        self.state.write().await.profile = profile;
        Ok(())
    }

    async fn try_create(&self, user_id: &UserId, data: &ProfileUpdate) -> Result<()> {
        let now = self.clock.now();
        let mut fields = data.to_fields();
        fields.insert(CREATED_AT.to_string(), Value::from(now));
        fields.insert(UPDATED_AT.to_string(), Value::from(now));

        self.db
            .set(self.collection.clone(), DocumentId::new(user_id.as_str()), fields)
            .await
            .map_err(SeatbookError::Write)?;
        info!(user = %user_id, "User profile created successfully");

        self.try_load(user_id).await
    }

    async fn try_update(&self, user_id: &UserId, data: &ProfileUpdate) -> Result<()> {
        if self.fetch(user_id).await?.is_none() {
            return self.try_create(user_id, data).await;
        }

        let mut fields = data.to_fields();
        fields.insert(UPDATED_AT.to_string(), Value::from(self.clock.now()));

        self.db
            .update(self.collection.clone(), DocumentId::new(user_id.as_str()), fields)
            .await
            .map_err(SeatbookError::Write)?;
        info!(user = %user_id, "User profile updated successfully");

        self.try_load(user_id).await
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.loading = true;
        state.error = None;
    }

    async fn finish(&self, result: Result<()>, context: &'static str) -> Result<()> {
        let mut state = self.state.write().await;
        state.loading = false;
        if let Err(err) = &result {
            error!(error = %err, "{context}");
            state.error = Some(err.to_string());
        }
        result
    }

    /// Currently loaded profile
    pub async fn profile(&self) -> Option<UserProfile> {
        self.state.read().await.profile.clone()
    }

    /// Forget the loaded profile (on sign-out)
    pub async fn clear_profile(&self) {
        self.state.write().await.profile = None;
    }

    /// Whether a profile operation is in flight
    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Message of the last failure
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Forget the last failure
    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }
}
