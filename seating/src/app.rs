//! Application shell.
//!
//! Wires every component to one document store, identity provider, clock and
//! local storage, and runs the sign-in/sign-out sequences that touch several
//! components at once.

use crate::config::Config;
use crate::error::Result;
use crate::profile::ProfileStore;
use crate::reservations::ReservationLedger;
use crate::seats::{SeatRegistry, SeatSource};
use crate::session::{SessionManager, SessionObserver};
use crate::theme::{ColorScheme, FixedColorScheme, Theme, ThemeController, ThemeEnvironment};
use seatbook_core::document::DocumentStore;
use seatbook_core::environment::{Clock, LocalStorage};
use seatbook_core::identity::{AuthUser, IdentityProvider};
use std::sync::Arc;
use tracing::info;

/// Backends the application runs on
#[derive(Clone)]
pub struct Backends {
    /// Managed document database
    pub db: Arc<dyn DocumentStore>,
    /// Managed identity service
    pub identity: Arc<dyn IdentityProvider>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Client-local key/value storage
    pub storage: Arc<dyn LocalStorage>,
}

/// Every component, wired together.
#[derive(Clone)]
pub struct SeatbookApp {
    /// Session
    pub session: SessionManager,
    /// Seat grid
    pub seats: SeatRegistry,
    /// Reservations and booking
    pub reservations: ReservationLedger,
    /// Profile
    pub profiles: ProfileStore,
    /// Theme preference
    pub theme: ThemeController,
}

impl SeatbookApp {
    /// Build the components. Nothing is read until [`SeatbookApp::start`].
    #[must_use]
    pub fn new(config: &Config, backends: Backends) -> Self {
        let color_scheme: Arc<dyn ColorScheme> =
            Arc::new(FixedColorScheme(config.preferences.prefers_dark));
        Self::with_color_scheme(config, backends, color_scheme)
    }

    /// Build the components with a custom color scheme signal.
    #[must_use]
    pub fn with_color_scheme(
        config: &Config,
        backends: Backends,
        color_scheme: Arc<dyn ColorScheme>,
    ) -> Self {
        let Backends {
            db,
            identity,
            clock,
            storage,
        } = backends;
        let collections = &config.collections;

        let session = SessionManager::new(identity, Arc::clone(&clock), config.session.clone());
        let seats = SeatRegistry::new(Arc::clone(&db), Arc::clone(&clock), &collections.seats);
        let reservations = ReservationLedger::new(
            Arc::clone(&db),
            Arc::clone(&clock),
            session.clone(),
            seats.clone(),
            &collections.reservations,
        );
        let profiles = ProfileStore::new(db, clock, session.clone(), &collections.user_profiles);
        let theme = ThemeController::new(ThemeEnvironment {
            storage,
            color_scheme,
            key: config.preferences.theme_key.clone(),
        });

        Self {
            session,
            seats,
            reservations,
            profiles,
            theme,
        }
    }

    /// Resolve the theme, start observing the session and load the seat
    /// grid. Keep the returned observer alive for as long as the app runs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeatbookError::Runtime`] if the app was shut down.
    pub async fn start(&self) -> Result<(SessionObserver, SeatSource)> {
        let theme: Theme = self.theme.init().await?;
        let observer = self.session.observe_session();
        let source = self.seats.load().await;
        info!(%theme, ?source, "Seatbook started");
        Ok((observer, source))
    }

    /// Sign in, then make sure the user has a profile and load their
    /// reservations.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeatbookError::Auth`] when sign-in fails, or
    /// [`crate::SeatbookError::Read`] when reservations cannot be loaded.
    pub async fn sign_in(&self) -> Result<AuthUser> {
        let user = self.session.sign_in().await?;
        self.profiles.initialize(&user.uid).await;
        self.reservations.load().await?;
        Ok(user)
    }

    /// Sign out and forget the user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeatbookError::Auth`] when the provider fails.
    pub async fn sign_out(&self) -> Result<()> {
        self.session.sign_out().await?;
        self.profiles.clear_profile().await;
        Ok(())
    }

    /// Stop the reducer stores
    pub fn shutdown(&self) {
        self.session.shutdown();
        self.theme.shutdown();
        info!("Seatbook shut down");
    }
}
