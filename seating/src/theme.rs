//! Light/dark theme preference.
//!
//! The preference is read from client-local storage at startup (falling back
//! to the environment's color-scheme signal) and written back on every
//! toggle. Writing is an effect, so the reducer stays pure.

use crate::error::Result;
use seatbook_core::environment::LocalStorage;
use seatbook_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use seatbook_runtime::Store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Display theme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background
    #[default]
    Light,
    /// Dark background
    Dark,
}

impl Theme {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The other theme
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Resolve the startup theme: a stored `"dark"` wins, a stored anything
    /// else means light, and nothing stored defers to `prefers_dark`.
    #[must_use]
    pub fn resolve(saved: Option<&str>, prefers_dark: bool) -> Self {
        match saved {
            Some("dark") => Self::Dark,
            Some(_) => Self::Light,
            None if prefers_dark => Self::Dark,
            None => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment signal for the preferred color scheme
pub trait ColorScheme: Send + Sync {
    /// Whether the environment prefers a dark scheme
    fn prefers_dark(&self) -> bool;
}

/// Color scheme signal fixed at construction (from configuration)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedColorScheme(pub bool);

impl ColorScheme for FixedColorScheme {
    fn prefers_dark(&self) -> bool {
        self.0
    }
}

/// Theme state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeState {
    /// Active theme
    pub theme: Theme,
    /// Whether startup resolution has run
    pub initialized: bool,
    /// Message of the last failed write to storage
    pub persist_error: Option<String>,
}

impl ThemeState {
    /// Whether the dark theme is active
    #[must_use]
    pub const fn is_dark(&self) -> bool {
        matches!(self.theme, Theme::Dark)
    }

    /// Class to put on the document root, if any
    #[must_use]
    pub const fn root_class(&self) -> Option<&'static str> {
        if self.is_dark() { Some("dark") } else { None }
    }
}

/// Theme actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThemeAction {
    /// Resolve the startup theme
    Initialize {
        /// Value read from storage, if any
        saved: Option<String>,
        /// Environment color-scheme signal
        prefers_dark: bool,
    },
    /// Flip the theme and persist it
    Toggle,
    /// Writing the preference failed
    PersistFailed(String),
}

/// Theme dependencies
#[derive(Clone)]
pub struct ThemeEnvironment {
    /// Client-local storage
    pub storage: Arc<dyn LocalStorage>,
    /// Color scheme signal
    pub color_scheme: Arc<dyn ColorScheme>,
    /// Storage key of the preference
    pub key: String,
}

/// Theme state transitions
#[derive(Clone, Copy, Debug, Default)]
pub struct ThemeReducer;

impl ThemeReducer {
    fn persist(theme: Theme, env: &ThemeEnvironment) -> Effect<ThemeAction> {
        let storage = Arc::clone(&env.storage);
        let key = env.key.clone();

        Effect::Future(Box::pin(async move {
            match storage.set_item(&key, theme.as_str()) {
                Ok(()) => {
                    debug!(%theme, "Theme preference saved");
                    None
                },
                Err(err) => {
                    warn!(error = %err, "Theme preference not saved");
                    Some(ThemeAction::PersistFailed(err.to_string()))
                },
            }
        }))
    }
}

impl Reducer for ThemeReducer {
    type State = ThemeState;
    type Action = ThemeAction;
    type Environment = ThemeEnvironment;

    fn reduce(
        &self,
        state: &mut ThemeState,
        action: ThemeAction,
        env: &ThemeEnvironment,
    ) -> SmallVec<[Effect<ThemeAction>; 4]> {
        match action {
            ThemeAction::Initialize { saved, prefers_dark } => {
                state.theme = Theme::resolve(saved.as_deref(), prefers_dark);
                state.initialized = true;
                smallvec![Effect::None]
            },
            ThemeAction::Toggle => {
                state.theme = state.theme.toggled();
                state.persist_error = None;
                smallvec![Self::persist(state.theme, env)]
            },
            ThemeAction::PersistFailed(message) => {
                state.persist_error = Some(message);
                smallvec![Effect::None]
            },
        }
    }
}

/// Runtime store for the theme reducer
pub type ThemeStore = Store<ThemeState, ThemeAction, ThemeEnvironment, ThemeReducer>;

/// Theme preference handle
#[derive(Clone)]
pub struct ThemeController {
    store: ThemeStore,
    env: ThemeEnvironment,
}

impl ThemeController {
    /// Create a controller; the theme is light until [`ThemeController::init`].
    #[must_use]
    pub fn new(env: ThemeEnvironment) -> Self {
        Self {
            store: Store::new(ThemeState::default(), ThemeReducer, env.clone()),
            env,
        }
    }

    /// Resolve the startup theme from storage and the color scheme signal.
    ///
    /// An unreadable storage counts as nothing stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeatbookError::Runtime`] after shutdown.
    pub async fn init(&self) -> Result<Theme> {
        let saved = self.env.storage.get_item(&self.env.key).unwrap_or_else(|err| {
            warn!(error = %err, "Theme preference unreadable");
            None
        });
        let prefers_dark = self.env.color_scheme.prefers_dark();

        self.dispatch(ThemeAction::Initialize { saved, prefers_dark }).await
    }

    /// Flip the theme and wait until it has been persisted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeatbookError::Runtime`] after shutdown.
    pub async fn toggle(&self) -> Result<Theme> {
        self.dispatch(ThemeAction::Toggle).await
    }

    async fn dispatch(&self, action: ThemeAction) -> Result<Theme> {
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(self.theme().await)
    }

    /// Active theme
    pub async fn theme(&self) -> Theme {
        self.store.state(|s| s.theme).await
    }

    /// Whether the dark theme is active
    pub async fn is_dark(&self) -> bool {
        self.store.state(ThemeState::is_dark).await
    }

    /// Snapshot of the theme state
    pub async fn state(&self) -> ThemeState {
        self.store.state(ThemeState::clone).await
    }

    /// Stop accepting theme changes
    pub fn shutdown(&self) {
        self.store.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatbook_testing::{InMemoryLocalStorage, ReducerTest, assertions};

    fn env(storage: InMemoryLocalStorage) -> ThemeEnvironment {
        ThemeEnvironment {
            storage: Arc::new(storage),
            color_scheme: Arc::new(FixedColorScheme(false)),
            key: "theme".to_string(),
        }
    }

    #[test]
    fn startup_resolution() {
        assert_eq!(Theme::resolve(Some("dark"), false), Theme::Dark);
        assert_eq!(Theme::resolve(Some("light"), true), Theme::Light);
        assert_eq!(Theme::resolve(Some("purple"), true), Theme::Light);
        assert_eq!(Theme::resolve(None, true), Theme::Dark);
        assert_eq!(Theme::resolve(None, false), Theme::Light);
    }

    #[test]
    fn initialize_does_not_persist() {
        ReducerTest::new(ThemeReducer)
            .with_env(env(InMemoryLocalStorage::new()))
            .given_state(ThemeState::default())
            .when_action(ThemeAction::Initialize {
                saved: None,
                prefers_dark: true,
            })
            .then_state(|state| {
                assert!(state.is_dark());
                assert!(state.initialized);
                assert_eq!(state.root_class(), Some("dark"));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn toggle_flips_and_persists() {
        ReducerTest::new(ThemeReducer)
            .with_env(env(InMemoryLocalStorage::new()))
            .given_state(ThemeState::default())
            .when_action(ThemeAction::Toggle)
            .then_state(|state| assert!(state.is_dark()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn persist_failure_is_recorded() {
        ReducerTest::new(ThemeReducer)
            .with_env(env(InMemoryLocalStorage::new()))
            .given_state(ThemeState::default())
            .when_action(ThemeAction::PersistFailed("quota exceeded".into()))
            .then_state(|state| {
                assert_eq!(state.persist_error.as_deref(), Some("quota exceeded"));
                assert!(!state.is_dark());
            })
            .run();
    }

    #[tokio::test]
    async fn failed_write_feeds_back_into_state() {
        let storage = InMemoryLocalStorage::new();
        storage.set_fail_writes(true);
        let controller = ThemeController::new(env(storage.clone()));

        assert_eq!(controller.toggle().await.ok(), Some(Theme::Dark));
        let state = controller.state().await;
        assert!(state.persist_error.is_some());
        assert_eq!(storage.peek("theme"), None);
    }
}
