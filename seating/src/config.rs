//! Configuration management for the seat reservation client.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Document store collection names
    pub collections: CollectionsConfig,
    /// Client-local preference storage
    pub preferences: PreferencesConfig,
    /// Session display fallbacks
    pub session: SessionConfig,
    /// Log filter (trace, debug, info, warn, error, or an `EnvFilter` directive)
    pub log_level: String,
}

/// Document store collection names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Seat documents
    pub seats: String,
    /// Reservation documents
    pub reservations: String,
    /// Profile documents, keyed by user id
    pub user_profiles: String,
}

/// Preference storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// JSON file backing client-local storage
    pub path: PathBuf,
    /// Key the theme preference is stored under
    pub theme_key: String,
    /// Environment color-scheme signal used when no theme is stored
    pub prefers_dark: bool,
}

/// Session display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name shown when the provider has none
    pub default_display_name: String,
    /// Email shown when the provider has none
    pub default_email: String,
    /// Avatar shown when the provider has none
    pub default_photo_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// every key it does not resolve.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            collections: CollectionsConfig {
                seats: var("SEATBOOK_SEATS_COLLECTION", "seats"),
                reservations: var("SEATBOOK_RESERVATIONS_COLLECTION", "reservations"),
                user_profiles: var("SEATBOOK_PROFILES_COLLECTION", "userProfiles"),
            },
            preferences: PreferencesConfig {
                path: PathBuf::from(var("SEATBOOK_PREFERENCES_PATH", "seatbook-preferences.json")),
                theme_key: "theme".to_string(),
                prefers_dark: lookup("SEATBOOK_COLOR_SCHEME")
                    .is_some_and(|scheme| scheme.trim().eq_ignore_ascii_case("dark")),
            },
            session: SessionConfig {
                default_display_name: "User".to_string(),
                default_email: "user@test.com".to_string(),
                default_photo_url: var(
                    "SEATBOOK_DEFAULT_PHOTO_URL",
                    "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=128&h=128&fit=crop&crop=face",
                ),
            },
            log_level: var("RUST_LOG", "info"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_backend_layout() {
        let config = Config::default();
        assert_eq!(config.collections.seats, "seats");
        assert_eq!(config.collections.reservations, "reservations");
        assert_eq!(config.collections.user_profiles, "userProfiles");
        assert_eq!(config.preferences.theme_key, "theme");
        assert!(!config.preferences.prefers_dark);
        assert_eq!(config.session.default_display_name, "User");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SEATBOOK_SEATS_COLLECTION", "staging_seats"),
            ("SEATBOOK_COLOR_SCHEME", "Dark"),
            ("SEATBOOK_PREFERENCES_PATH", "/tmp/prefs.json"),
            ("RUST_LOG", "seatbook=debug"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.collections.seats, "staging_seats");
        assert_eq!(config.collections.reservations, "reservations");
        assert!(config.preferences.prefers_dark);
        assert_eq!(config.preferences.path, PathBuf::from("/tmp/prefs.json"));
        assert_eq!(config.log_level, "seatbook=debug");
    }
}
