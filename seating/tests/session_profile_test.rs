//! Session manager, profile store, theme preference and the app shell.
//!
//! Run with: `cargo test -p seatbook --test session_profile_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::{ada, eventually, grace, harness, harness_with};
use seatbook::{ProfileUpdate, SeatSource, SeatbookError, Theme};
use seatbook_core::document::{DocumentId, Fields, Value};
use seatbook_core::environment::LocalStorage;
use seatbook_core::identity::{AuthUser, IdentityError};
use seatbook_testing::{InMemoryLocalStorage, MockIdentityProvider};
use std::sync::Arc;

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn sign_in_and_out() {
    let h = harness();
    assert!(h.app.session.is_loading().await);

    let user = h.app.session.sign_in().await.unwrap();
    assert_eq!(user, ada());
    assert!(h.app.session.is_authenticated().await);
    assert!(!h.app.session.is_loading().await);
    assert_eq!(h.app.session.display_name().await, "Ada Lovelace");
    assert_eq!(h.app.session.email().await, "ada@example.com");

    h.app.session.sign_out().await.unwrap();
    assert!(!h.app.session.is_authenticated().await);
    assert!(h.app.session.current_user().await.is_none());
}

#[tokio::test]
async fn sign_in_failure_is_recorded() {
    let h = harness();
    h.identity.fail_next_sign_in(IdentityError::Provider("auth/popup-blocked".into()));

    let result = h.app.session.sign_in().await;

    assert_eq!(
        result,
        Err(SeatbookError::Auth(IdentityError::Provider("auth/popup-blocked".into())))
    );
    assert_eq!(h.app.session.error().await.as_deref(), Some("auth/popup-blocked"));
    assert!(!h.app.session.is_authenticated().await);
    assert!(!h.app.session.is_loading().await);

    h.app.session.clear_error().await.unwrap();
    assert!(h.app.session.error().await.is_none());
}

#[tokio::test]
async fn sign_out_failure_keeps_user() {
    let h = harness();
    h.app.session.sign_in().await.unwrap();
    h.identity.fail_next_sign_out(IdentityError::Network("offline".into()));

    let result = h.app.session.sign_out().await;

    assert!(matches!(result, Err(SeatbookError::Auth(_))));
    assert!(h.app.session.is_authenticated().await);
    assert_eq!(h.app.session.error().await.as_deref(), Some("Network error: offline"));
}

#[tokio::test]
async fn display_fallbacks_without_provider_values() {
    let h = harness_with(MockIdentityProvider::with_user(AuthUser::new("u-anon")));
    h.app.session.sign_in().await.unwrap();

    assert_eq!(h.app.session.display_name().await, "User");
    assert_eq!(h.app.session.email().await, h.config.session.default_email);
    assert_eq!(h.app.session.photo_url().await, h.config.session.default_photo_url);
}

#[tokio::test]
async fn observer_mirrors_provider_session() {
    let h = harness_with(MockIdentityProvider::signed_in_as(ada()));
    let session = &h.app.session;

    let observer = session.observe_session();
    assert!(eventually(|| async move { session.is_authenticated().await }).await);
    assert!(!session.is_loading().await);

    // Token expired elsewhere
    h.identity.simulate_session_change(None);
    assert!(eventually(|| async move { !session.is_authenticated().await }).await);

    h.identity.simulate_session_change(Some(grace()));
    assert!(eventually(|| async move { session.current_user().await == Some(grace()) }).await);

    observer.unsubscribe();
    tokio::task::yield_now().await;
    h.identity.simulate_session_change(None);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(session.current_user().await, Some(grace()));
}

#[tokio::test]
async fn dropping_observer_stops_listening() {
    let h = harness();
    let session = &h.app.session;

    {
        let _observer = session.observe_session();
        assert!(eventually(|| async move { !session.is_loading().await }).await);
    }

    tokio::task::yield_now().await;
    h.identity.simulate_session_change(Some(ada()));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!session.is_authenticated().await);
}

// ============================================================================
// Profiles
// ============================================================================

#[tokio::test]
async fn load_without_document_synthesizes_from_identity() {
    let h = harness();
    h.app.session.sign_in().await.unwrap();

    h.app.profiles.load(&ada().uid).await.unwrap();

    let profile = h.app.profiles.profile().await.unwrap();
    assert_eq!(profile.display_name, "Ada Lovelace");
    assert_eq!(profile.email, "ada@example.com");
    assert_eq!(profile.phone, "555-0101");
    assert!(profile.email_notifications);
    assert!(!profile.sms_notifications);
    assert!(profile.push_notifications);
    assert!(profile.created_at.is_none());
    assert!(h.db.is_empty("userProfiles"));
}

#[tokio::test]
async fn initialize_creates_missing_profile() {
    let h = harness();
    h.app.session.sign_in().await.unwrap();

    h.app.profiles.initialize(&ada().uid).await;

    let doc = h.db.document("userProfiles", &DocumentId::new("u-ada")).unwrap();
    assert_eq!(doc.get_str("displayName"), Some("Ada Lovelace"));
    assert_eq!(doc.get_bool("smsNotifications"), Some(false));
    assert_eq!(doc.get_timestamp("createdAt"), Some(common::new_year_2024()));

    let profile = h.app.profiles.profile().await.unwrap();
    assert_eq!(profile.created_at, Some(common::new_year_2024()));
}

#[tokio::test]
async fn initialize_keeps_existing_profile() {
    let h = harness();
    h.db.insert(
        "userProfiles",
        DocumentId::new("u-ada"),
        Fields::from([
            ("displayName".to_string(), Value::from("Countess")),
            ("pushNotifications".to_string(), Value::from(false)),
        ]),
    );
    h.app.session.sign_in().await.unwrap();

    h.app.profiles.initialize(&ada().uid).await;

    let profile = h.app.profiles.profile().await.unwrap();
    assert_eq!(profile.display_name, "Countess");
    assert!(!profile.push_notifications);
    assert_eq!(h.db.write_count(), 0);
}

#[tokio::test]
async fn initialize_without_session_or_with_failures_is_silent() {
    let h = harness();
    h.app.profiles.initialize(&ada().uid).await;
    assert!(h.app.profiles.profile().await.is_none());

    h.app.session.sign_in().await.unwrap();
    h.db.fail_writes("denied");
    h.app.profiles.initialize(&ada().uid).await;
    assert!(h.db.is_empty("userProfiles"));
}

#[tokio::test]
async fn update_patches_fields_and_timestamp() {
    let h = harness();
    h.app.session.sign_in().await.unwrap();
    h.app.profiles.initialize(&ada().uid).await;
    h.clock.advance(chrono::Duration::hours(1));

    h.app
        .profiles
        .update(&ada().uid, &ProfileUpdate::default().phone("555-0199").notifications(false, true, true))
        .await
        .unwrap();

    let profile = h.app.profiles.profile().await.unwrap();
    assert_eq!(profile.phone, "555-0199");
    assert_eq!(profile.display_name, "Ada Lovelace");
    assert!(!profile.email_notifications);
    assert!(profile.sms_notifications);
    assert_eq!(profile.created_at, Some(common::new_year_2024()));
    assert_eq!(
        profile.updated_at,
        Some(common::new_year_2024() + chrono::Duration::hours(1))
    );
}

#[tokio::test]
async fn update_without_document_creates_it() {
    let h = harness();
    h.app.session.sign_in().await.unwrap();

    h.app
        .profiles
        .update(&ada().uid, &ProfileUpdate::default().display_name("Ada"))
        .await
        .unwrap();

    let doc = h.db.document("userProfiles", &DocumentId::new("u-ada")).unwrap();
    assert_eq!(doc.get_str("displayName"), Some("Ada"));
    assert!(doc.get_timestamp("createdAt").is_some());
    assert!(doc.get_timestamp("updatedAt").is_some());
}

#[tokio::test]
async fn profile_failures_are_recorded() {
    let h = harness();
    h.app.session.sign_in().await.unwrap();
    h.db.fail_reads("offline");

    let result = h.app.profiles.load(&ada().uid).await;

    assert!(matches!(result, Err(SeatbookError::Read(_))));
    assert!(h.app.profiles.error().await.unwrap().contains("offline"));
    assert!(!h.app.profiles.is_loading().await);

    h.app.profiles.clear_error().await;
    assert!(h.app.profiles.error().await.is_none());
}

// ============================================================================
// Theme
// ============================================================================

#[tokio::test]
async fn theme_follows_color_scheme_when_nothing_is_stored() {
    let mut h = harness();
    h.config.preferences.prefers_dark = true;
    let app = seatbook::SeatbookApp::new(
        &h.config,
        seatbook::Backends {
            db: Arc::new(h.db.clone()),
            identity: Arc::new(h.identity.clone()),
            clock: Arc::new(h.clock.clone()),
            storage: Arc::new(h.storage.clone()),
        },
    );

    assert_eq!(app.theme.init().await.unwrap(), Theme::Dark);
    assert_eq!(h.storage.peek("theme"), None);
}

#[tokio::test]
async fn stored_theme_wins_over_color_scheme() {
    let storage = InMemoryLocalStorage::with_item("theme", "light");
    let h = harness();
    let app = seatbook::SeatbookApp::with_color_scheme(
        &h.config,
        seatbook::Backends {
            db: Arc::new(h.db.clone()),
            identity: Arc::new(h.identity.clone()),
            clock: Arc::new(h.clock.clone()),
            storage: Arc::new(storage),
        },
        Arc::new(seatbook::theme::FixedColorScheme(true)),
    );

    assert_eq!(app.theme.init().await.unwrap(), Theme::Light);
}

#[tokio::test]
async fn toggling_twice_restores_state_and_storage() {
    let h = harness();
    h.storage.set_item("theme", "light").unwrap();
    let theme = &h.app.theme;
    theme.init().await.unwrap();
    let before = theme.state().await;

    assert_eq!(theme.toggle().await.unwrap(), Theme::Dark);
    assert_eq!(h.storage.peek("theme").as_deref(), Some("dark"));
    assert_eq!(theme.state().await.root_class(), Some("dark"));

    assert_eq!(theme.toggle().await.unwrap(), Theme::Light);
    assert_eq!(h.storage.peek("theme").as_deref(), Some("light"));
    assert_eq!(theme.state().await, before);
}

// ============================================================================
// App shell
// ============================================================================

#[tokio::test]
async fn full_session_through_app_shell() {
    let h = harness();

    let (observer, source) = h.app.start().await.unwrap();
    assert_eq!(source, SeatSource::Bootstrapped);
    assert!(observer.is_active());

    let user = h.app.sign_in().await.unwrap();
    assert_eq!(user.uid, ada().uid);
    assert!(h.db.document("userProfiles", &DocumentId::new("u-ada")).is_some());
    assert!(h.app.profiles.profile().await.is_some());

    h.app.sign_out().await.unwrap();
    assert!(h.app.profiles.profile().await.is_none());
    assert!(!h.app.session.is_authenticated().await);

    observer.unsubscribe();
    h.app.shutdown();
    assert!(matches!(
        h.app.theme.toggle().await,
        Err(SeatbookError::Runtime(_))
    ));
}
