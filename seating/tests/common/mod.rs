//! Shared wiring for the integration suites.

#![allow(dead_code)] // Each suite uses a different subset

use chrono::{DateTime, Utc};
use seatbook::{Backends, Config, SeatbookApp};
use seatbook_core::identity::AuthUser;
use seatbook_testing::{FixedClock, InMemoryDocumentStore, InMemoryLocalStorage, MockIdentityProvider};
use std::sync::Arc;
use std::time::Duration;

/// Components plus direct handles on every backend
pub struct Harness {
    pub app: SeatbookApp,
    pub db: InMemoryDocumentStore,
    pub identity: MockIdentityProvider,
    pub clock: FixedClock,
    pub storage: InMemoryLocalStorage,
    pub config: Config,
}

pub fn ada() -> AuthUser {
    AuthUser::new("u-ada")
        .with_display_name("Ada Lovelace")
        .with_email("ada@example.com")
        .with_phone_number("555-0101")
}

pub fn grace() -> AuthUser {
    AuthUser::new("u-grace")
        .with_display_name("Grace Hopper")
        .with_email("grace@example.com")
}

/// 2024-01-01T00:00:00Z, before every booking the suites make
pub fn new_year_2024() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// App over fresh in-memory backends; `ada()` is the account sign-in returns
pub fn harness() -> Harness {
    harness_with(MockIdentityProvider::with_user(ada()))
}

pub fn harness_with(identity: MockIdentityProvider) -> Harness {
    let db = InMemoryDocumentStore::new();
    let clock = FixedClock::new(new_year_2024());
    let storage = InMemoryLocalStorage::new();
    let config = Config::default();

    let app = SeatbookApp::new(
        &config,
        Backends {
            db: Arc::new(db.clone()),
            identity: Arc::new(identity.clone()),
            clock: Arc::new(clock.clone()),
            storage: Arc::new(storage.clone()),
        },
    );

    Harness {
        app,
        db,
        identity,
        clock,
        storage,
        config,
    }
}

/// A second app instance over the same store and clock, signing in as `user`
pub fn second_app(h: &Harness, user: AuthUser) -> SeatbookApp {
    SeatbookApp::new(
        &h.config,
        Backends {
            db: Arc::new(h.db.clone()),
            identity: Arc::new(MockIdentityProvider::with_user(user)),
            clock: Arc::new(h.clock.clone()),
            storage: Arc::new(InMemoryLocalStorage::new()),
        },
    )
}

/// Poll `check` until it holds or a second has passed
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
