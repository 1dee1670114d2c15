//! Seatbook Demo
//!
//! Walks through the client flows against the in-memory backends:
//! - Theme resolution and toggle (persisted to a JSON file)
//! - Seat grid bootstrap
//! - Sign-in with profile creation
//! - Booking, a rejected double booking, and cancellation
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=seatbook=debug cargo run --bin seatbook
//! ```

use seatbook::{
    Backends, BookingRequest, Config, FileLocalStorage, ProfileUpdate, SeatbookApp, SeatbookError,
};
use seatbook_core::environment::SystemClock;
use seatbook_core::identity::AuthUser;
use seatbook_testing::{InMemoryDocumentStore, MockIdentityProvider};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n💺 ============================================");
    println!("   Seatbook - Live Demo");
    println!("============================================\n");

    let identity = MockIdentityProvider::with_user(
        AuthUser::new("demo-user")
            .with_display_name("Demo User")
            .with_email("demo@example.com"),
    );
    let app = SeatbookApp::new(
        &config,
        Backends {
            db: Arc::new(InMemoryDocumentStore::new()),
            identity: Arc::new(identity),
            clock: Arc::new(SystemClock),
            storage: Arc::new(FileLocalStorage::new(&config.preferences.path)),
        },
    );

    // ========== Startup ==========

    let (observer, source) = app.start().await?;
    println!("✓ Theme: {}", app.theme.theme().await);
    println!("✓ Seats loaded from {source:?}: {} available\n", app.seats.available().await.len());

    let theme = app.theme.toggle().await?;
    println!("🌓 Toggled theme to {theme} (saved to {})\n", config.preferences.path.display());

    // ========== Sign-in ==========

    let user = app.sign_in().await?;
    println!("1️⃣  Signed in as {}", app.session.display_name().await);
    app.profiles
        .update(&user.uid, &ProfileUpdate::default().phone("555-0100"))
        .await?;
    if let Some(profile) = app.profiles.profile().await {
        println!("   Profile: {} <{}> {}\n", profile.display_name, profile.email, profile.phone);
    }

    // ========== Booking ==========

    let today = chrono::Local::now().date_naive() + chrono::Days::new(1);
    let request = BookingRequest::new("B2", "09:00-11:00", today.format("%Y-%m-%d").to_string());

    let id = app.reservations.create(&request).await?;
    println!("2️⃣  Booked B2 for {} {} (reservation {id})", request.date, request.time_slot);
    println!("   Seats available now: {}", app.seats.available().await.len());

    match app.reservations.create(&request).await {
        Err(SeatbookError::SeatUnavailable(seat)) => {
            println!("   Second booking of {seat} rejected as expected\n");
        },
        other => println!("   Unexpected second booking result: {other:?}\n"),
    }

    // ========== Cancellation ==========

    app.reservations.cancel(&id).await?;
    println!("3️⃣  Cancelled {id}");
    println!("   Seats available now: {}", app.seats.available().await.len());
    println!("   Past reservations: {}\n", app.reservations.past().await.len());

    app.sign_out().await?;
    println!("👋 Signed out");

    observer.unsubscribe();
    app.shutdown();
    Ok(())
}
