//! Seatbook - seat reservation client
//!
//! Users sign in, look at a 4x4 grid of seats, book a seat for a time slot,
//! cancel bookings and keep a small profile. Persistence and identity belong
//! to managed backends reached through the
//! [`DocumentStore`](seatbook_core::document::DocumentStore) and
//! [`IdentityProvider`](seatbook_core::identity::IdentityProvider) seams; this
//! crate keeps the projections a UI renders from.
//!
//! # Components
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  SessionManager  │◄──── IdentityProvider
//!                 └──────────────────┘
//!                   │             │
//!                   ▼             ▼
//! ┌──────────────┐  ┌───────────────────┐  ┌──────────────┐
//! │ SeatRegistry │◄─│ ReservationLedger │  │ ProfileStore │
//! └──────────────┘  └───────────────────┘  └──────────────┘
//!        │                    │                   │
//!        └────────────────────┴───────────────────┘
//!                             │
//!                             ▼
//!                       DocumentStore
//! ```
//!
//! The session and theme are reducers run by the runtime store. Seats,
//! reservations and profiles are projections behind `tokio` locks, refreshed
//! after every write.
//!
//! # Booking
//!
//! A booking writes the reservation and marks the seat occupied in one batch
//! that only commits while the seat is still available:
//!
//! ```text
//! require seats/{id}.status == "available"
//! create  reservations/{new}   status = "upcoming"
//! update  seats/{id}           status = "occupied", reservedBy, reservedUntil
//! ```
//!
//! Two users racing for the same seat cannot both win; the loser gets
//! [`SeatbookError::SeatUnavailable`].

pub mod app;
pub mod booking;
pub mod config;
pub mod error;
pub mod profile;
pub mod reservations;
pub mod seats;
pub mod session;
pub mod storage;
pub mod theme;
pub mod types;

pub use app::{Backends, SeatbookApp};
pub use booking::{BookingRequest, BookingWindow, TimeSlot};
pub use config::Config;
pub use error::{Result, SeatbookError};
pub use profile::ProfileStore;
pub use reservations::ReservationLedger;
pub use seats::{SeatRegistry, SeatSource};
pub use session::{SessionManager, SessionObserver};
pub use storage::FileLocalStorage;
pub use theme::{Theme, ThemeController};
pub use types::{
    ProfileUpdate, Reservation, ReservationId, ReservationStatus, Seat, SeatNumber, SeatStatus,
    UserProfile,
};
