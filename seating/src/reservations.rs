//! Reservation ledger and booking workflow.
//!
//! The ledger is an in-memory projection of the signed-in user's
//! reservations. Creating or cancelling a reservation writes the reservation
//! and the seat it holds in one batch, so the two documents never disagree.
//! A booking is conditional on the seat still being available; of two
//! concurrent bookings of one seat exactly one commits.

use crate::booking::{BookingRequest, BookingWindow, TimeSlot};
use crate::error::{Result, SeatbookError};
use crate::seats::{SeatRegistry, field as seat_field, occupancy_fields};
use crate::session::SessionManager;
use crate::types::{Reservation, ReservationId, ReservationStatus, SeatNumber, SeatStatus};
use chrono::{DateTime, Local, Utc};
use seatbook_core::document::{
    Direction, Document, DocumentStore, DocumentStoreError, Fields, Query, Value, WriteBatch,
};
use seatbook_core::environment::Clock;
use seatbook_core::identity::{AuthUser, UserId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Field names of reservation documents
pub(crate) mod field {
    pub const SEAT_NUMBER: &str = "seatNumber";
    pub const USER_ID: &str = "userId";
    pub const USER_EMAIL: &str = "userEmail";
    pub const USER_NAME: &str = "userName";
    pub const START_TIME: &str = "startTime";
    pub const END_TIME: &str = "endTime";
    pub const DATE: &str = "date";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

#[derive(Debug, Default)]
struct LedgerState {
    reservations: Vec<Reservation>,
    loading: bool,
    error: Option<String>,
}

/// Map a reservation document.
///
/// # Errors
///
/// Returns [`SeatbookError::MalformedDocument`] when a required field is
/// missing or invalid.
pub fn reservation_from_document(doc: &Document) -> Result<Reservation> {
    let malformed = |reason: String| SeatbookError::MalformedDocument {
        id: doc.id.clone(),
        reason,
    };
    let text = |name: &str| {
        doc.get_str(name)
            .ok_or_else(|| malformed(format!("missing {name}")))
    };
    let timestamp = |name: &str| {
        doc.get_timestamp(name)
            .ok_or_else(|| malformed(format!("missing {name}")))
    };

    Ok(Reservation {
        id: ReservationId::from(doc.id.clone()),
        seat_number: text(field::SEAT_NUMBER)?
            .parse::<SeatNumber>()
            .map_err(|e| malformed(e.to_string()))?,
        user_id: UserId::new(text(field::USER_ID)?),
        user_email: doc.get_str(field::USER_EMAIL).map(ToString::to_string),
        user_name: doc.get_str(field::USER_NAME).map(ToString::to_string),
        start_time: timestamp(field::START_TIME)?,
        end_time: timestamp(field::END_TIME)?,
        date: timestamp(field::DATE)?,
        status: text(field::STATUS)?
            .parse::<ReservationStatus>()
            .map_err(|e| malformed(e.to_string()))?,
        created_at: doc.get_timestamp(field::CREATED_AT),
    })
}

fn reservation_fields(
    seat_number: SeatNumber,
    user: &AuthUser,
    window: &BookingWindow,
    now: DateTime<Utc>,
) -> Fields {
    Fields::from([
        (field::SEAT_NUMBER.to_string(), Value::from(seat_number)),
        (field::USER_ID.to_string(), Value::from(user.uid.as_str())),
        (field::USER_EMAIL.to_string(), Value::from(user.email.clone())),
        (field::USER_NAME.to_string(), Value::from(user.display_name.clone())),
        (field::START_TIME.to_string(), Value::from(window.start)),
        (field::END_TIME.to_string(), Value::from(window.end)),
        (field::DATE.to_string(), Value::from(window.date)),
        (field::STATUS.to_string(), Value::from(ReservationStatus::Upcoming)),
        (field::CREATED_AT.to_string(), Value::from(now)),
    ])
}

/// The signed-in user's reservations, plus the booking workflow.
///
/// Cloning yields another handle to the same ledger.
#[derive(Clone)]
pub struct ReservationLedger {
    db: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    session: SessionManager,
    seats: SeatRegistry,
    collection: String,
    state: Arc<RwLock<LedgerState>>,
}

impl ReservationLedger {
    /// Create an empty ledger over `collection`
    #[must_use]
    pub fn new(
        db: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        session: SessionManager,
        seats: SeatRegistry,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            db,
            clock,
            session,
            seats,
            collection: collection.into(),
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Refresh the projection with the signed-in user's reservations, newest
    /// first. Does nothing when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Read`] when the query fails; the message is
    /// also kept in [`ReservationLedger::error`].
    pub async fn load(&self) -> Result<()> {
        let Some(user_id) = self.session.user_id().await else {
            debug!("No signed-in user; reservations not loaded");
            return Ok(());
        };

        match self.fetch(&user_id).await {
            Ok(reservations) => {
                debug!(count = reservations.len(), user = %user_id, "Reservation projection refreshed");
                self.state.write().await.reservations = reservations;
                Ok(())
            },
            Err(err) => {
                error!(error = %err, "Error fetching reservations");
                self.state.write().await.error = Some(err.to_string());
                Err(err)
            },
        }
    }

    async fn fetch(&self, user_id: &UserId) -> Result<Vec<Reservation>> {
        let query = Query::collection(&self.collection)
            .where_eq(field::USER_ID, user_id.as_str())
            .order_by(field::CREATED_AT, Direction::Descending);

        self.db
            .query(query)
            .await
            .map_err(SeatbookError::Read)?
            .iter()
            .map(reservation_from_document)
            .collect()
    }

    /// Book a seat for a time slot on a day (interpreted in local time).
    ///
    /// Writes the reservation and marks the seat occupied until the slot
    /// ends, in one batch that only commits while the seat is available.
    /// Both projections are refreshed afterwards.
    ///
    /// # Errors
    ///
    /// - [`SeatbookError::NotAuthenticated`] without a signed-in user
    /// - [`SeatbookError::Validation`] for a malformed seat, slot or date
    /// - [`SeatbookError::SeatNotFound`] when the seat has no document
    /// - [`SeatbookError::SeatUnavailable`] when the seat is already held
    /// - [`SeatbookError::Read`] / [`SeatbookError::Write`] on store failure
    pub async fn create(&self, request: &BookingRequest) -> Result<ReservationId> {
        self.begin().await;
        let result = self.try_create(request).await;

        if let Err(err) = &result {
            metrics::counter!("seatbook.reservations.rejected", "reason" => rejection_reason(err))
                .increment(1);
        }
        self.finish(result, "Error creating reservation").await
    }

    async fn try_create(&self, request: &BookingRequest) -> Result<ReservationId> {
        let user = self.session.current_user().await.ok_or(SeatbookError::NotAuthenticated)?;
        let seat_number: SeatNumber = request.seat_number.parse()?;
        let slot: TimeSlot = request.time_slot.parse()?;
        let window = BookingWindow::resolve(&request.date, &slot, &Local)?;

        let seat = self
            .seats
            .find_document(&seat_number)
            .await?
            .ok_or(SeatbookError::SeatNotFound(seat_number))?;

        let now = self.clock.now();
        let batch = WriteBatch::new()
            .require(
                self.seats.collection(),
                seat.id.clone(),
                seat_field::STATUS,
                SeatStatus::Available,
            )
            .create(&self.collection, reservation_fields(seat_number, &user, &window, now))
            .update(
                self.seats.collection(),
                seat.id,
                occupancy_fields(SeatStatus::Occupied, Some(&user.uid), Some(window.end), now),
            );

        let created = self.db.commit(batch).await.map_err(|err| match err {
            DocumentStoreError::PreconditionFailed { .. } => SeatbookError::SeatUnavailable(seat_number),
            other => SeatbookError::Write(other),
        })?;
        let id = created.into_iter().next().map(ReservationId::from).ok_or_else(|| {
            SeatbookError::Write(DocumentStoreError::Other(
                "batch returned no reservation id".to_string(),
            ))
        })?;

        metrics::counter!("seatbook.reservations.created").increment(1);
        info!(
            reservation_id = %id,
            seat = %seat_number,
            slot = %slot,
            user = %user.uid,
            "Reservation created"
        );

        self.refresh().await;
        Ok(id)
    }

    /// Cancel a reservation and release its seat.
    ///
    /// The batch only commits while the stored reservation belongs to the
    /// signed-in user and is still upcoming. The seat is released only while
    /// the reservation's owner still holds it.
    ///
    /// A reservation missing from the local projection (stale cache) is
    /// still marked cancelled, but its seat cannot be identified and is left
    /// as it is. So is a seat that has since passed to someone else.
    ///
    /// # Errors
    ///
    /// - [`SeatbookError::NotAuthenticated`] without a signed-in user
    /// - [`SeatbookError::Validation`] when the reservation is no longer
    ///   upcoming, locally or in the store
    /// - [`SeatbookError::Read`] / [`SeatbookError::Write`] on store failure
    pub async fn cancel(&self, id: &ReservationId) -> Result<()> {
        self.begin().await;
        let result = self.try_cancel(id).await;
        self.finish(result, "Error cancelling reservation").await
    }

    async fn try_cancel(&self, id: &ReservationId) -> Result<()> {
        let user_id = self.session.user_id().await.ok_or(SeatbookError::NotAuthenticated)?;
        let local = self.find(id).await;
        if let Some(reservation) = &local {
            if reservation.status != ReservationStatus::Upcoming {
                return Err(SeatbookError::Validation(format!(
                    "Reservation {id} is already {}",
                    reservation.status
                )));
            }
        }

        let now = self.clock.now();
        let mut batch = self.cancellation(id, &user_id, now);

        match &local {
            Some(reservation) => match self.seats.find_document(&reservation.seat_number).await? {
                Some(seat) => {
                    batch = batch
                        .require(
                            self.seats.collection(),
                            seat.id.clone(),
                            seat_field::RESERVED_BY,
                            reservation.user_id.as_str(),
                        )
                        .update(
                            self.seats.collection(),
                            seat.id,
                            occupancy_fields(SeatStatus::Available, None, None, now),
                        );
                },
                None => debug!(seat = %reservation.seat_number, "No seat document to release"),
            },
            None => warn!(reservation_id = %id, "Reservation not in local projection; seat release skipped"),
        }

        let committed = match self.db.commit(batch).await {
            Err(DocumentStoreError::PreconditionFailed { collection, .. })
                if collection == self.seats.collection() =>
            {
                warn!(reservation_id = %id, "Seat no longer held by this reservation; seat release skipped");
                self.db.commit(self.cancellation(id, &user_id, now)).await
            },
            other => other,
        };

        match committed {
            Ok(_) => {},
            Err(DocumentStoreError::PreconditionFailed { .. }) => {
                self.refresh().await;
                return Err(SeatbookError::Validation(format!(
                    "Reservation {id} is no longer upcoming"
                )));
            },
            Err(err) => return Err(SeatbookError::Write(err)),
        }

        metrics::counter!("seatbook.reservations.cancelled").increment(1);
        info!(reservation_id = %id, "Reservation cancelled successfully");

        self.refresh().await;
        Ok(())
    }

    /// Status change of a cancellation, guarded on the stored reservation
    /// being the user's and still upcoming.
    fn cancellation(&self, id: &ReservationId, user_id: &UserId, now: DateTime<Utc>) -> WriteBatch {
        WriteBatch::new()
            .require(
                &self.collection,
                id.document_id().clone(),
                field::USER_ID,
                user_id.as_str(),
            )
            .require(
                &self.collection,
                id.document_id().clone(),
                field::STATUS,
                ReservationStatus::Upcoming,
            )
            .update(
                &self.collection,
                id.document_id().clone(),
                Fields::from([
                    (field::STATUS.to_string(), Value::from(ReservationStatus::Cancelled)),
                    (field::UPDATED_AT.to_string(), Value::from(now)),
                ]),
            )
    }

    /// Reload seats and reservations side by side. Failures are logged.
    async fn refresh(&self) {
        let (source, reservations) = tokio::join!(self.seats.load(), self.load());
        debug!(?source, "Seats refreshed after write");
        if let Err(err) = reservations {
            warn!(error = %err, "Reservation refresh failed");
        }
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.loading = true;
        state.error = None;
    }

    async fn finish<T>(&self, result: Result<T>, context: &'static str) -> Result<T> {
        let mut state = self.state.write().await;
        state.loading = false;
        if let Err(err) = &result {
            error!(error = %err, "{context}");
            state.error = Some(err.to_string());
        }
        result
    }

    /// Local copy of one of the signed-in user's reservations
    async fn find(&self, id: &ReservationId) -> Option<Reservation> {
        let user_id = self.session.user_id().await?;
        self.state
            .read()
            .await
            .reservations
            .iter()
            .find(|r| &r.id == id && r.user_id == user_id)
            .cloned()
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// The signed-in user's reservations, newest first
    pub async fn reservations(&self) -> Vec<Reservation> {
        let Some(user_id) = self.session.user_id().await else {
            return Vec::new();
        };
        self.state
            .read()
            .await
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Upcoming reservations that have not started yet
    pub async fn upcoming(&self) -> Vec<Reservation> {
        let now = self.clock.now();
        let mut reservations = self.reservations().await;
        reservations.retain(|r| r.is_upcoming_at(now));
        reservations
    }

    /// Every reservation that is not upcoming: started, over or cancelled
    pub async fn past(&self) -> Vec<Reservation> {
        let now = self.clock.now();
        let mut reservations = self.reservations().await;
        reservations.retain(|r| !r.is_upcoming_at(now));
        reservations
    }

    /// Whether a create or cancel is in flight
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

const fn rejection_reason(err: &SeatbookError) -> &'static str {
    match err {
        SeatbookError::NotAuthenticated => "unauthenticated",
        SeatbookError::Validation(_) => "invalid",
        SeatbookError::SeatUnavailable(_) => "unavailable",
        SeatbookError::SeatNotFound(_) => "not_found",
        _ => "backend",
    }
}
