//! Seat registry.
//!
//! In-memory projection of the 4x4 seat grid, synchronized from the `seats`
//! collection. An empty collection is bootstrapped with the default layout;
//! when the store cannot be read, the projection falls back to an offline
//! copy of that layout so the grid still renders.

use crate::error::{Result, SeatbookError};
use crate::types::{Seat, SeatNumber, SeatStatus};
use chrono::{DateTime, Utc};
use seatbook_core::document::{Document, DocumentId, DocumentStore, Fields, Query, Value, WriteBatch};
use seatbook_core::environment::Clock;
use seatbook_core::identity::UserId;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Field names of seat documents
pub(crate) mod field {
    pub const SEAT_NUMBER: &str = "seatNumber";
    pub const STATUS: &str = "status";
    pub const RESERVED_BY: &str = "reservedBy";
    pub const RESERVED_UNTIL: &str = "reservedUntil";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Where the current projection came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeatSource {
    /// Read from existing seat documents
    Store,
    /// The collection was empty and has just been seeded
    Bootstrapped,
    /// The store failed; the offline default layout is shown
    Fallback,
}

#[derive(Debug, Default)]
struct SeatProjection {
    seats: Vec<Seat>,
    source: Option<SeatSource>,
    loading: bool,
    error: Option<String>,
}

/// The offline layout: every seat available, ids equal to seat numbers.
#[must_use]
pub fn default_layout() -> Vec<Seat> {
    SeatNumber::grid()
        .into_iter()
        .map(|number| Seat::available(DocumentId::new(number.to_string()), number))
        .collect()
}

/// Map a seat document.
///
/// # Errors
///
/// Returns [`SeatbookError::MalformedDocument`] when the seat number or
/// status is missing or invalid.
pub fn seat_from_document(doc: &Document) -> Result<Seat> {
    let malformed = |reason: String| SeatbookError::MalformedDocument {
        id: doc.id.clone(),
        reason,
    };

    let seat_number = doc
        .get_str(field::SEAT_NUMBER)
        .ok_or_else(|| malformed(format!("missing {}", field::SEAT_NUMBER)))?
        .parse::<SeatNumber>()
        .map_err(|e| malformed(e.to_string()))?;
    let status = doc
        .get_str(field::STATUS)
        .ok_or_else(|| malformed(format!("missing {}", field::STATUS)))?
        .parse::<SeatStatus>()
        .map_err(|e| malformed(e.to_string()))?;

    Ok(Seat {
        id: doc.id.clone(),
        seat_number,
        status,
        reserved_by: doc.get_str(field::RESERVED_BY).map(UserId::new),
        reserved_until: doc.get_timestamp(field::RESERVED_UNTIL),
    })
}

/// Fields written when a seat changes occupancy.
///
/// The holder is recorded only for an occupied seat with both holder and
/// expiry given; otherwise both are cleared.
pub(crate) fn occupancy_fields(
    status: SeatStatus,
    reserved_by: Option<&UserId>,
    reserved_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Fields {
    let holder = match (status, reserved_by, reserved_until) {
        (SeatStatus::Occupied, Some(user), Some(until)) => Some((user, until)),
        _ => None,
    };

    Fields::from([
        (field::STATUS.to_string(), Value::from(status)),
        (field::UPDATED_AT.to_string(), Value::from(now)),
        (
            field::RESERVED_BY.to_string(),
            Value::from(holder.map(|(user, _)| user.as_str())),
        ),
        (
            field::RESERVED_UNTIL.to_string(),
            Value::from(holder.map(|(_, until)| until)),
        ),
    ])
}

/// Seat grid projection.
///
/// Cloning yields another handle to the same projection.
#[derive(Clone)]
pub struct SeatRegistry {
    db: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    collection: String,
    projection: Arc<RwLock<SeatProjection>>,
}

impl SeatRegistry {
    /// Create an empty registry over `collection`
    #[must_use]
    pub fn new(db: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, collection: impl Into<String>) -> Self {
        Self {
            db,
            clock,
            collection: collection.into(),
            projection: Arc::new(RwLock::new(SeatProjection::default())),
        }
    }

    /// Name of the seat collection
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Refresh the projection from the store.
    ///
    /// Never fails: store errors are recorded in [`SeatRegistry::error`] and
    /// the offline layout is shown instead.
    pub async fn load(&self) -> SeatSource {
        {
            let mut projection = self.projection.write().await;
            projection.loading = true;
            projection.error = None;
        }

        let (seats, source) = match self.fetch().await {
            Ok(seats) if !seats.is_empty() => (seats, SeatSource::Store),
            Ok(_) => self.bootstrap().await,
            Err(err) => {
                error!(error = %err, "Error fetching seats");
                self.record_error(&err).await;
                (default_layout(), SeatSource::Fallback)
            },
        };

        debug!(count = seats.len(), ?source, "Seat projection refreshed");
        let mut projection = self.projection.write().await;
        projection.seats = seats;
        projection.source = Some(source);
        projection.loading = false;
        source
    }

    async fn fetch(&self) -> Result<Vec<Seat>> {
        let docs = self
            .db
            .query(Query::collection(&self.collection))
            .await
            .map_err(SeatbookError::Read)?;

        let mut seats = docs.iter().map(seat_from_document).collect::<Result<Vec<_>>>()?;
        seats.sort_by_key(|seat| seat.seat_number);
        Ok(seats)
    }

    /// Seed an empty collection with the default layout, then read it back.
    async fn bootstrap(&self) -> (Vec<Seat>, SeatSource) {
        let now = self.clock.now();
        let batch = SeatNumber::grid().into_iter().fold(WriteBatch::new(), |batch, number| {
            batch.create(
                &self.collection,
                Fields::from([
                    (field::SEAT_NUMBER.to_string(), Value::from(number)),
                    (field::STATUS.to_string(), Value::from(SeatStatus::Available)),
                    (field::CREATED_AT.to_string(), Value::from(now)),
                ]),
            )
        });

        if let Err(err) = self.db.commit(batch).await {
            let err = SeatbookError::Write(err);
            error!(error = %err, "Error initializing default seats");
            self.record_error(&err).await;
            return (default_layout(), SeatSource::Fallback);
        }
        info!(collection = %self.collection, "Default seats created");

        match self.fetch().await {
            Ok(seats) if !seats.is_empty() => (seats, SeatSource::Bootstrapped),
            Ok(_) => {
                warn!("Seat collection still empty after bootstrap");
                (default_layout(), SeatSource::Fallback)
            },
            Err(err) => {
                error!(error = %err, "Error fetching seats after bootstrap");
                self.record_error(&err).await;
                (default_layout(), SeatSource::Fallback)
            },
        }
    }

    async fn record_error(&self, err: &SeatbookError) {
        self.projection.write().await.error = Some(err.to_string());
    }

    /// Find the document of a seat by its `seatNumber` field.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Read`] when the query fails.
    pub async fn find_document(&self, seat_number: &SeatNumber) -> Result<Option<Document>> {
        let docs = self
            .db
            .query(
                Query::collection(&self.collection)
                    .where_eq(field::SEAT_NUMBER, *seat_number)
                    .limit(1),
            )
            .await
            .map_err(SeatbookError::Read)?;
        Ok(docs.into_iter().next())
    }

    /// Change a seat's occupancy in the store.
    ///
    /// A seat number with no document is skipped silently. The projection
    /// is not refreshed; call [`SeatRegistry::load`] for that.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Read`] or [`SeatbookError::Write`] when the
    /// store fails.
    pub async fn set_status(
        &self,
        seat_number: &SeatNumber,
        status: SeatStatus,
        reserved_by: Option<&UserId>,
        reserved_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = self.try_set_status(seat_number, status, reserved_by, reserved_until).await;
        if let Err(err) = &result {
            error!(seat = %seat_number, error = %err, "Error updating seat status");
        }
        result
    }

    async fn try_set_status(
        &self,
        seat_number: &SeatNumber,
        status: SeatStatus,
        reserved_by: Option<&UserId>,
        reserved_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let Some(doc) = self.find_document(seat_number).await? else {
            debug!(seat = %seat_number, "No seat document; status update skipped");
            return Ok(());
        };

        let fields = occupancy_fields(status, reserved_by, reserved_until, self.clock.now());
        self.db
            .update(self.collection.clone(), doc.id, fields)
            .await
            .map_err(SeatbookError::Write)?;
        debug!(seat = %seat_number, %status, "Seat status updated");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// All seats, in grid order
    pub async fn seats(&self) -> Vec<Seat> {
        self.projection.read().await.seats.clone()
    }

    /// Seats free to book
    pub async fn available(&self) -> Vec<Seat> {
        self.filtered(SeatStatus::Available).await
    }

    /// Seats currently held
    pub async fn occupied(&self) -> Vec<Seat> {
        self.filtered(SeatStatus::Occupied).await
    }

    async fn filtered(&self, status: SeatStatus) -> Vec<Seat> {
        self.projection
            .read()
            .await
            .seats
            .iter()
            .filter(|seat| seat.status == status)
            .cloned()
            .collect()
    }

    /// Look up one seat by number
    pub async fn seat(&self, seat_number: &SeatNumber) -> Option<Seat> {
        self.projection
            .read()
            .await
            .seats
            .iter()
            .find(|seat| &seat.seat_number == seat_number)
            .cloned()
    }

    /// Source of the last load
    pub async fn source(&self) -> Option<SeatSource> {
        self.projection.read().await.source
    }

    /// Whether a load is in flight
    pub async fn is_loading(&self) -> bool {
        self.projection.read().await.loading
    }

    /// Message of the last failure
    pub async fn error(&self) -> Option<String> {
        self.projection.read().await.error.clone()
    }

    /// Forget the last failure
    pub async fn clear_error(&self) {
        self.projection.write().await.error = None;
    }
}
