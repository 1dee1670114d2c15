//! Domain types for the seat reservation client.
//!
//! Value objects for seats, reservations, profiles and the theme preference.
//! Mapping to and from store documents lives next to the component that owns
//! each collection.

use crate::error::{Result, SeatbookError};
use chrono::{DateTime, Utc};
use seatbook_core::document::{DocumentId, Fields, Value};
use seatbook_core::identity::{AuthUser, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Seats
// ============================================================================

/// Grid rows, front to back.
pub const SEAT_ROWS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Seats per row.
pub const SEATS_PER_ROW: u8 = 4;

/// Seat label such as `"B3"`: a row letter followed by a column number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatNumber {
    row: char,
    column: u8,
}

impl SeatNumber {
    /// Build a seat number from grid coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Validation`] when the coordinates are outside
    /// the 4x4 grid.
    pub fn new(row: char, column: u8) -> Result<Self> {
        let row = row.to_ascii_uppercase();
        if !SEAT_ROWS.contains(&row) || column == 0 || column > SEATS_PER_ROW {
            return Err(SeatbookError::Validation(format!(
                "Seat {row}{column} is outside the seating grid"
            )));
        }
        Ok(Self { row, column })
    }

    /// Row letter (`A`..=`D`)
    #[must_use]
    pub const fn row(&self) -> char {
        self.row
    }

    /// Column number (`1`..=`4`)
    #[must_use]
    pub const fn column(&self) -> u8 {
        self.column
    }

    /// Every seat of the grid in row-major order: A1, A2, ... D4.
    #[must_use]
    pub fn grid() -> Vec<Self> {
        SEAT_ROWS
            .iter()
            .flat_map(|&row| (1..=SEATS_PER_ROW).map(move |column| Self { row, column }))
            .collect()
    }
}

impl FromStr for SeatNumber {
    type Err = SeatbookError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let row = chars.next().ok_or_else(|| {
            SeatbookError::Validation("Seat number must not be empty".to_string())
        })?;
        let invalid = || SeatbookError::Validation(format!("Invalid seat number: {s:?}"));
        // Exactly one digit after the row letter
        let column = match (chars.next(), chars.next()) {
            (Some(digit), None) => digit.to_digit(10).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        Self::new(row, u8::try_from(column).map_err(|_| invalid())?)
    }
}

impl TryFrom<String> for SeatNumber {
    type Error = SeatbookError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SeatNumber> for String {
    fn from(seat: SeatNumber) -> Self {
        seat.to_string()
    }
}

impl From<SeatNumber> for Value {
    fn from(seat: SeatNumber) -> Self {
        Self::String(seat.to_string())
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

/// Occupancy of a seat
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    /// Free to book
    #[default]
    Available,
    /// Held by a reservation
    Occupied,
}

impl SeatStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
        }
    }
}

impl FromStr for SeatStatus {
    type Err = SeatbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            other => Err(SeatbookError::Validation(format!(
                "Unknown seat status: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SeatStatus> for Value {
    fn from(status: SeatStatus) -> Self {
        Self::String(status.as_str().to_string())
    }
}

/// One seat of the grid as the registry sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Document id (equal to the seat number for the offline fallback layout)
    pub id: DocumentId,
    /// Grid label
    pub seat_number: SeatNumber,
    /// Current occupancy
    pub status: SeatStatus,
    /// Holder of the seat while occupied
    pub reserved_by: Option<UserId>,
    /// End of the holding reservation while occupied
    pub reserved_until: Option<DateTime<Utc>>,
}

impl Seat {
    /// A free seat
    #[must_use]
    pub const fn available(id: DocumentId, seat_number: SeatNumber) -> Self {
        Self {
            id,
            seat_number,
            status: SeatStatus::Available,
            reserved_by: None,
            reserved_until: None,
        }
    }

    /// Whether the seat can be booked
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.status, SeatStatus::Available)
    }
}

// ============================================================================
// Reservations
// ============================================================================

/// Store-assigned identifier of a reservation
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(DocumentId);

impl ReservationId {
    /// Wrap a raw id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(DocumentId::new(id))
    }

    /// The underlying document id
    #[must_use]
    pub const fn document_id(&self) -> &DocumentId {
        &self.0
    }
}

impl From<DocumentId> for ReservationId {
    fn from(id: DocumentId) -> Self {
        Self(id)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a reservation.
///
/// Only `Upcoming → Cancelled` is ever written. `Completed` is reached
/// implicitly once the end time passes; see
/// [`Reservation::effective_status`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Booked and not yet over
    #[default]
    Upcoming,
    /// Over
    Completed,
    /// Cancelled by its owner
    Cancelled,
}

impl ReservationStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = SeatbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(SeatbookError::Validation(format!(
                "Unknown reservation status: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ReservationStatus> for Value {
    fn from(status: ReservationStatus) -> Self {
        Self::String(status.as_str().to_string())
    }
}

/// A booking of one seat for one time slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Store-assigned id
    pub id: ReservationId,
    /// Booked seat
    pub seat_number: SeatNumber,
    /// Owner
    pub user_id: UserId,
    /// Owner's email at booking time
    pub user_email: Option<String>,
    /// Owner's display name at booking time
    pub user_name: Option<String>,
    /// Slot start
    pub start_time: DateTime<Utc>,
    /// Slot end, always after `start_time`
    pub end_time: DateTime<Utc>,
    /// Local midnight of the booked day
    pub date: DateTime<Utc>,
    /// Stored status
    pub status: ReservationStatus,
    /// When the booking was made
    pub created_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Status for display: an upcoming reservation whose end has passed
    /// reads as completed.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> ReservationStatus {
        match self.status {
            ReservationStatus::Upcoming if self.end_time <= now => ReservationStatus::Completed,
            status => status,
        }
    }

    /// Still upcoming and not started yet
    #[must_use]
    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Upcoming && self.start_time > now
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Per-user profile document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Name shown in the UI
    pub display_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Email notifications opt-in
    pub email_notifications: bool,
    /// SMS notifications opt-in
    pub sms_notifications: bool,
    /// Push notifications opt-in
    pub push_notifications: bool,
    /// When the document was first written
    pub created_at: Option<DateTime<Utc>>,
    /// When the document was last written
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            email: String::new(),
            phone: String::new(),
            email_notifications: true,
            sms_notifications: false,
            push_notifications: true,
            created_at: None,
            updated_at: None,
        }
    }
}

impl UserProfile {
    /// Unsaved profile seeded from the identity provider's user record.
    #[must_use]
    pub fn from_identity(user: &AuthUser) -> Self {
        Self {
            display_name: user.display_name.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
            phone: user.phone_number.clone().unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// Partial profile write. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    pub display_name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New phone
    pub phone: Option<String>,
    /// New email opt-in
    pub email_notifications: Option<bool>,
    /// New SMS opt-in
    pub sms_notifications: Option<bool>,
    /// New push opt-in
    pub push_notifications: Option<bool>,
}

impl ProfileUpdate {
    /// Full profile data from the identity provider, with default
    /// notification preferences.
    #[must_use]
    pub fn from_identity(user: &AuthUser) -> Self {
        let profile = UserProfile::from_identity(user);
        Self {
            display_name: Some(profile.display_name),
            email: Some(profile.email),
            phone: Some(profile.phone),
            email_notifications: Some(profile.email_notifications),
            sms_notifications: Some(profile.sms_notifications),
            push_notifications: Some(profile.push_notifications),
        }
    }

    /// Set the display name
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the phone number
    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the email address
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set all three notification preferences
    #[must_use]
    pub const fn notifications(mut self, email: bool, sms: bool, push: bool) -> Self {
        self.email_notifications = Some(email);
        self.sms_notifications = Some(sms);
        self.push_notifications = Some(push);
        self
    }

    /// Whether the update touches nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.email_notifications.is_none()
            && self.sms_notifications.is_none()
            && self.push_notifications.is_none()
    }

    /// Document fields for the values that are present
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        let mut put = |name: &str, value: Option<Value>| {
            if let Some(value) = value {
                fields.insert(name.to_string(), value);
            }
        };
        put("displayName", self.display_name.clone().map(Value::from));
        put("email", self.email.clone().map(Value::from));
        put("phone", self.phone.clone().map(Value::from));
        put("emailNotifications", self.email_notifications.map(Value::from));
        put("smsNotifications", self.sms_notifications.map(Value::from));
        put("pushNotifications", self.push_notifications.map(Value::from));
        fields
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn seat_number_parses_grid_labels() {
        let seat: SeatNumber = "c4".parse().unwrap();
        assert_eq!(seat.row(), 'C');
        assert_eq!(seat.column(), 4);
        assert_eq!(seat.to_string(), "C4");
    }

    #[test]
    fn seat_number_rejects_labels_outside_grid() {
        for label in ["", "E1", "A0", "A5", "AA", "1A"] {
            assert!(
                matches!(label.parse::<SeatNumber>(), Err(SeatbookError::Validation(_))),
                "{label:?} should be rejected"
            );
        }
    }

    #[test]
    fn seat_number_takes_exactly_one_column_digit() {
        for label in ["A+1", "A01", "A11", "B2x", "A 1", "C\u{0663}"] {
            assert!(
                matches!(label.parse::<SeatNumber>(), Err(SeatbookError::Validation(_))),
                "{label:?} should be rejected"
            );
        }
        assert_eq!(" d2 ".parse::<SeatNumber>().unwrap().to_string(), "D2");
    }

    #[test]
    fn grid_is_row_major_and_complete() {
        let grid: Vec<String> = SeatNumber::grid().iter().map(ToString::to_string).collect();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid.first().map(String::as_str), Some("A1"));
        assert_eq!(grid.get(4).map(String::as_str), Some("B1"));
        assert_eq!(grid.last().map(String::as_str), Some("D4"));
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        assert_eq!("occupied".parse::<SeatStatus>().unwrap(), SeatStatus::Occupied);
        assert_eq!(
            "cancelled".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Cancelled
        );
        assert!("reserved".parse::<SeatStatus>().is_err());
    }

    fn reservation(status: ReservationStatus) -> Reservation {
        let day = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        Reservation {
            id: ReservationId::new("r1"),
            seat_number: "A1".parse().unwrap(),
            user_id: UserId::new("u1"),
            user_email: None,
            user_name: None,
            start_time: day + chrono::Duration::hours(9),
            end_time: day + chrono::Duration::hours(11),
            date: day,
            status,
            created_at: None,
        }
    }

    #[test]
    fn effective_status_completes_past_upcoming() {
        let r = reservation(ReservationStatus::Upcoming);
        let during = r.start_time + chrono::Duration::minutes(30);
        let after = r.end_time;

        assert_eq!(r.effective_status(during), ReservationStatus::Upcoming);
        assert_eq!(r.effective_status(after), ReservationStatus::Completed);
        assert!(!r.is_upcoming_at(during));

        let cancelled = reservation(ReservationStatus::Cancelled);
        assert_eq!(cancelled.effective_status(after), ReservationStatus::Cancelled);
    }

    #[test]
    fn profile_defaults_follow_notification_policy() {
        let profile = UserProfile::default();
        assert!(profile.email_notifications);
        assert!(!profile.sms_notifications);
        assert!(profile.push_notifications);
    }

    #[test]
    fn profile_update_only_writes_present_fields() {
        let fields = ProfileUpdate::default().phone("555-0100").to_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("phone"), Some(&Value::from("555-0100")));

        let user = AuthUser::new("u1").with_display_name("Ada");
        let full = ProfileUpdate::from_identity(&user).to_fields();
        assert_eq!(full.len(), 6);
        assert_eq!(full.get("email"), Some(&Value::from("")));
        assert_eq!(full.get("smsNotifications"), Some(&Value::Bool(false)));
    }
}
