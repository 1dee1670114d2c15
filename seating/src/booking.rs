//! Booking input parsing.
//!
//! A booking arrives as three strings: a seat label, a time slot
//! (`"HH:MM-HH:MM"`) and a calendar day (`"YYYY-MM-DD"`). The slot is
//! interpreted in a time zone (local time in production) on that day.

use crate::error::{Result, SeatbookError};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Booking request as entered by the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Seat label, e.g. `"A1"`
    pub seat_number: String,
    /// Slot, e.g. `"09:00-11:00"`
    pub time_slot: String,
    /// Day, e.g. `"2024-01-15"`
    pub date: String,
}

impl BookingRequest {
    /// Create a request
    #[must_use]
    pub fn new(
        seat_number: impl Into<String>,
        time_slot: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            seat_number: seat_number.into(),
            time_slot: time_slot.into(),
            date: date.into(),
        }
    }
}

/// Wall-clock slot within a day. `end` is always after `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    /// Build a slot.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Validation`] when `end` is not after `start`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(SeatbookError::Validation(format!(
                "Time slot must end after it starts: {}-{}",
                start.format(TIME_FORMAT),
                end.format(TIME_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Slot start
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// Slot end
    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }
}

impl FromStr for TimeSlot {
    type Err = SeatbookError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SeatbookError::Validation(format!("Invalid time slot {s:?}: expected HH:MM-HH:MM"));

        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = NaiveTime::parse_from_str(start.trim(), TIME_FORMAT).map_err(|_| invalid())?;
        let end = NaiveTime::parse_from_str(end.trim(), TIME_FORMAT).map_err(|_| invalid())?;
        Self::new(start, end)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format(TIME_FORMAT), self.end.format(TIME_FORMAT))
    }
}

/// Parse a `"YYYY-MM-DD"` day.
///
/// # Errors
///
/// Returns [`SeatbookError::Validation`] for anything else.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| SeatbookError::Validation(format!("Invalid date {date:?}: expected YYYY-MM-DD")))
}

/// A slot pinned to concrete instants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BookingWindow {
    /// Midnight at the start of the booked day
    pub date: DateTime<Utc>,
    /// Slot start
    pub start: DateTime<Utc>,
    /// Slot end
    pub end: DateTime<Utc>,
}

impl BookingWindow {
    /// Pin `slot` on `date` in `tz`.
    ///
    /// # Errors
    ///
    /// Returns [`SeatbookError::Validation`] for a malformed date, or when a
    /// wall-clock time does not exist on that day (a DST gap).
    pub fn resolve<Tz: TimeZone>(date: &str, slot: &TimeSlot, tz: &Tz) -> Result<Self> {
        let day = parse_date(date)?;

        let window = Self {
            date: to_instant(tz, day.and_time(NaiveTime::MIN))?,
            start: to_instant(tz, day.and_time(slot.start))?,
            end: to_instant(tz, day.and_time(slot.end))?,
        };

        if window.end <= window.start {
            return Err(SeatbookError::Validation(format!(
                "Time slot {slot} collapses on {day} in local time"
            )));
        }
        Ok(window)
    }

    /// Parse both strings and pin the slot in the machine's local time.
    ///
    /// # Errors
    ///
    /// See [`TimeSlot::from_str`] and [`BookingWindow::resolve`].
    pub fn parse_local(date: &str, time_slot: &str) -> Result<Self> {
        let slot: TimeSlot = time_slot.parse()?;
        Self::resolve(date, &slot, &Local)
    }
}

fn to_instant<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| SeatbookError::Validation(format!("{naive} does not exist in local time")))
}
