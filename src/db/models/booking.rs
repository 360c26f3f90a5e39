use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::slot::SlotRef;
use super::time_format::hhmm;

// ============================================================================
// Bookings (claimed slots)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// A claimed slot. `duration_minutes` is the snapshot taken at booking time.
///
/// Exactly one of `rule_id` / `event_id` is set (enforced by a table CHECK).
/// The referenced rule or event may have been deleted since.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub rule_id: Option<String>,
    pub event_id: Option<String>,
    pub date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub client_name: String,
    pub client_email: String,
    pub status: BookingStatus,
    pub intro_email_sent: bool,
    pub reminder_sent: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Booking joined with the label of its rule or event (empty when orphaned).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithLabel {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub rule_label: String,
}

/// Data for a new confirmed booking, assembled by the booking arbiter.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub slot: SlotRef,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub client_name: String,
    pub client_email: String,
}

/// Admin patch for a booking. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub intro_email_sent: Option<bool>,
    #[serde(default)]
    pub reminder_sent: Option<bool>,
}

impl BookingPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.intro_email_sent.is_none() && self.reminder_sent.is_none()
    }
}

/// Which follow-up email an administrator sends for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    Intro,
    Reminder,
}
