//! The booking arbiter and booking lifecycle.
//!
//! A submission is validated, re-checked against freshly generated availability
//! for its single date and then inserted. The check and the insert are not
//! atomic: two racing submissions can both pass the check, and the partial
//! unique index on confirmed bookings decides which one commits.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::db::models::{
    parse_clock_time, parse_iso_date, Booking, BookingPatch, BookingStatus, CreateBooking,
    EmailType, SlotRef,
};
use crate::db::repository::{BookingChanges, BookingRepository, EventRepository, RuleRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::availability::{load_slots, DateRange};
use crate::services::notifications::{render_email, EmailKind};
use crate::AppState;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Booking body as posted by the public booking form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSubmission {
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A syntactically valid booking request. Whether the slot exists and is free
/// is decided by [`BookingService::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub slot: SlotRef,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub client_name: String,
    pub client_email: String,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bad_request(key: &str) -> AppError {
    AppError::BadRequest(i18n::t(key))
}

impl TryFrom<BookingSubmission> for BookingRequest {
    type Error = AppError;

    fn try_from(raw: BookingSubmission) -> Result<Self, Self::Error> {
        let slot = match (present(raw.rule_id), present(raw.event_id)) {
            (Some(rule_id), None) => SlotRef::RuleId(rule_id),
            (None, Some(event_id)) => SlotRef::EventId(event_id),
            (Some(_), Some(_)) => return Err(bad_request("bad_request.ambiguous_slot")),
            (None, None) => return Err(bad_request("bad_request.all_fields_required")),
        };

        let (Some(date), Some(time), Some(client_name), Some(client_email)) = (
            present(raw.date),
            present(raw.time),
            present(raw.name),
            present(raw.email),
        ) else {
            return Err(bad_request("bad_request.all_fields_required"));
        };

        let date = parse_iso_date(&date).ok_or_else(|| {
            AppError::BadRequest(i18n::t_with(
                "bad_request.invalid_date",
                &[("value", date.as_str())],
            ))
        })?;
        let time = parse_clock_time(&time).ok_or_else(|| {
            AppError::BadRequest(i18n::t_with(
                "bad_request.invalid_time",
                &[("value", time.as_str())],
            ))
        })?;

        if client_name.chars().count() > MAX_NAME_LENGTH {
            return Err(bad_request("bad_request.name_too_long"));
        }
        if !is_valid_email(&client_email) {
            return Err(bad_request("bad_request.invalid_email"));
        }

        Ok(BookingRequest {
            slot,
            date,
            time,
            client_name,
            client_email,
        })
    }
}

/// Syntactic `local@domain.tld` check. Deliverability is not verified.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    local_ok && domain_ok
}

pub struct BookingService {
    state: Arc<AppState>,
}

impl BookingService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Claim a slot for a client.
    ///
    /// Fails with `NotFound` for an unknown rule/event and with
    /// `SlotUnavailable` when the slot is not generated for that date or was
    /// taken concurrently. The confirmation email is best-effort.
    pub async fn submit(&self, request: BookingRequest) -> AppResult<Booking> {
        let pool = &self.state.db;

        // The duration always comes from the stored rule/event.
        let duration_minutes = match &request.slot {
            SlotRef::RuleId(id) => {
                RuleRepository::find_by_id(pool, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(i18n::t("not_found.rule")))?
                    .duration_minutes
            }
            SlotRef::EventId(id) => {
                EventRepository::find_by_id(pool, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(i18n::t("not_found.event")))?
                    .duration_minutes
            }
        };

        let today = self.state.clock.today();
        let slots = load_slots(pool, DateRange::single(request.date), today).await?;
        if !slots
            .iter()
            .any(|slot| slot.matches(&request.slot, request.date, request.time))
        {
            tracing::debug!(
                "Rejected booking: {:?} has no free slot on {} at {}",
                request.slot,
                request.date,
                request.time
            );
            return Err(AppError::SlotUnavailable(i18n::t("error.slot_unavailable")));
        }

        let booking = BookingRepository::create_confirmed(
            pool,
            &CreateBooking {
                slot: request.slot,
                date: request.date,
                time: request.time,
                duration_minutes,
                client_name: request.client_name,
                client_email: request.client_email,
            },
        )
        .await?;

        tracing::info!(
            "Booking {} confirmed for {} {}",
            booking.id,
            booking.date,
            booking.time
        );

        self.send_confirmation(&booking).await;

        Ok(booking)
    }

    /// Send the confirmation email. Failures are logged, never returned.
    async fn send_confirmation(&self, booking: &Booking) {
        let message = render_email(EmailKind::Confirmation, booking, &self.state.config.practice);
        let timeout = self.state.config.notifier.timeout();

        match tokio::time::timeout(timeout, self.state.notifier.send(&message)).await {
            Ok(Ok(())) => {
                tracing::info!("Confirmation email sent for booking {}", booking.id);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "Confirmation email for booking {} failed: {}",
                    booking.id,
                    e
                );
            }
            Err(_) => {
                tracing::warn!(
                    "Confirmation email for booking {} timed out after {:?}",
                    booking.id,
                    timeout
                );
            }
        }
    }

    /// Apply an admin patch: cancel and/or set the email flags.
    ///
    /// The whole patch is validated before anything is written.
    pub async fn update(&self, id: &str, patch: &BookingPatch) -> AppResult<Booking> {
        if patch.is_empty() {
            return Err(bad_request("bad_request.no_changes"));
        }

        let pool = &self.state.db;
        let booking = BookingRepository::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.booking")))?;

        if patch.status == Some(BookingStatus::Confirmed) && !booking.is_confirmed() {
            return Err(AppError::Validation(i18n::t("validation.status_transition")));
        }
        let resets_intro = patch.intro_email_sent == Some(false) && booking.intro_email_sent;
        let resets_reminder = patch.reminder_sent == Some(false) && booking.reminder_sent;
        if resets_intro || resets_reminder {
            return Err(AppError::Validation(i18n::t("validation.flag_reset")));
        }

        let changes = BookingChanges {
            cancel: patch.status == Some(BookingStatus::Cancelled) && booking.is_confirmed(),
            intro_email_sent: patch.intro_email_sent == Some(true) && !booking.intro_email_sent,
            reminder_sent: patch.reminder_sent == Some(true) && !booking.reminder_sent,
        };
        if !changes.is_empty() {
            BookingRepository::apply_changes(pool, id, &changes).await?;
            if changes.cancel {
                tracing::info!("Booking {} cancelled", id);
            }
        }

        BookingRepository::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.booking")))
    }

    /// Send the intro or reminder email and record it on the booking.
    ///
    /// The flag is only set once the relay accepted the message.
    pub async fn send_email(&self, id: &str, email_type: EmailType) -> AppResult<Booking> {
        let pool = &self.state.db;
        let booking = BookingRepository::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.booking")))?;

        let kind = match email_type {
            EmailType::Intro => EmailKind::Intro,
            EmailType::Reminder => EmailKind::Reminder,
        };
        let message = render_email(kind, &booking, &self.state.config.practice);

        match tokio::time::timeout(
            self.state.config.notifier.timeout(),
            self.state.notifier.send(&message),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(AppError::Notifier("relay timed out".to_string())),
        }

        match email_type {
            EmailType::Intro => BookingRepository::mark_intro_email_sent(pool, id).await?,
            EmailType::Reminder => BookingRepository::mark_reminder_sent(pool, id).await?,
        }
        tracing::info!("{} email sent for booking {}", kind.as_str(), id);

        BookingRepository::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.booking")))
    }
}
