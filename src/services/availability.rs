//! Slot generation: turns recurring rules and one-off events into the concrete
//! list of bookable slots for a date range.
//!
//! Everything here is pure. The output depends only on the inputs and on the
//! `today` passed in (used for the generation horizon), so the read endpoint and
//! the booking re-validation share one algorithm and always agree.

use std::collections::HashSet;

use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use sqlx::SqlitePool;

use crate::db::models::{Booking, DayConfig, Event, Frequency, RecurringRule, Slot, SlotRef};
use crate::db::repository::{BookingRepository, EventRepository, RuleRepository};
use crate::error::AppResult;

/// How far ahead rules generate slots, counted from today.
pub const GENERATION_HORIZON_MONTHS: u32 = 12;

/// Closed calendar date range `[from, to]` with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Everything the generator looks at besides the range and today.
#[derive(Debug, Clone, Copy)]
pub struct SlotInputs<'a> {
    pub rules: &'a [RecurringRule],
    pub events: &'a [Event],
    /// Bookings in the range. Only confirmed ones block a slot.
    pub bookings: &'a [Booking],
}

/// Last date (inclusive) any rule may generate a slot on.
pub fn horizon(today: NaiveDate) -> NaiveDate {
    today
        .checked_add_months(Months::new(GENERATION_HORIZON_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// Day number of the Monday that starts `date`'s ISO week.
fn iso_week_monday(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - i64::from(date.weekday().num_days_from_monday())
}

/// Number of ISO weeks between the week containing `start` and the week containing `date`.
///
/// Counted on Monday-anchored calendar weeks, so it stays exact across 52/53-week
/// ISO years and does not depend on which weekday `start` falls on.
pub fn iso_weeks_between(start: NaiveDate, date: NaiveDate) -> i64 {
    (iso_week_monday(date) - iso_week_monday(start)).div_euclid(7)
}

/// Whether a day entry of `rule` fires on `date` (weekday already matched).
fn day_fires_on(rule: &RecurringRule, day: &DayConfig, date: NaiveDate) -> bool {
    match day.frequency {
        Frequency::Weekly => true,
        Frequency::Biweekly => iso_weeks_between(rule.start_date, date).rem_euclid(2) == 0,
    }
}

/// Generate the available slots for `range`, sorted by `(date, time)`.
///
/// A rule contributes a slot on date `D` when `D` lies within the rule's active
/// span (capped at the horizon), the weekday is configured, biweekly parity
/// holds, `D` is not an exception and no confirmed booking holds
/// `(rule, D, rule.time)`. An event contributes its slot when its date is in
/// range and it has no confirmed booking.
pub fn generate_slots(inputs: &SlotInputs<'_>, range: DateRange, today: NaiveDate) -> Vec<Slot> {
    let horizon = horizon(today);

    let mut booked_rule_slots: HashSet<(&str, NaiveDate, NaiveTime)> = HashSet::new();
    let mut booked_events: HashSet<&str> = HashSet::new();
    for booking in inputs.bookings.iter().filter(|b| b.is_confirmed()) {
        if let Some(rule_id) = booking.rule_id.as_deref() {
            booked_rule_slots.insert((rule_id, booking.date, booking.time));
        } else if let Some(event_id) = booking.event_id.as_deref() {
            booked_events.insert(event_id);
        }
    }

    let mut slots = Vec::new();

    for rule in inputs.rules {
        if rule.days.is_empty() {
            continue;
        }

        let start = range.from.max(rule.start_date);
        let end = range
            .to
            .min(rule.end_date.unwrap_or(horizon))
            .min(horizon);
        if start > end {
            continue;
        }

        for date in start.iter_days().take_while(|d| *d <= end) {
            let Some(day) = rule.day_config(date.weekday().number_from_monday()) else {
                continue;
            };
            if !day_fires_on(rule, day, date) {
                continue;
            }
            if rule.exceptions.contains(&date) {
                continue;
            }
            if booked_rule_slots.contains(&(rule.id.as_str(), date, rule.time)) {
                continue;
            }

            slots.push(Slot {
                id: format!("rule-{}-{}", rule.id, date.format("%Y-%m-%d")),
                source: SlotRef::RuleId(rule.id.clone()),
                date,
                time: rule.time,
                duration_minutes: rule.duration_minutes,
            });
        }
    }

    for event in inputs.events {
        if !range.contains(event.date) || booked_events.contains(event.id.as_str()) {
            continue;
        }
        slots.push(Slot {
            id: format!("event-{}", event.id),
            source: SlotRef::EventId(event.id.clone()),
            date: event.date,
            time: event.time,
            duration_minutes: event.duration_minutes,
        });
    }

    // The id only breaks ties between rules that share a date and time.
    slots.sort_by(|a, b| (a.date, a.time, &a.id).cmp(&(b.date, b.time, &b.id)));
    slots
}

/// Load the generator inputs for `range` from the stores and generate.
///
/// Used by both the public slot listing and the booking re-validation.
pub async fn load_slots(
    pool: &SqlitePool,
    range: DateRange,
    today: NaiveDate,
) -> AppResult<Vec<Slot>> {
    let rules = RuleRepository::list_all(pool).await?;
    let events = EventRepository::list_in_range(pool, range.from, range.to).await?;
    let bookings = BookingRepository::find_confirmed_in_range(pool, range.from, range.to).await?;

    let inputs = SlotInputs {
        rules: &rules,
        events: &events,
        bookings: &bookings,
    };
    Ok(generate_slots(&inputs, range, today))
}
