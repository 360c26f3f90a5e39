use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::time_format::hhmm;

// ============================================================================
// Recurring availability rules
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
}

/// One weekday a rule is active on. `day_of_week` is ISO (Monday = 1 … Sunday = 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayConfig {
    pub day_of_week: i32,
    pub frequency: Frequency,
}

/// Row of `recurring_rules` without its child tables.
#[derive(Debug, Clone, FromRow)]
pub struct RuleRow {
    pub id: String,
    pub label: String,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct RuleDayRow {
    pub rule_id: String,
    pub day_of_week: i32,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, FromRow)]
pub struct RuleExceptionRow {
    pub rule_id: String,
    pub exception_date: NaiveDate,
}

/// A rule together with its weekday configuration and exception dates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringRule {
    pub id: String,
    pub label: String,
    #[serde(serialize_with = "hhmm::serialize")]
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub days: Vec<DayConfig>,
    pub exceptions: BTreeSet<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurringRule {
    pub fn from_parts(
        row: RuleRow,
        days: Vec<DayConfig>,
        exceptions: BTreeSet<NaiveDate>,
    ) -> Self {
        Self {
            id: row.id,
            label: row.label,
            time: row.time,
            duration_minutes: row.duration_minutes,
            start_date: row.start_date,
            end_date: row.end_date,
            days,
            exceptions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Day configuration for an ISO weekday, if the rule runs on that day.
    pub fn day_config(&self, iso_weekday: u32) -> Option<&DayConfig> {
        self.days
            .iter()
            .find(|d| d.day_of_week == iso_weekday as i32)
    }
}

/// Rule payload as sent by the admin UI, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    #[serde(default)]
    pub label: Option<String>,
    pub time: String,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub days: Vec<DayConfig>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Validated rule data ready to be written (used for both create and replace).
#[derive(Debug, Clone)]
pub struct CreateRule {
    pub label: String,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub days: Vec<DayConfig>,
}

/// Result of toggling an exception date on a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionAction {
    Added,
    Removed,
}
