use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::time_format::hhmm;

// ============================================================================
// One-off events (single bookable slots)
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub label: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub label: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
}
