use chrono::NaiveDate;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::time_format::hhmm;

/// What generated a slot: a recurring rule or a one-off event.
///
/// Flattened into its owner on the wire, so it appears as either
/// `"ruleId": "..."` or `"eventId": "..."`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotRef {
    RuleId(String),
    EventId(String),
}

impl SlotRef {
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            SlotRef::RuleId(id) => Some(id),
            SlotRef::EventId(_) => None,
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            SlotRef::RuleId(_) => None,
            SlotRef::EventId(id) => Some(id),
        }
    }
}

/// A concretely bookable time. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    #[serde(flatten)]
    pub source: SlotRef,
    pub date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    pub time: NaiveTime,
    pub duration_minutes: i32,
}

impl Slot {
    pub fn matches(&self, source: &SlotRef, date: NaiveDate, time: NaiveTime) -> bool {
        &self.source == source && self.date == date && self.time == time
    }
}
