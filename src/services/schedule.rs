//! Administration of the availability definitions: recurring rules, their
//! exception dates and one-off events.
//!
//! Drafts coming from the admin UI are validated here; the repositories only
//! ever see well-formed data.

use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::db::models::{
    parse_clock_time, parse_iso_date, CreateEvent, CreateRule, Event, EventDraft, ExceptionAction,
    RuleDraft,
};
use crate::db::repository::{EventRepository, RuleRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;

/// Used when a draft omits `durationMinutes`.
pub const DEFAULT_DURATION_MINUTES: i32 = 50;

fn validation(key: &str) -> AppError {
    AppError::Validation(i18n::t(key))
}

fn validate_duration(duration: Option<i32>) -> AppResult<i32> {
    match duration.unwrap_or(DEFAULT_DURATION_MINUTES) {
        d if d > 0 => Ok(d),
        _ => Err(validation("validation.duration")),
    }
}

fn validate_date(raw: &str) -> AppResult<NaiveDate> {
    parse_iso_date(raw.trim()).ok_or_else(|| {
        AppError::Validation(i18n::t_with("bad_request.invalid_date", &[("value", raw)]))
    })
}

pub fn validate_rule(draft: &RuleDraft) -> AppResult<CreateRule> {
    let time = parse_clock_time(draft.time.trim()).ok_or_else(|| {
        AppError::Validation(i18n::t_with(
            "bad_request.invalid_time",
            &[("value", draft.time.as_str())],
        ))
    })?;
    let duration_minutes = validate_duration(draft.duration_minutes)?;

    if draft.days.is_empty() {
        return Err(validation("validation.days_empty"));
    }
    let mut seen = HashSet::new();
    for day in &draft.days {
        let day_str = day.day_of_week.to_string();
        if !(1..=7).contains(&day.day_of_week) {
            return Err(AppError::Validation(i18n::t_with(
                "validation.day_of_week",
                &[("day", day_str.as_str())],
            )));
        }
        if !seen.insert(day.day_of_week) {
            return Err(AppError::Validation(i18n::t_with(
                "validation.duplicate_day",
                &[("day", day_str.as_str())],
            )));
        }
    }

    let start_date = validate_date(&draft.start_date)?;
    // An empty end date means "open-ended", as the admin form sends it.
    let end_date = match draft.end_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(validate_date(raw)?),
    };
    if matches!(end_date, Some(end) if end < start_date) {
        return Err(validation("validation.end_before_start"));
    }

    let mut days = draft.days.clone();
    days.sort_by_key(|d| d.day_of_week);

    Ok(CreateRule {
        label: draft.label.as_deref().unwrap_or_default().trim().to_string(),
        time,
        duration_minutes,
        start_date,
        end_date,
        days,
    })
}

pub fn validate_event(draft: &EventDraft) -> AppResult<CreateEvent> {
    let (Some(raw_date), Some(raw_time)) = (
        draft.date.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        draft.time.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest(i18n::t("bad_request.all_fields_required")));
    };

    let date = validate_date(raw_date)?;
    let time = parse_clock_time(raw_time).ok_or_else(|| {
        AppError::Validation(i18n::t_with(
            "bad_request.invalid_time",
            &[("value", raw_time)],
        ))
    })?;

    Ok(CreateEvent {
        label: draft.label.as_deref().unwrap_or_default().trim().to_string(),
        date,
        time,
        duration_minutes: validate_duration(draft.duration_minutes)?,
    })
}

pub struct ScheduleService;

impl ScheduleService {
    pub async fn create_rule(pool: &SqlitePool, draft: &RuleDraft) -> AppResult<String> {
        let rule = validate_rule(draft)?;
        let id = RuleRepository::create(pool, &rule).await?;
        tracing::info!(
            "Created rule {} ({} day(s), starting {})",
            id,
            rule.days.len(),
            rule.start_date
        );
        Ok(id)
    }

    pub async fn replace_rule(pool: &SqlitePool, id: &str, draft: &RuleDraft) -> AppResult<()> {
        let rule = validate_rule(draft)?;
        RuleRepository::replace(pool, id, &rule).await?;
        tracing::info!("Replaced rule {}", id);
        Ok(())
    }

    /// Delete a rule. Bookings made against it stay and keep the dangling id.
    pub async fn delete_rule(pool: &SqlitePool, id: &str) -> AppResult<()> {
        RuleRepository::delete(pool, id).await?;
        tracing::info!("Deleted rule {}", id);
        Ok(())
    }

    pub async fn toggle_exception(
        pool: &SqlitePool,
        rule_id: &str,
        raw_date: Option<&str>,
    ) -> AppResult<(ExceptionAction, NaiveDate)> {
        let raw_date = raw_date
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest(i18n::t("bad_request.date_required")))?;
        let date = parse_iso_date(raw_date).ok_or_else(|| {
            AppError::BadRequest(i18n::t_with(
                "bad_request.invalid_date",
                &[("value", raw_date)],
            ))
        })?;

        let action = RuleRepository::toggle_exception(pool, rule_id, date).await?;
        tracing::info!("Exception {} for rule {}: {:?}", date, rule_id, action);
        Ok((action, date))
    }

    pub async fn create_event(pool: &SqlitePool, draft: &EventDraft) -> AppResult<Event> {
        let event = validate_event(draft)?;
        let created = EventRepository::create(pool, &event).await?;
        tracing::info!("Created event {} on {}", created.id, created.date);
        Ok(created)
    }

    pub async fn delete_event(pool: &SqlitePool, id: &str) -> AppResult<()> {
        EventRepository::delete(pool, id).await?;
        tracing::info!("Deleted event {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::db::models::{DayConfig, Frequency};
    use crate::services::availability::{load_slots, DateRange};
    use crate::test_support;

    fn draft() -> RuleDraft {
        RuleDraft {
            label: Some("  Einzeltherapie ".to_string()),
            time: "10:00".to_string(),
            duration_minutes: None,
            days: vec![
                DayConfig {
                    day_of_week: 3,
                    frequency: Frequency::Biweekly,
                },
                DayConfig {
                    day_of_week: 1,
                    frequency: Frequency::Weekly,
                },
            ],
            start_date: "2026-03-02".to_string(),
            end_date: Some(String::new()),
        }
    }

    #[test]
    fn rule_draft_defaults_and_normalizes() {
        let rule = assert_ok!(validate_rule(&draft()));
        assert_eq!(rule.label, "Einzeltherapie");
        assert_eq!(rule.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(rule.end_date, None);
        assert_eq!(rule.days[0].day_of_week, 1);
        assert_eq!(rule.days[1].day_of_week, 3);
    }

    #[test]
    fn rule_draft_rejections() {
        let mut no_days = draft();
        no_days.days.clear();
        assert!(matches!(validate_rule(&no_days), Err(AppError::Validation(_))));

        let mut bad_time = draft();
        bad_time.time = "25:00".to_string();
        assert!(matches!(validate_rule(&bad_time), Err(AppError::Validation(_))));

        let mut zero = draft();
        zero.duration_minutes = Some(0);
        assert!(matches!(validate_rule(&zero), Err(AppError::Validation(_))));

        let mut bad_day = draft();
        bad_day.days[0].day_of_week = 8;
        assert_err!(validate_rule(&bad_day));

        let mut dup = draft();
        dup.days[0].day_of_week = 1;
        assert!(matches!(validate_rule(&dup), Err(AppError::Validation(_))));

        let mut reversed = draft();
        reversed.end_date = Some("2026-03-01".to_string());
        assert!(matches!(validate_rule(&reversed), Err(AppError::Validation(_))));
    }

    #[test]
    fn event_draft_requires_date_and_time() {
        let missing = EventDraft {
            label: None,
            date: Some("2026-03-10".to_string()),
            time: None,
            duration_minutes: Some(90),
        };
        assert!(matches!(validate_event(&missing), Err(AppError::BadRequest(_))));

        let ok = EventDraft {
            time: Some("18:30".to_string()),
            ..missing
        };
        let event = assert_ok!(validate_event(&ok));
        assert_eq!(event.duration_minutes, 90);
        assert_eq!(event.label, "");
    }

    #[tokio::test]
    async fn rule_lifecycle_round_trip() {
        let pool = test_support::test_pool().await;

        let id = ScheduleService::create_rule(&pool, &draft()).await.unwrap();
        let rule = RuleRepository::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert_eq!(rule.days.len(), 2);
        assert_eq!(rule.time.format("%H:%M").to_string(), "10:00");

        let mut replacement = draft();
        replacement.days = vec![DayConfig {
            day_of_week: 5,
            frequency: Frequency::Weekly,
        }];
        replacement.duration_minutes = Some(60);
        ScheduleService::toggle_exception(&pool, &id, Some("2026-03-06"))
            .await
            .unwrap();
        ScheduleService::replace_rule(&pool, &id, &replacement).await.unwrap();

        let rule = RuleRepository::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert_eq!(rule.days, replacement.days);
        assert_eq!(rule.duration_minutes, 60);
        // Replacing keeps exceptions.
        assert_eq!(rule.exceptions.len(), 1);

        ScheduleService::delete_rule(&pool, &id).await.unwrap();
        assert!(RuleRepository::find_by_id(&pool, &id).await.unwrap().is_none());
        assert!(matches!(
            ScheduleService::delete_rule(&pool, &id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ScheduleService::replace_rule(&pool, &id, &draft()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn toggling_an_exception_twice_restores_the_rule() {
        let pool = test_support::test_pool().await;
        let id = ScheduleService::create_rule(&pool, &draft()).await.unwrap();

        let (first, date) = ScheduleService::toggle_exception(&pool, &id, Some("2026-03-09"))
            .await
            .unwrap();
        assert_eq!(first, ExceptionAction::Added);
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());

        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let suppressed = load_slots(&pool, DateRange::single(date), today).await.unwrap();
        assert!(suppressed.is_empty());

        let (second, _) = ScheduleService::toggle_exception(&pool, &id, Some("2026-03-09"))
            .await
            .unwrap();
        assert_eq!(second, ExceptionAction::Removed);

        let restored = load_slots(&pool, DateRange::single(date), today).await.unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].date, date);

        let rule = RuleRepository::find_by_id(&pool, &id).await.unwrap().unwrap();
        assert!(rule.exceptions.is_empty());

        assert!(matches!(
            ScheduleService::toggle_exception(&pool, "missing", Some("2026-03-09")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ScheduleService::toggle_exception(&pool, &id, None).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn event_lifecycle() {
        let pool = test_support::test_pool().await;
        let event = ScheduleService::create_event(
            &pool,
            &EventDraft {
                label: Some("Workshop".to_string()),
                date: Some("2026-03-10".to_string()),
                time: Some("18:00".to_string()),
                duration_minutes: None,
            },
        )
        .await
        .unwrap();

        let listed = EventRepository::list_all(&pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, event.id);
        assert_eq!(listed[0].duration_minutes, DEFAULT_DURATION_MINUTES);

        ScheduleService::delete_event(&pool, &event.id).await.unwrap();
        assert!(matches!(
            ScheduleService::delete_event(&pool, &event.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
