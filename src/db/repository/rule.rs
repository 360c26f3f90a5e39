use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::db::models::{
    CreateRule, DayConfig, ExceptionAction, RecurringRule, RuleDayRow, RuleExceptionRow, RuleRow,
};
use crate::error::{AppError, AppResult};

/// Repository for recurring rules and their child tables
/// (`recurring_rules`, `rule_days`, `rule_exceptions`).
///
/// Every write that touches more than one table runs in a single transaction so a
/// reader never observes a rule with half of its day list replaced.
pub struct RuleRepository;

const RULE_COLUMNS: &str = r#"
    id,
    label,
    slot_time AS time,
    duration_minutes,
    start_date,
    end_date,
    created_at,
    updated_at
"#;

impl RuleRepository {
    /// Load every rule with its days and exceptions, ordered by creation.
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<RecurringRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM recurring_rules ORDER BY created_at, id"
        ))
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let days = sqlx::query_as::<_, RuleDayRow>(
            r#"
            SELECT rule_id, day_of_week, frequency
            FROM rule_days
            ORDER BY rule_id, day_of_week
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let exceptions = sqlx::query_as::<_, RuleExceptionRow>(
            r#"
            SELECT rule_id, exception_date
            FROM rule_exceptions
            ORDER BY rule_id, exception_date
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let mut days_by_rule: HashMap<String, Vec<DayConfig>> = HashMap::new();
        for d in days {
            days_by_rule.entry(d.rule_id).or_default().push(DayConfig {
                day_of_week: d.day_of_week,
                frequency: d.frequency,
            });
        }

        let mut exceptions_by_rule: HashMap<String, BTreeSet<NaiveDate>> = HashMap::new();
        for e in exceptions {
            exceptions_by_rule
                .entry(e.rule_id)
                .or_default()
                .insert(e.exception_date);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let days = days_by_rule.remove(&row.id).unwrap_or_default();
                let exceptions = exceptions_by_rule.remove(&row.id).unwrap_or_default();
                RecurringRule::from_parts(row, days, exceptions)
            })
            .collect())
    }

    /// Find a single rule (with days and exceptions) by id.
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<RecurringRule>> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM recurring_rules WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let days = sqlx::query_as::<_, RuleDayRow>(
            "SELECT rule_id, day_of_week, frequency FROM rule_days WHERE rule_id = ? ORDER BY day_of_week",
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?
        .into_iter()
        .map(|d| DayConfig {
            day_of_week: d.day_of_week,
            frequency: d.frequency,
        })
        .collect();

        let exceptions = sqlx::query_as::<_, RuleExceptionRow>(
            "SELECT rule_id, exception_date FROM rule_exceptions WHERE rule_id = ?",
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?
        .into_iter()
        .map(|e| e.exception_date)
        .collect();

        Ok(Some(RecurringRule::from_parts(row, days, exceptions)))
    }

    /// Create a rule and its day list atomically. Returns the new rule id.
    pub async fn create(pool: &SqlitePool, rule: &CreateRule) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO recurring_rules (
                id,
                label,
                slot_time,
                duration_minutes,
                start_date,
                end_date,
                created_at,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&rule.label)
        .bind(rule.time)
        .bind(rule.duration_minutes)
        .bind(rule.start_date)
        .bind(rule.end_date)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        Self::insert_days(&mut tx, &id, &rule.days).await?;

        tx.commit().await.map_err(AppError::Database)?;

        Ok(id)
    }

    /// Replace a rule's scalar fields and its whole day list. Exceptions are kept.
    pub async fn replace(pool: &SqlitePool, id: &str, rule: &CreateRule) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        let result = sqlx::query(
            r#"
            UPDATE recurring_rules
            SET label = ?,
                slot_time = ?,
                duration_minutes = ?,
                start_date = ?,
                end_date = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&rule.label)
        .bind(rule.time)
        .bind(rule.duration_minutes)
        .bind(rule.start_date)
        .bind(rule.end_date)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            // Dropping `tx` rolls back.
            return Err(AppError::NotFound(crate::i18n::t("not_found.rule")));
        }

        sqlx::query("DELETE FROM rule_days WHERE rule_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        Self::insert_days(&mut tx, id, &rule.days).await?;

        tx.commit().await.map_err(AppError::Database)?;

        Ok(())
    }

    /// Delete a rule; its days and exceptions go with it (ON DELETE CASCADE).
    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM recurring_rules WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(crate::i18n::t("not_found.rule")));
        }

        Ok(())
    }

    /// Add the exception date if absent, remove it if present.
    pub async fn toggle_exception(
        pool: &SqlitePool,
        rule_id: &str,
        date: NaiveDate,
    ) -> AppResult<ExceptionAction> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        let rule_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM recurring_rules WHERE id = ?")
                .bind(rule_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::Database)?;

        if rule_exists.is_none() {
            return Err(AppError::NotFound(crate::i18n::t("not_found.rule")));
        }

        let removed = sqlx::query(
            "DELETE FROM rule_exceptions WHERE rule_id = ? AND exception_date = ?",
        )
        .bind(rule_id)
        .bind(date)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let action = if removed.rows_affected() > 0 {
            ExceptionAction::Removed
        } else {
            sqlx::query(
                "INSERT INTO rule_exceptions (rule_id, exception_date, created_at) VALUES (?, ?, ?)",
            )
            .bind(rule_id)
            .bind(date)
            .bind(Utc::now().naive_utc())
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
            ExceptionAction::Added
        };

        tx.commit().await.map_err(AppError::Database)?;

        Ok(action)
    }

    async fn insert_days(
        tx: &mut Transaction<'_, Sqlite>,
        rule_id: &str,
        days: &[DayConfig],
    ) -> AppResult<()> {
        for day in days {
            sqlx::query("INSERT INTO rule_days (rule_id, day_of_week, frequency) VALUES (?, ?, ?)")
                .bind(rule_id)
                .bind(day.day_of_week)
                .bind(day.frequency)
                .execute(&mut **tx)
                .await
                .map_err(AppError::Database)?;
        }
        Ok(())
    }
}
