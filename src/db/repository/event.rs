use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateEvent, Event};
use crate::error::{AppError, AppResult};

/// Repository for one-off bookable events (`events` table).
pub struct EventRepository;

impl EventRepository {
    /// Create a new event and return it.
    pub async fn create(pool: &SqlitePool, event: &CreateEvent) -> AppResult<Event> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO events (id, label, event_date, slot_time, duration_minutes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&event.label)
        .bind(event.date)
        .bind(event.time)
        .bind(event.duration_minutes)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Self::find_by_id(pool, &id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("event {} missing after insert", id))
        })
    }

    /// List all events ordered by date and time.
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT
                id,
                label,
                event_date AS date,
                slot_time AS time,
                duration_minutes,
                created_at
            FROM events
            ORDER BY event_date ASC, slot_time ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Events whose date falls in `[from, to]` (inclusive).
    pub async fn list_in_range(
        pool: &SqlitePool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT
                id,
                label,
                event_date AS date,
                slot_time AS time,
                duration_minutes,
                created_at
            FROM events
            WHERE event_date BETWEEN ? AND ?
            ORDER BY event_date ASC, slot_time ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Event>> {
        sqlx::query_as::<_, Event>(
            r#"
            SELECT
                id,
                label,
                event_date AS date,
                slot_time AS time,
                duration_minutes,
                created_at
            FROM events
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Delete an event. Bookings that reference it are kept.
    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(crate::i18n::t("not_found.event")));
        }

        Ok(())
    }
}
