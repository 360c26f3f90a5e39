use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{Booking, BookingStatus, BookingWithLabel, CreateBooking};
use crate::error::{AppError, AppResult};

/// Repository for claimed slots (`bookings` table).
///
/// The partial unique indexes on confirmed rows are the final authority on
/// double-booking: `create_confirmed` turns a unique violation into
/// `AppError::SlotUnavailable` instead of a database error.
pub struct BookingRepository;

/// Writes requested by an admin patch. Every field only moves forward:
/// confirmed to cancelled, unsent to sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingChanges {
    pub cancel: bool,
    pub intro_email_sent: bool,
    pub reminder_sent: bool,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        !(self.cancel || self.intro_email_sent || self.reminder_sent)
    }
}

const BOOKING_COLUMNS: &str = r#"
    b.id AS id,
    b.rule_id AS rule_id,
    b.event_id AS event_id,
    b.booking_date AS date,
    b.booking_time AS time,
    b.duration_minutes AS duration_minutes,
    b.client_name AS client_name,
    b.client_email AS client_email,
    b.status AS status,
    b.intro_email_sent AS intro_email_sent,
    b.reminder_sent AS reminder_sent,
    b.created_at AS created_at,
    b.updated_at AS updated_at
"#;

impl BookingRepository {
    /// Insert a new confirmed booking.
    pub async fn create_confirmed(pool: &SqlitePool, booking: &CreateBooking) -> AppResult<Booking> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        // `execute` steps the insert to completion so the autocommit is
        // released before the row is read back.
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (
                id,
                rule_id,
                event_id,
                booking_date,
                booking_time,
                duration_minutes,
                client_name,
                client_email,
                status,
                intro_email_sent,
                reminder_sent,
                created_at,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(booking.slot.rule_id())
        .bind(booking.slot.event_id())
        .bind(booking.date)
        .bind(booking.time)
        .bind(booking.duration_minutes)
        .bind(&booking.client_name)
        .bind(&booking.client_email)
        .bind(BookingStatus::Confirmed)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::info!(
                    "Unique index rejected booking for {:?} on {} {}",
                    booking.slot,
                    booking.date,
                    booking.time
                );
                return Err(AppError::SlotUnavailable(crate::i18n::t(
                    "error.slot_unavailable",
                )));
            }
            Err(e) => return Err(AppError::Database(e)),
        }

        Self::find_by_id(pool, &id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("booking {} missing after insert", id))
        })
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Confirmed bookings whose date falls in `[from, to]` (inclusive).
    pub async fn find_confirmed_in_range(
        pool: &SqlitePool,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings b
            WHERE b.status = 'confirmed' AND b.booking_date BETWEEN ? AND ?
            ORDER BY b.booking_date ASC, b.booking_time ASC
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// All bookings (optionally limited to a date range) with the label of their
    /// rule or event. Orphaned bookings get an empty label.
    pub async fn list_with_labels(
        pool: &SqlitePool,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> AppResult<Vec<BookingWithLabel>> {
        let mut sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS},
                COALESCE(r.label, e.label, '') AS rule_label
            FROM bookings b
            LEFT JOIN recurring_rules r ON b.rule_id = r.id
            LEFT JOIN events e ON b.event_id = e.id
            "#
        );
        if range.is_some() {
            sql.push_str(" WHERE b.booking_date BETWEEN ? AND ?");
        }
        sql.push_str(" ORDER BY b.booking_date ASC, b.booking_time ASC");

        let mut query = sqlx::query_as::<_, BookingWithLabel>(&sql);
        if let Some((from, to)) = range {
            query = query.bind(from).bind(to);
        }

        query.fetch_all(pool).await.map_err(AppError::Database)
    }

    /// Apply an admin lifecycle change in one transaction, so a failing
    /// write leaves the booking as it was.
    pub async fn apply_changes(
        pool: &SqlitePool,
        id: &str,
        changes: &BookingChanges,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        if changes.cancel {
            sqlx::query(
                r#"
                UPDATE bookings
                SET status = 'cancelled', updated_at = ?
                WHERE id = ? AND status = 'confirmed'
                "#,
            )
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        }
        if changes.intro_email_sent {
            sqlx::query("UPDATE bookings SET intro_email_sent = 1, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }
        if changes.reminder_sent {
            sqlx::query("UPDATE bookings SET reminder_sent = 1, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    /// Set the one-way `intro_email_sent` flag.
    pub async fn mark_intro_email_sent(pool: &SqlitePool, id: &str) -> AppResult<()> {
        sqlx::query("UPDATE bookings SET intro_email_sent = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().naive_utc())
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    /// Set the one-way `reminder_sent` flag.
    pub async fn mark_reminder_sent(pool: &SqlitePool, id: &str) -> AppResult<()> {
        sqlx::query("UPDATE bookings SET reminder_sent = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now().naive_utc())
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
