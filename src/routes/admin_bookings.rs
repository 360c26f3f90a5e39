use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{BookingPatch, BookingWithLabel, EmailType};
use crate::db::repository::BookingRepository;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::routes::{auth::AdminUser, json_body, slots::RangeQuery};
use crate::services::booking::BookingService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bookings))
        .route("/:id", patch(update_booking))
        .route("/:id/email", post(send_email))
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    #[serde(rename = "type", default)]
    pub email_type: Option<String>,
}

impl SendEmailRequest {
    fn email_type(&self) -> AppResult<EmailType> {
        match self.email_type.as_deref() {
            Some("intro") => Ok(EmailType::Intro),
            Some("reminder") => Ok(EmailType::Reminder),
            _ => Err(AppError::BadRequest(i18n::t("bad_request.email_type"))),
        }
    }
}

/// GET /api/admin/bookings?from=...&to=...
/// Without a range every booking is returned.
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<BookingWithLabel>>> {
    let range = query.range()?.map(|r| (r.from, r.to));
    Ok(Json(
        BookingRepository::list_with_labels(&state.db, range).await?,
    ))
}

/// PATCH /api/admin/bookings/:id
/// Body: { status?, introEmailSent?, reminderSent? }
async fn update_booking(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<BookingPatch>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let patch = json_body(payload)?;
    let booking = BookingService::new(&state).update(&id, &patch).await?;
    Ok(Json(json!({
        "message": i18n::t("booking.updated"),
        "booking": booking,
    })))
}

/// POST /api/admin/bookings/:id/email
/// Body: { type: "intro" | "reminder" }
async fn send_email(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let email_type = json_body(payload)?.email_type()?;
    let booking = BookingService::new(&state).send_email(&id, email_type).await?;
    Ok(Json(json!({
        "message": i18n::t("booking.email_sent"),
        "booking": booking,
    })))
}
