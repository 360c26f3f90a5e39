use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, routing::get, Json, Router};

use crate::error::{AppError, AppResult};
use crate::AppState;

pub mod admin_bookings;
pub mod auth;
pub mod bookings;
pub mod events;
pub mod health;
pub mod rules;
pub mod slots;

/// All API routes. `bookings` is passed in so the caller can wrap the public
/// booking endpoint in its rate limiter.
pub fn api_router(bookings: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/slots", slots::router())
        .nest("/api/bookings", bookings)
        .nest("/api/admin/rules", rules::router())
        .nest("/api/admin/events", events::router())
        .nest("/api/admin/bookings", admin_bookings::router())
}

/// Unwrap a JSON body, reporting malformed input in the common error envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        AppError::BadRequest(crate::i18n::t_with(
            "bad_request.invalid_json",
            &[("err", rejection.body_text().as_str())],
        ))
    })
}
