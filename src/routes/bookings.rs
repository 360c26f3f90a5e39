use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::error::AppResult;
use crate::i18n;
use crate::routes::json_body;
use crate::services::booking::{BookingRequest, BookingService, BookingSubmission};
use crate::AppState;

/// Public booking endpoint. Rate limited per client IP by the caller.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(create_booking))
}

/// POST /api/bookings
/// Body: { ruleId | eventId, date, time, name, email }
async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingSubmission>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let request = BookingRequest::try_from(json_body(payload)?)?;
    let booking = BookingService::new(&state).submit(request).await?;

    Ok(Json(json!({
        "id": booking.id,
        "message": i18n::t("booking.created"),
        "booking": booking,
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::{self, date};

    #[tokio::test]
    async fn books_and_then_conflicts() {
        let (state, notifier) = test_support::test_state(date("2026-02-20")).await;
        let rule_id = test_support::seed_monday_rule(&state.db).await;
        let app = test_support::test_app(state);
        let body = json!({
            "ruleId": rule_id,
            "date": "2026-03-09",
            "time": "10:00",
            "name": "Max",
            "email": "max@example.com"
        });

        let (status, created) =
            test_support::send(&app, test_support::json_request("POST", "/api/bookings", &body, None))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(created["id"].as_str().is_some());
        assert_eq!(created["booking"]["durationMinutes"], 50);
        assert_eq!(created["booking"]["status"], "confirmed");

        let (status, conflict) =
            test_support::send(&app, test_support::json_request("POST", "/api/bookings", &body, None))
                .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(conflict["error"]["code"], "SLOT_UNAVAILABLE");

        let (_, slots) = test_support::send(
            &app,
            test_support::get("/api/slots?from=2026-03-09&to=2026-03-09"),
        )
        .await;
        assert_eq!(slots.as_array().unwrap().len(), 0);
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn client_errors() {
        let (state, _) = test_support::test_state(date("2026-02-20")).await;
        let rule_id = test_support::seed_monday_rule(&state.db).await;
        let app = test_support::test_app(state);

        let cases = [
            (json!({"date": "2026-03-09"}), StatusCode::BAD_REQUEST),
            (
                json!({"ruleId": rule_id, "date": "2026-03-09", "time": "10:00", "name": "Max", "email": "nope"}),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({"ruleId": rule_id, "eventId": "e1", "date": "2026-03-09", "time": "10:00", "name": "Max", "email": "max@example.com"}),
                StatusCode::BAD_REQUEST,
            ),
            (
                json!({"ruleId": "missing", "date": "2026-03-09", "time": "10:00", "name": "Max", "email": "max@example.com"}),
                StatusCode::NOT_FOUND,
            ),
            (
                json!({"ruleId": rule_id, "date": "2026-03-10", "time": "10:00", "name": "Max", "email": "max@example.com"}),
                StatusCode::CONFLICT,
            ),
        ];

        for (body, expected) in cases {
            let (status, _) = test_support::send(
                &app,
                test_support::json_request("POST", "/api/bookings", &body, None),
            )
            .await;
            assert_eq!(status, expected, "{body}");
        }
    }

    #[tokio::test]
    async fn malformed_json_uses_the_error_envelope() {
        let (state, _) = test_support::test_state(date("2026-02-20")).await;
        let app = test_support::test_app(state);

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/bookings")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, body) = test_support::send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}
