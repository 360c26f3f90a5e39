use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{RecurringRule, RuleDraft};
use crate::db::repository::RuleRepository;
use crate::error::AppResult;
use crate::i18n;
use crate::routes::{auth::AdminUser, json_body};
use crate::services::schedule::ScheduleService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_rules).post(create_rule))
        .route("/:id", put(replace_rule).delete(delete_rule))
        .route("/:id/exceptions", post(toggle_exception))
}

#[derive(Debug, Deserialize)]
pub struct ExceptionRequest {
    #[serde(default)]
    pub date: Option<String>,
}

async fn list_rules(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<RecurringRule>>> {
    Ok(Json(RuleRepository::list_all(&state.db).await?))
}

/// POST /api/admin/rules
/// Body: { label, time, durationMinutes, days: [{dayOfWeek, frequency}], startDate, endDate }
async fn create_rule(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    payload: Result<Json<RuleDraft>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let draft = json_body(payload)?;
    let id = ScheduleService::create_rule(&state.db, &draft).await?;
    Ok(Json(json!({ "id": id, "message": i18n::t("rule.created") })))
}

async fn replace_rule(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<RuleDraft>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let draft = json_body(payload)?;
    ScheduleService::replace_rule(&state.db, &id, &draft).await?;
    Ok(Json(json!({ "message": i18n::t("rule.updated") })))
}

async fn delete_rule(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    ScheduleService::delete_rule(&state.db, &id).await?;
    Ok(Json(json!({ "message": i18n::t("rule.deleted") })))
}

/// POST /api/admin/rules/:id/exceptions
/// Body: { date }
async fn toggle_exception(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    payload: Result<Json<ExceptionRequest>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let request = json_body(payload)?;
    let (action, date) =
        ScheduleService::toggle_exception(&state.db, &id, request.date.as_deref()).await?;
    Ok(Json(json!({ "action": action, "date": date })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::{self, date};

    fn rule_body() -> serde_json::Value {
        json!({
            "label": "Einzeltherapie",
            "time": "10:00",
            "durationMinutes": 50,
            "days": [{ "dayOfWeek": 1, "frequency": "weekly" }],
            "startDate": "2026-03-02",
            "endDate": null
        })
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let (state, _) = test_support::test_state(date("2026-02-20")).await;
        let app = test_support::test_app(state);

        let (status, body) = test_support::send(&app, test_support::get("/api/admin/rules")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, body) = test_support::send(
            &app,
            test_support::json_request("POST", "/api/admin/rules", &rule_body(), Some("garbage")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn create_list_toggle_and_delete() {
        let (state, _) = test_support::test_state(date("2026-02-20")).await;
        let token = test_support::admin_token(&state);
        let app = test_support::test_app(state);

        let (status, created) = test_support::send(
            &app,
            test_support::json_request("POST", "/api/admin/rules", &rule_body(), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) = test_support::send(
            &app,
            test_support::authed_get("/api/admin/rules", &token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["time"], "10:00");
        assert_eq!(listed[0]["days"][0]["dayOfWeek"], 1);

        let exception_uri = format!("/api/admin/rules/{id}/exceptions");
        let (status, toggled) = test_support::send(
            &app,
            test_support::json_request(
                "POST",
                &exception_uri,
                &json!({ "date": "2026-03-09" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["action"], "added");
        assert_eq!(toggled["date"], "2026-03-09");

        let (_, slots) = test_support::send(
            &app,
            test_support::get("/api/slots?from=2026-03-01&to=2026-03-31"),
        )
        .await;
        assert_eq!(slots.as_array().unwrap().len(), 4);

        let (_, toggled) = test_support::send(
            &app,
            test_support::json_request(
                "POST",
                &exception_uri,
                &json!({ "date": "2026-03-09" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(toggled["action"], "removed");

        let (_, slots) = test_support::send(
            &app,
            test_support::get("/api/slots?from=2026-03-01&to=2026-03-31"),
        )
        .await;
        let slots = slots.as_array().unwrap();
        assert_eq!(slots.len(), 5);
        assert!(slots.iter().any(|slot| slot["date"] == "2026-03-09"));

        let mut replacement = rule_body();
        replacement["days"] = json!([]);
        let (status, body) = test_support::send(
            &app,
            test_support::json_request(
                "PUT",
                &format!("/api/admin/rules/{id}"),
                &replacement,
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let delete_uri = format!("/api/admin/rules/{id}");
        let (status, _) = test_support::send(
            &app,
            test_support::json_request("DELETE", &delete_uri, &json!({}), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = test_support::send(
            &app,
            test_support::json_request("DELETE", &delete_uri, &json!({}), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
