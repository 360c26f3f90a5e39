use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;

use crate::db::models::{Event, EventDraft};
use crate::db::repository::EventRepository;
use crate::error::AppResult;
use crate::i18n;
use crate::routes::{auth::AdminUser, json_body};
use crate::services::schedule::ScheduleService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/:id", delete(delete_event))
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<Event>>> {
    Ok(Json(EventRepository::list_all(&state.db).await?))
}

/// POST /api/admin/events
/// Body: { label, date, time, durationMinutes }
async fn create_event(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    payload: Result<Json<EventDraft>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let draft = json_body(payload)?;
    let event = ScheduleService::create_event(&state.db, &draft).await?;
    Ok(Json(json!({
        "id": event.id,
        "message": i18n::t("event.created"),
        "event": event,
    })))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    ScheduleService::delete_event(&state.db, &id).await?;
    Ok(Json(json!({ "message": i18n::t("event.deleted") })))
}
