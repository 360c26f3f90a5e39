use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::{parse_iso_date, Slot};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::availability::{load_slots, DateRange};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_slots))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_query_date(raw: &str) -> AppResult<chrono::NaiveDate> {
    parse_iso_date(raw).ok_or_else(|| {
        AppError::BadRequest(i18n::t_with("bad_request.invalid_date", &[("value", raw)]))
    })
}

impl RangeQuery {
    /// The requested range, `None` when neither bound is given.
    pub fn range(&self) -> AppResult<Option<DateRange>> {
        let from = self.from.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let to = self.to.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (from, to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => {
                let (from, to) = (parse_query_date(from)?, parse_query_date(to)?);
                DateRange::new(from, to)
                    .map(Some)
                    .ok_or_else(|| AppError::BadRequest(i18n::t("bad_request.range_order")))
            }
            _ => Err(AppError::BadRequest(i18n::t("bad_request.range_required"))),
        }
    }
}

/// GET /api/slots?from=YYYY-MM-DD&to=YYYY-MM-DD
async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<Slot>>> {
    let range = query
        .range()?
        .ok_or_else(|| AppError::BadRequest(i18n::t("bad_request.range_required")))?;

    let slots = load_slots(&state.db, range, state.clock.today()).await?;
    tracing::debug!(
        "Generated {} slot(s) for {} .. {}",
        slots.len(),
        range.from,
        range.to
    );
    Ok(Json(slots))
}
