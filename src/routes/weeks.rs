use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::present::{donut, Donut};
use crate::weeks::{find_week, WeekWindow};
use crate::AppState;

use super::{load_snapshot, unknown_week};

#[derive(Deserialize)]
pub struct DonutQuery {
    pub user: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/challenges/:id/weeks", get(get_weeks))
        .route("/challenges/:id/weeks/:week/donut", get(get_donut))
        .with_state(state)
}

pub async fn get_weeks(
    State(state): State<AppState>,
    Path(challenge_id): Path<String>,
) -> Result<Json<Vec<WeekWindow>>, ApiError> {
    let snapshot = load_snapshot(&state, &challenge_id).await?;
    if snapshot.period.is_none() {
        tracing::warn!("⚠️ challenge {} has no usable period", challenge_id);
    }
    Ok(Json(snapshot.windows))
}

pub async fn get_donut(
    State(state): State<AppState>,
    Path((challenge_id, week)): Path<(String, u32)>,
    Query(query): Query<DonutQuery>,
) -> Result<Json<Donut>, ApiError> {
    let snapshot = load_snapshot(&state, &challenge_id).await?;
    let index = find_week(&snapshot.windows, week).ok_or_else(|| unknown_week(week))?;

    let bucketed = snapshot.bucketed(state.config.display_tz);
    let user = query.user.as_deref().filter(|u| !u.is_empty());
    Ok(Json(donut(index, &snapshot.windows[index], &bucketed, user)))
}
