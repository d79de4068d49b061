use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::DayBreakdown;
use crate::dates::parse_calendar_date;
use crate::error::ApiError;
use crate::present::{RosterRow, SortSpec};
use crate::AppState;

use super::{load_snapshot, unknown_week};

#[derive(Deserialize)]
pub struct RosterQuery {
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub as_of: Option<String>,
}

#[derive(Deserialize)]
pub struct DailyQuery {
    pub week: Option<u32>,
}

#[derive(Serialize)]
pub struct DailyResponse {
    pub user_id: String,
    pub week_number: u32,
    pub label: String,
    pub days: Vec<DayBreakdown>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/challenges/:id/roster", get(get_roster))
        .route("/challenges/:id/users/:user_id/daily", get(get_daily))
        .with_state(state)
}

fn as_of_date(state: &AppState, raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw {
        None => Ok(state.config.display_tz.today()),
        Some(raw) => parse_calendar_date(raw).ok_or_else(|| ApiError::BadRequest(format!("invalid as_of date '{}'", raw))),
    }
}

pub async fn get_roster(
    State(state): State<AppState>,
    Path(challenge_id): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Vec<RosterRow>>, ApiError> {
    let sort = SortSpec::parse(query.sort.as_deref(), query.dir.as_deref()).map_err(ApiError::BadRequest)?;
    let as_of = as_of_date(&state, query.as_of.as_deref())?;

    let snapshot = load_snapshot(&state, &challenge_id).await?;
    let rows = snapshot.roster(state.config.display_tz, as_of, state.config.sparkline_weeks, sort);
    Ok(Json(rows))
}

pub async fn get_daily(
    State(state): State<AppState>,
    Path((challenge_id, user_id)): Path<(String, String)>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<DailyResponse>, ApiError> {
    let snapshot = load_snapshot(&state, &challenge_id).await?;
    let tz = state.config.display_tz;

    let index = snapshot
        .week_index(query.week, tz.today())
        .map_err(unknown_week)?
        .ok_or_else(|| ApiError::NotFound(format!("challenge {} has no weeks", challenge_id)))?;
    let window = &snapshot.windows[index];
    let days = snapshot
        .daily(tz, index, &user_id)
        .ok_or_else(|| ApiError::NotFound(format!("challenge {} has no period", challenge_id)))?;

    Ok(Json(DailyResponse {
        user_id,
        week_number: window.week_number,
        label: window.label.clone(),
        days,
    }))
}
