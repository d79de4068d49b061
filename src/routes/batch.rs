use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::present::{batch_rows, BatchRow};
use crate::AppState;

use super::load_snapshot;

#[derive(Deserialize)]
pub struct BatchQuery {
    /// Comma separated; every challenge user when absent.
    pub user_ids: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/challenges/:id/batch", get(get_batch))
        .with_state(state)
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(challenge_id): Path<String>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<Vec<BatchRow>>, ApiError> {
    let snapshot = load_snapshot(&state, &challenge_id).await?;

    let mut user_ids = split_ids(query.user_ids.as_deref());
    if user_ids.is_empty() {
        user_ids = snapshot.users.iter().map(|u| u.id.clone()).collect();
    }
    if user_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let details = state.upstream.weekly_detail(&challenge_id, &user_ids).await?;

    let rows = match snapshot.bucketer(state.config.display_tz) {
        Some(bucketer) => batch_rows(&details, &bucketer),
        None => details
            .iter()
            .map(|d| BatchRow {
                user_id: d.user_id.clone(),
                weeks: Vec::new(),
            })
            .collect(),
    };
    Ok(Json(rows))
}
