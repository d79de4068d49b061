use axum::{routing::get, Router};

use crate::error::ApiError;
use crate::snapshot::ChallengeSnapshot;
use crate::AppState;

pub mod batch;
pub mod dashboard;
pub mod leaderboard;
pub mod roster;
pub mod weeks;

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(weeks::routes(state.clone()))
        .merge(roster::routes(state.clone()))
        .merge(leaderboard::routes(state.clone()))
        .merge(batch::routes(state.clone()))
        .merge(dashboard::routes(state))
        .route("/health", get(|| async { "✅ Dashboard up" }))
}

pub(crate) async fn load_snapshot(state: &AppState, challenge_id: &str) -> Result<ChallengeSnapshot, ApiError> {
    let chart = state.upstream.chart_data(challenge_id).await?;
    Ok(ChallengeSnapshot::from_chart(chart, state.config.numbering))
}

pub(crate) fn unknown_week(week: u32) -> ApiError {
    ApiError::NotFound(format!("week {} is not part of this challenge", week))
}
