use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use crate::error::ApiError;
use crate::present::{leaderboard, LeaderboardRow};
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/challenges/:id/leaderboard", get(get_leaderboard))
        .with_state(state)
}

/// Names come from the chart data; if that fetch fails the board is still served without them.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(challenge_id): Path<String>,
) -> Result<Json<Vec<LeaderboardRow>>, ApiError> {
    let (entries, chart) = tokio::join!(
        state.upstream.leaderboard(&challenge_id),
        state.upstream.chart_data(&challenge_id),
    );

    let users = match chart {
        Ok(chart) => chart.users,
        Err(e) => {
            tracing::warn!("⚠️ leaderboard for {} served without names: {}", challenge_id, e);
            Vec::new()
        }
    };

    Ok(Json(leaderboard(&entries?, &users)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{mock_json, state_for, CHART};

    #[tokio::test]
    async fn test_leaderboard_ranks_with_ties() {
        let mut server = mockito::Server::new_async().await;
        let _m = mock_json(&mut server, "/api/challenges/c1/chart-data", CHART).await;
        let _m = mock_json(
            &mut server,
            "/api/challenges/c1/leaderboard",
            r#"[{"user_id":"a","points":12},{"user_id":"b","points":"15.5"},{"user_id":"c","points":12}]"#,
        )
        .await;

        let Json(rows) = get_leaderboard(State(state_for(&server.url())), Path("c1".into()))
            .await
            .unwrap();

        let ranks: Vec<(u32, &str)> = rows.iter().map(|r| (r.rank, r.user_id.as_str())).collect();
        assert_eq!(ranks, [(1, "b"), (2, "a"), (2, "c")]);
        assert_eq!(rows[0].name.as_deref(), Some("Baek"));
        assert_eq!(rows[0].label, "15.5");
    }

    #[tokio::test]
    async fn test_leaderboard_without_chart_data() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/challenges/c1/chart-data")
            .with_status(404)
            .create_async()
            .await;
        let _m = mock_json(&mut server, "/api/challenges/c1/leaderboard", r#"[{"userId":7,"points":1}]"#).await;

        let Json(rows) = get_leaderboard(State(state_for(&server.url())), Path("c1".into()))
            .await
            .unwrap();
        assert_eq!(rows[0].user_id, "7");
        assert_eq!(rows[0].name, None);
    }
}
