//! The composite dashboard view and the manual refresh hook.
//!
//! Chart data, leaderboard and today's count are fetched together; each panel
//! succeeds or fails on its own so one slow or broken endpoint never blanks
//! the whole page.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::DayBreakdown;
use crate::error::ApiError;
use crate::present::{donut, leaderboard, participation, Donut, LeaderboardRow, Participation, RosterRow, SortSpec};
use crate::snapshot::ChallengeSnapshot;
use crate::view_state::{reduce_all, Action, ViewState};
use crate::weeks::WeekWindow;
use crate::AppState;

use super::unknown_week;

#[derive(Deserialize, Default)]
pub struct DashboardQuery {
    pub week: Option<u32>,
    pub user: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub state: ViewState,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready { data: T },
    Failed { error: String },
}

impl<T> Panel<T> {
    fn failed(error: impl ToString) -> Self {
        Panel::Failed {
            error: error.to_string(),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            Panel::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub view: ViewState,
    pub weeks: Vec<WeekWindow>,
    pub active_week: Option<u32>,
    pub roster: Panel<Vec<RosterRow>>,
    pub donut: Panel<Donut>,
    /// Only when a user is selected.
    pub daily: Option<Panel<Vec<DayBreakdown>>>,
    pub leaderboard: Panel<Vec<LeaderboardRow>>,
    pub participation: Panel<Participation>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/challenges/:id/dashboard", get(get_dashboard))
        .route("/challenges/:id/refresh", post(refresh))
        .route("/challenges/:id/view", post(post_view))
        .with_state(state)
}

fn view_for(challenge_id: &str, query: &DashboardQuery, sort: SortSpec) -> ViewState {
    let mut actions = vec![Action::SelectChallenge(challenge_id.to_string())];
    if query.refresh {
        actions.push(Action::Refresh);
    }
    if let Some(week) = query.week {
        actions.push(Action::SelectWeek(week));
    }
    if let Some(user) = query.user.as_ref().filter(|u| !u.is_empty()) {
        actions.push(Action::SelectUser(user.clone()));
    }
    actions.push(Action::SetSort(sort));
    reduce_all(ViewState::default(), actions)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(challenge_id): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let sort = SortSpec::parse(query.sort.as_deref(), query.dir.as_deref()).map_err(ApiError::BadRequest)?;
    let view = view_for(&challenge_id, &query, sort);
    state.upstream.endpoint(&challenge_id, "")?;

    if query.refresh {
        state.upstream.invalidate_challenge(&challenge_id).await?;
    }

    let (chart, board, today) = tokio::join!(
        state.upstream.chart_data(&challenge_id),
        state.upstream.leaderboard(&challenge_id),
        state.upstream.today_count(&challenge_id),
    );

    let config = &state.config;
    let tz = config.display_tz;
    let today_date = tz.today();

    let snapshot = chart.map(|chart| ChallengeSnapshot::from_chart(chart, config.numbering));

    let (weeks, active_week, roster, donut_panel, daily) = match &snapshot {
        Ok(snapshot) => {
            let index = snapshot
                .week_index(view.selected_week, today_date)
                .map_err(unknown_week)?;

            let roster = snapshot.roster(tz, today_date, config.sparkline_weeks, view.sort);
            let (donut_panel, daily) = match index {
                Some(i) => {
                    let window = &snapshot.windows[i];
                    let user = view.selected_user.as_deref();
                    let daily = user.map(|u| match snapshot.daily(tz, i, u) {
                        Some(data) => Panel::Ready { data },
                        None => Panel::failed("challenge has no period"),
                    });
                    (
                        Panel::Ready {
                            data: donut(i, window, &snapshot.bucketed(tz), user),
                        },
                        daily,
                    )
                }
                None => (Panel::failed("challenge has no weeks"), None),
            };

            (
                snapshot.windows.clone(),
                index.map(|i| snapshot.windows[i].week_number),
                Panel::Ready { data: roster },
                donut_panel,
                daily,
            )
        }
        Err(e) => {
            tracing::warn!("⚠️ chart panel for {} failed: {}", challenge_id, e);
            let daily = view.selected_user.as_ref().map(|_| Panel::failed(e));
            (Vec::new(), None, Panel::failed(e), Panel::failed(e), daily)
        }
    };

    let users = snapshot.as_ref().map(|s| s.users.as_slice()).unwrap_or(&[]);

    let leaderboard_panel = match board {
        Ok(entries) => Panel::Ready {
            data: leaderboard(&entries, users),
        },
        Err(e) => {
            tracing::warn!("⚠️ leaderboard panel for {} failed: {}", challenge_id, e);
            Panel::failed(e)
        }
    };

    let total = snapshot.as_ref().ok().map(|s| s.users.len());
    let participation_panel = match today {
        Ok(count) => Panel::Ready {
            data: participation(count.count, total),
        },
        Err(e) => {
            tracing::warn!("⚠️ participation panel for {} failed: {}", challenge_id, e);
            Panel::failed(e)
        }
    };

    Ok(Json(DashboardResponse {
        view,
        weeks,
        active_week,
        roster,
        donut: donut_panel,
        daily,
        leaderboard: leaderboard_panel,
        participation: participation_panel,
    }))
}

pub async fn refresh(State(state): State<AppState>, Path(challenge_id): Path<String>) -> Result<StatusCode, ApiError> {
    state.upstream.invalidate_challenge(&challenge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Applies `actions` to a client-held view state for this challenge.
pub async fn post_view(Path(challenge_id): Path<String>, Json(request): Json<ViewRequest>) -> Json<ViewState> {
    let actions = std::iter::once(Action::SelectChallenge(challenge_id)).chain(request.actions);
    Json(reduce_all(request.state, actions))
}
