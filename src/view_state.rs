//! Dashboard selection state as one struct with a closed set of actions.

use serde::{Deserialize, Serialize};

use crate::present::{SortDir, SortKey, SortSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Menu {
    ChallengePicker,
    WeekPicker,
    UserPicker,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub challenge_id: Option<String>,
    pub selected_week: Option<u32>,
    pub selected_user: Option<String>,
    pub open_menu: Option<Menu>,
    pub sort: SortSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Action {
    SelectChallenge(String),
    SelectWeek(u32),
    ClearWeek,
    SelectUser(String),
    ClearUser,
    ToggleMenu(Menu),
    CloseMenu,
    /// Clicking the active column flips direction; a new column starts ascending,
    /// except week columns which start highest-first.
    SortBy(SortKey),
    SetSort(SortSpec),
    /// Drops selections so the next render starts from fresh data.
    Refresh,
}

pub fn reduce(state: ViewState, action: Action) -> ViewState {
    match action {
        Action::SelectChallenge(id) => {
            if state.challenge_id.as_deref() == Some(id.as_str()) {
                return ViewState {
                    open_menu: None,
                    ..state
                };
            }
            ViewState {
                challenge_id: Some(id),
                selected_week: None,
                selected_user: None,
                open_menu: None,
                sort: state.sort,
            }
        }
        Action::SelectWeek(week) => ViewState {
            selected_week: Some(week),
            open_menu: None,
            ..state
        },
        Action::ClearWeek => ViewState {
            selected_week: None,
            ..state
        },
        Action::SelectUser(user) => ViewState {
            selected_user: Some(user),
            open_menu: None,
            ..state
        },
        Action::ClearUser => ViewState {
            selected_user: None,
            ..state
        },
        Action::ToggleMenu(menu) => {
            let open_menu = if state.open_menu == Some(menu) { None } else { Some(menu) };
            ViewState { open_menu, ..state }
        }
        Action::CloseMenu => ViewState {
            open_menu: None,
            ..state
        },
        Action::SortBy(key) => {
            let sort = if state.sort.key == key {
                SortSpec {
                    key,
                    dir: state.sort.dir.flip(),
                }
            } else {
                let dir = match key {
                    SortKey::Week(_) => SortDir::Desc,
                    _ => SortDir::Asc,
                };
                SortSpec { key, dir }
            };
            ViewState { sort, ..state }
        }
        Action::SetSort(sort) => ViewState { sort, ..state },
        Action::Refresh => ViewState {
            selected_week: None,
            selected_user: None,
            open_menu: None,
            ..state
        },
    }
}

pub fn reduce_all(state: ViewState, actions: impl IntoIterator<Item = Action>) -> ViewState {
    actions.into_iter().fold(state, reduce)
}
