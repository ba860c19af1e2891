use crate::models::analytics::{GoalProgress, MeasureTrend, TimeAllocationSummary};

use super::{run_blocking, AppState, CommandResult};

const DEFAULT_WINDOW_DAYS: u32 = 30;

pub async fn trends_check_ins(
    state: &AppState,
    user_id: String,
    days: Option<u32>,
) -> CommandResult<Vec<MeasureTrend>> {
    let state = state.clone();
    run_blocking(move || {
        state
            .trends()
            .check_in_trends(&user_id, days.unwrap_or(DEFAULT_WINDOW_DAYS))
    })
    .await
}

pub async fn trends_goal_progress(
    state: &AppState,
    user_id: String,
    days: Option<u32>,
) -> CommandResult<Vec<GoalProgress>> {
    let state = state.clone();
    run_blocking(move || {
        state
            .trends()
            .goal_progress(&user_id, days.unwrap_or(DEFAULT_WINDOW_DAYS))
    })
    .await
}

pub async fn trends_time_allocation(
    state: &AppState,
    user_id: String,
    days: Option<u32>,
) -> CommandResult<TimeAllocationSummary> {
    let state = state.clone();
    run_blocking(move || {
        state
            .trends()
            .time_allocation(&user_id, days.unwrap_or(DEFAULT_WINDOW_DAYS))
    })
    .await
}
