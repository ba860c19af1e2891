use crate::models::goal::{Goal, GoalCreateInput, GoalStatus, GoalUpdateInput};
use crate::services::goal_service::DEFAULT_UPCOMING_LIMIT;

use super::{run_blocking, AppState, CommandResult};

pub async fn goals_list(
    state: &AppState,
    user_id: String,
    bucket_id: Option<String>,
    status: Option<String>,
) -> CommandResult<Vec<Goal>> {
    let state = state.clone();
    run_blocking(move || {
        let status = status.as_deref().map(GoalStatus::parse).transpose()?;
        state.goals().list(&user_id, bucket_id.as_deref(), status)
    })
    .await
}

pub async fn goals_upcoming(
    state: &AppState,
    user_id: String,
    limit: Option<usize>,
) -> CommandResult<Vec<Goal>> {
    let state = state.clone();
    run_blocking(move || {
        state
            .goals()
            .upcoming(&user_id, limit.unwrap_or(DEFAULT_UPCOMING_LIMIT))
    })
    .await
}

pub async fn goals_get(state: &AppState, user_id: String, id: String) -> CommandResult<Goal> {
    let state = state.clone();
    run_blocking(move || state.goals().get(&user_id, &id)).await
}

pub async fn goals_create(
    state: &AppState,
    user_id: String,
    payload: GoalCreateInput,
) -> CommandResult<Goal> {
    let state = state.clone();
    run_blocking(move || state.goals().create(&user_id, payload)).await
}

pub async fn goals_update(
    state: &AppState,
    user_id: String,
    id: String,
    payload: GoalUpdateInput,
) -> CommandResult<Goal> {
    let state = state.clone();
    run_blocking(move || state.goals().update(&user_id, &id, payload)).await
}

pub async fn goals_delete(state: &AppState, user_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.goals().delete(&user_id, &id)).await
}
