use crate::models::progress::{
    ProgressLogCreateInput, ProgressLogEntry, ProgressLogUpdateInput, Timeline, TimelineFilter,
};

use super::{run_blocking, AppState, CommandResult};

pub async fn progress_create(
    state: &AppState,
    user_id: String,
    payload: ProgressLogCreateInput,
) -> CommandResult<ProgressLogEntry> {
    let state = state.clone();
    run_blocking(move || state.progress().create(&user_id, payload)).await
}

pub async fn progress_update(
    state: &AppState,
    user_id: String,
    id: String,
    payload: ProgressLogUpdateInput,
) -> CommandResult<ProgressLogEntry> {
    let state = state.clone();
    run_blocking(move || state.progress().update(&user_id, &id, payload)).await
}

pub async fn progress_delete(state: &AppState, user_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.progress().delete(&user_id, &id)).await
}

pub async fn progress_timeline(
    state: &AppState,
    user_id: String,
    filter: Option<TimelineFilter>,
    tag: Option<String>,
) -> CommandResult<Timeline> {
    let state = state.clone();
    run_blocking(move || {
        state
            .progress()
            .timeline(&user_id, filter.unwrap_or_default(), tag.as_deref())
    })
    .await
}
