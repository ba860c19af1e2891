use serde::Deserialize;
use tracing::debug;

use crate::models::task::{TaskCreateInput, TaskRecord, TaskUpdateInput};
use crate::services::task_ordering::{SortOption, TaskFilter};
use crate::services::task_service::{TaskBoard, TaskCompletion};

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskBoardQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
}

pub async fn tasks_board(
    state: &AppState,
    user_id: String,
    query: Option<TaskBoardQuery>,
) -> CommandResult<TaskBoard> {
    let state = state.clone();
    let query = query.unwrap_or_default();
    debug!(target: "app::command", filter = ?query.filter, sort = ?query.sort, "tasks_board");
    run_blocking(move || {
        let filter = match query.filter.as_deref() {
            Some(value) => TaskFilter::parse(value)?,
            None => TaskFilter::default(),
        };
        let sort = match query.sort.as_deref() {
            Some(value) => SortOption::parse(value)?,
            None => SortOption::default(),
        };
        state.tasks().board(&user_id, filter, sort)
    })
    .await
}

pub async fn tasks_list(
    state: &AppState,
    user_id: String,
    bucket_id: Option<String>,
) -> CommandResult<Vec<TaskRecord>> {
    let state = state.clone();
    run_blocking(move || state.tasks().list(&user_id, bucket_id.as_deref())).await
}

pub async fn tasks_get(state: &AppState, user_id: String, id: String) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().get(&user_id, &id)).await
}

pub async fn tasks_create(
    state: &AppState,
    user_id: String,
    payload: TaskCreateInput,
) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().create(&user_id, payload)).await
}

pub async fn tasks_update(
    state: &AppState,
    user_id: String,
    id: String,
    payload: TaskUpdateInput,
) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().update(&user_id, &id, payload)).await
}

pub async fn tasks_delete(state: &AppState, user_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.tasks().delete(&user_id, &id)).await
}

pub async fn tasks_complete(
    state: &AppState,
    user_id: String,
    id: String,
    note: Option<String>,
) -> CommandResult<TaskCompletion> {
    let state = state.clone();
    run_blocking(move || state.tasks().complete(&user_id, &id, note)).await
}

pub async fn tasks_reopen(state: &AppState, user_id: String, id: String) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().reopen(&user_id, &id)).await
}

pub async fn tasks_snooze(
    state: &AppState,
    user_id: String,
    id: String,
    days: u32,
) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().snooze(&user_id, &id, days)).await
}

pub async fn tasks_unsnooze(state: &AppState, user_id: String, id: String) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().unsnooze(&user_id, &id)).await
}

pub async fn tasks_add_activity(
    state: &AppState,
    user_id: String,
    id: String,
    text: String,
) -> CommandResult<TaskRecord> {
    let state = state.clone();
    run_blocking(move || state.tasks().add_activity(&user_id, &id, &text)).await
}
