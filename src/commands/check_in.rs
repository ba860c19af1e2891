use serde::Deserialize;

use crate::models::check_in::{
    CheckInAnswer, CheckInResponse, CheckInSummary, Measure, MeasureCreateInput, MeasureUpdateInput,
};

use super::{run_blocking, AppState, CommandResult};

const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSubmission {
    /// `YYYY-MM-DD`; today in the user's timezone when absent.
    #[serde(default)]
    pub date: Option<String>,
    pub answers: Vec<CheckInAnswer>,
}

pub async fn measures_list(
    state: &AppState,
    user_id: String,
    active_only: Option<bool>,
) -> CommandResult<Vec<Measure>> {
    let state = state.clone();
    run_blocking(move || state.measures().list(&user_id, active_only.unwrap_or(true))).await
}

pub async fn measures_create(
    state: &AppState,
    user_id: String,
    payload: MeasureCreateInput,
) -> CommandResult<Measure> {
    let state = state.clone();
    run_blocking(move || state.measures().create(&user_id, payload)).await
}

pub async fn measures_update(
    state: &AppState,
    user_id: String,
    id: String,
    payload: MeasureUpdateInput,
) -> CommandResult<Measure> {
    let state = state.clone();
    run_blocking(move || state.measures().update(&user_id, &id, payload)).await
}

pub async fn measures_delete(state: &AppState, user_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.measures().delete(&user_id, &id)).await
}

/// Saves answers in order; on failure the earlier answers stay saved and the
/// first error is returned.
pub async fn check_in_submit(
    state: &AppState,
    user_id: String,
    submission: CheckInSubmission,
) -> CommandResult<Vec<CheckInResponse>> {
    let state = state.clone();
    run_blocking(move || {
        state
            .check_ins()
            .submit(&user_id, submission.date.as_deref(), submission.answers)
    })
    .await
}

pub async fn check_in_history(
    state: &AppState,
    user_id: String,
    days: Option<u32>,
) -> CommandResult<Vec<CheckInResponse>> {
    let state = state.clone();
    run_blocking(move || {
        state
            .check_ins()
            .history(&user_id, days.unwrap_or(DEFAULT_HISTORY_DAYS))
    })
    .await
}

pub async fn check_in_summary(state: &AppState, user_id: String) -> CommandResult<CheckInSummary> {
    let state = state.clone();
    run_blocking(move || state.check_ins().summary(&user_id)).await
}

pub async fn check_in_streak(state: &AppState, user_id: String) -> CommandResult<u32> {
    let state = state.clone();
    run_blocking(move || state.check_ins().streak(&user_id)).await
}

pub async fn check_in_delete_response(
    state: &AppState,
    user_id: String,
    id: String,
) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.check_ins().delete_response(&user_id, &id)).await
}
