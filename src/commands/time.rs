use chrono::NaiveDate;

use crate::models::analytics::{AllocationReport, BucketHours, WeeklyCapacity};
use crate::models::time_entry::{TimeEntry, TimeEntryCreateInput, TimeEntryUpdateInput};
use crate::utils::dates::parse_date;

use super::{run_blocking, AppState, CommandResult};

pub async fn time_log(
    state: &AppState,
    user_id: String,
    payload: TimeEntryCreateInput,
) -> CommandResult<TimeEntry> {
    let state = state.clone();
    run_blocking(move || state.time().log_entry(&user_id, payload)).await
}

/// `None` when the timer ran for less than a minute.
pub async fn time_record_timer(
    state: &AppState,
    user_id: String,
    bucket_id: String,
    elapsed_seconds: u64,
    description: Option<String>,
) -> CommandResult<Option<TimeEntry>> {
    let state = state.clone();
    run_blocking(move || {
        state
            .time()
            .record_timer(&user_id, &bucket_id, elapsed_seconds, description)
    })
    .await
}

pub async fn time_entries(
    state: &AppState,
    user_id: String,
    from: String,
    to: String,
) -> CommandResult<Vec<TimeEntry>> {
    let state = state.clone();
    run_blocking(move || {
        let from = parse_date(&from)?;
        let to = parse_date(&to)?;
        state.time().list_entries(&user_id, from, to)
    })
    .await
}

pub async fn time_update(
    state: &AppState,
    user_id: String,
    id: String,
    payload: TimeEntryUpdateInput,
) -> CommandResult<TimeEntry> {
    let state = state.clone();
    run_blocking(move || state.time().update_entry(&user_id, &id, payload)).await
}

pub async fn time_delete(state: &AppState, user_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.time().delete_entry(&user_id, &id)).await
}

pub async fn time_allocation(
    state: &AppState,
    user_id: String,
    week_of: Option<String>,
) -> CommandResult<AllocationReport> {
    let state = state.clone();
    run_blocking(move || {
        let week_of: Option<NaiveDate> = week_of.as_deref().map(parse_date).transpose()?;
        state.time().allocation_report(&user_id, week_of)
    })
    .await
}

pub async fn time_week_overview(state: &AppState, user_id: String) -> CommandResult<Vec<BucketHours>> {
    let state = state.clone();
    run_blocking(move || state.time().week_overview(&user_id)).await
}

pub async fn time_capacity(state: &AppState, user_id: String) -> CommandResult<WeeklyCapacity> {
    let state = state.clone();
    run_blocking(move || state.time().capacity(&user_id)).await
}
