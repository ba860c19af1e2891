use crate::models::bucket::{Bucket, BucketCreateInput, BucketNode, BucketUpdateInput, TimeTarget};

use super::{run_blocking, AppState, CommandResult};

pub async fn buckets_list(
    state: &AppState,
    user_id: String,
    include_inactive: Option<bool>,
) -> CommandResult<Vec<Bucket>> {
    let state = state.clone();
    run_blocking(move || state.buckets().list(&user_id, include_inactive.unwrap_or(false))).await
}

pub async fn buckets_tree(
    state: &AppState,
    user_id: String,
    include_inactive: Option<bool>,
) -> CommandResult<Vec<BucketNode>> {
    let state = state.clone();
    run_blocking(move || state.buckets().tree(&user_id, include_inactive.unwrap_or(false))).await
}

pub async fn buckets_get(state: &AppState, user_id: String, id: String) -> CommandResult<Bucket> {
    let state = state.clone();
    run_blocking(move || state.buckets().get(&user_id, &id)).await
}

pub async fn buckets_create(
    state: &AppState,
    user_id: String,
    payload: BucketCreateInput,
) -> CommandResult<Bucket> {
    let state = state.clone();
    run_blocking(move || state.buckets().create(&user_id, payload)).await
}

pub async fn buckets_update(
    state: &AppState,
    user_id: String,
    id: String,
    payload: BucketUpdateInput,
) -> CommandResult<Bucket> {
    let state = state.clone();
    run_blocking(move || state.buckets().update(&user_id, &id, payload)).await
}

pub async fn buckets_archive(state: &AppState, user_id: String, id: String) -> CommandResult<Bucket> {
    let state = state.clone();
    run_blocking(move || state.buckets().archive(&user_id, &id)).await
}

/// Fails with `CONFLICT` while tasks, goals or time entries still point at the
/// bucket.
pub async fn buckets_delete(state: &AppState, user_id: String, id: String) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.buckets().delete(&user_id, &id)).await
}

pub async fn buckets_set_target(
    state: &AppState,
    user_id: String,
    bucket_id: String,
    target_percent: f64,
) -> CommandResult<TimeTarget> {
    let state = state.clone();
    run_blocking(move || state.buckets().set_target(&user_id, &bucket_id, target_percent)).await
}

pub async fn buckets_clear_target(
    state: &AppState,
    user_id: String,
    bucket_id: String,
) -> CommandResult<()> {
    let state = state.clone();
    run_blocking(move || state.buckets().clear_target(&user_id, &bucket_id)).await
}

pub async fn buckets_list_targets(state: &AppState, user_id: String) -> CommandResult<Vec<TimeTarget>> {
    let state = state.clone();
    run_blocking(move || state.buckets().list_targets(&user_id)).await
}
