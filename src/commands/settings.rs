use crate::models::settings::{SettingsUpdateInput, UserSettings};

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState, user_id: String) -> CommandResult<UserSettings> {
    let state = state.clone();
    run_blocking(move || state.settings().get(&user_id)).await
}

pub async fn settings_update(
    state: &AppState,
    user_id: String,
    payload: SettingsUpdateInput,
) -> CommandResult<UserSettings> {
    let state = state.clone();
    run_blocking(move || state.settings().update(&user_id, payload)).await
}
