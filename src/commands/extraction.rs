use crate::services::task_extraction::ExtractedTasks;

use super::{AppState, CommandError, CommandResult};

/// Already async; the HTTP call does not touch the database.
pub async fn extract_tasks(state: &AppState, text: String) -> CommandResult<ExtractedTasks> {
    state
        .extraction()
        .extract(&text)
        .await
        .map_err(CommandError::from)
}
