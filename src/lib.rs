pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::path::Path;

use tracing::info;

use crate::commands::AppState;
use crate::db::DbPool;
use crate::error::AppResult;

const DATABASE_FILE: &str = "lifetrack.sqlite";
const LOG_DIR: &str = "logs";

/// Sets up logging and the database under `data_dir` and wires every service.
pub fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    std::fs::create_dir_all(data_dir)?;
    crate::utils::logger::init_logging(&data_dir.join(LOG_DIR))?;

    let pool = DbPool::new(data_dir.join(DATABASE_FILE))?;
    let state = AppState::new(pool)?;
    info!(
        target: "app::startup",
        data_dir = %data_dir.display(),
        ai_extraction = state.extraction().has_remote(),
        "application state ready"
    );
    Ok(state)
}
