pub mod analytics;
pub mod bucket;
pub mod check_in;
pub mod extraction;
pub mod goal;
pub mod progress;
pub mod settings;
pub mod task;
pub mod time;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::error;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::bucket_service::BucketService;
use crate::services::check_in_service::CheckInService;
use crate::services::goal_service::GoalService;
use crate::services::measure_service::MeasureService;
use crate::services::progress_service::ProgressService;
use crate::services::settings_service::SettingsService;
use crate::services::task_extraction::{ExtractionConfig, TaskExtractionService};
use crate::services::task_service::TaskService;
use crate::services::time_service::TimeService;
use crate::services::trends_service::TrendsService;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    bucket_service: Arc<BucketService>,
    goal_service: Arc<GoalService>,
    task_service: Arc<TaskService>,
    measure_service: Arc<MeasureService>,
    check_in_service: Arc<CheckInService>,
    time_service: Arc<TimeService>,
    progress_service: Arc<ProgressService>,
    trends_service: Arc<TrendsService>,
    settings_service: Arc<SettingsService>,
    extraction_service: Arc<TaskExtractionService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        Self::with_extraction(db_pool, ExtractionConfig::from_env())
    }

    pub fn with_extraction(db_pool: DbPool, extraction: ExtractionConfig) -> AppResult<Self> {
        Ok(Self {
            bucket_service: Arc::new(BucketService::new(db_pool.clone())),
            goal_service: Arc::new(GoalService::new(db_pool.clone())),
            task_service: Arc::new(TaskService::new(db_pool.clone())),
            measure_service: Arc::new(MeasureService::new(db_pool.clone())),
            check_in_service: Arc::new(CheckInService::new(db_pool.clone())),
            time_service: Arc::new(TimeService::new(db_pool.clone())),
            progress_service: Arc::new(ProgressService::new(db_pool.clone())),
            trends_service: Arc::new(TrendsService::new(db_pool.clone())),
            settings_service: Arc::new(SettingsService::new(db_pool.clone())),
            extraction_service: Arc::new(TaskExtractionService::new(extraction)?),
            db_pool,
        })
    }

    pub fn buckets(&self) -> Arc<BucketService> {
        Arc::clone(&self.bucket_service)
    }

    pub fn goals(&self) -> Arc<GoalService> {
        Arc::clone(&self.goal_service)
    }

    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.task_service)
    }

    pub fn measures(&self) -> Arc<MeasureService> {
        Arc::clone(&self.measure_service)
    }

    pub fn check_ins(&self) -> Arc<CheckInService> {
        Arc::clone(&self.check_in_service)
    }

    pub fn time(&self) -> Arc<TimeService> {
        Arc::clone(&self.time_service)
    }

    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress_service)
    }

    pub fn trends(&self) -> Arc<TrendsService> {
        Arc::clone(&self.trends_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn extraction(&self) -> Arc<TaskExtractionService> {
        Arc::clone(&self.extraction_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => CommandError::new("NOT_FOUND", "The requested record does not exist", None),
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Ai {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => merged.extend(map),
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
            }
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "Failed to serialize data", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "File system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Runs a synchronous service call on tokio's blocking pool.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("command task failed: {err}"), None))?
        .map_err(CommandError::from)
}
