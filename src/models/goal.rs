use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::task::Priority;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub bucket_id: String,
    pub parent_goal_id: Option<String>,
    pub measure_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub priority: Priority,
    pub progress_percent: i64,
    pub target_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub target_value: Option<f64>,
    pub target_type: Option<GoalTargetType>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Complete,
    Archived,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "not_started",
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Complete => "complete",
            GoalStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "not_started" => Ok(GoalStatus::NotStarted),
            "in_progress" => Ok(GoalStatus::InProgress),
            "complete" => Ok(GoalStatus::Complete),
            "archived" => Ok(GoalStatus::Archived),
            other => Err(AppError::validation(format!("invalid goal status: {other}"))),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, GoalStatus::NotStarted | GoalStatus::InProgress)
    }
}

/// How a goal linked to a measure rolls up its check-in values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalTargetType {
    /// Mean of the logged values.
    Average,
    /// Number of "yes" (value 1) logs.
    Count,
}

impl GoalTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalTargetType::Average => "average",
            GoalTargetType::Count => "count",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "average" => Ok(GoalTargetType::Average),
            "count" => Ok(GoalTargetType::Count),
            other => Err(AppError::validation(format!("invalid target type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalCheckInLog {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub response_id: String,
    pub log_date: NaiveDate,
    pub value: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalCreateInput {
    pub bucket_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_goal_id: Option<String>,
    #[serde(default)]
    pub measure_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub target_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdateInput {
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub parent_goal_id: Option<Option<String>>,
    #[serde(default)]
    pub measure_id: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub progress_percent: Option<i64>,
    #[serde(default)]
    pub target_date: Option<Option<String>>,
    #[serde(default)]
    pub target_value: Option<Option<f64>>,
    #[serde(default)]
    pub target_type: Option<Option<String>>,
}
