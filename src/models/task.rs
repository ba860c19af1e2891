use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub bucket_id: String,
    /// Joined from `buckets`; not stored on the task row.
    pub bucket_name: Option<String>,
    pub goal_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub snoozed_until: Option<NaiveDate>,
    pub expected_hours: Option<f64>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub is_delegated: bool,
    pub delegated_to: Option<String>,
    pub progress_notes: Option<String>,
    pub completion_note: Option<String>,
    pub completed_at: Option<String>,
    pub activity_log: Vec<ActivityEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.map(|due| due < today).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub at: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Snoozed,
    Complete,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Snoozed => "snoozed",
            TaskStatus::Complete => "complete",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "snoozed" => Ok(TaskStatus::Snoozed),
            "complete" => Ok(TaskStatus::Complete),
            other => Err(AppError::validation(format!("invalid task status: {other}"))),
        }
    }

    /// open → complete | snoozed, snoozed → open | complete, complete → open.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Open, TaskStatus::Complete)
                | (TaskStatus::Open, TaskStatus::Snoozed)
                | (TaskStatus::Snoozed, TaskStatus::Open)
                | (TaskStatus::Snoozed, TaskStatus::Complete)
                | (TaskStatus::Snoozed, TaskStatus::Snoozed)
                | (TaskStatus::Complete, TaskStatus::Open)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(AppError::validation(format!("invalid priority: {other}"))),
        }
    }

    /// Sort weight: high first.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
    pub bucket_id: String,
    pub title: String,
    #[serde(default)]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub expected_hours: Option<f64>,
    #[serde(default)]
    pub is_recurring: Option<bool>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub is_delegated: Option<bool>,
    #[serde(default)]
    pub delegated_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateInput {
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub goal_id: Option<Option<String>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<Option<String>>,
    #[serde(default)]
    pub expected_hours: Option<Option<f64>>,
    #[serde(default)]
    pub is_recurring: Option<bool>,
    #[serde(default)]
    pub recurrence_rule: Option<Option<String>>,
    #[serde(default)]
    pub is_delegated: Option<bool>,
    #[serde(default)]
    pub delegated_to: Option<Option<String>>,
    #[serde(default)]
    pub progress_notes: Option<Option<String>>,
}
