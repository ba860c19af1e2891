use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub bucket_id: String,
    pub task_id: Option<String>,
    pub entry_date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub entry_type: EntryType,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Manual,
    Timer,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Manual => "manual",
            EntryType::Timer => "timer",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "manual" => Ok(EntryType::Manual),
            "timer" => Ok(EntryType::Timer),
            other => Err(AppError::validation(format!("invalid entry type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryCreateInput {
    pub bucket_id: String,
    pub hours: f64,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryUpdateInput {
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
}
