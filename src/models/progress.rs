use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::check_in::CheckInResponse;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLogEntry {
    pub id: String,
    pub user_id: String,
    pub bucket_id: Option<String>,
    pub goal_id: Option<String>,
    pub entry_date: NaiveDate,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLogCreateInput {
    pub content: String,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLogUpdateInput {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<Option<String>>,
    #[serde(default)]
    pub goal_id: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimelineFilter {
    #[default]
    All,
    Progress,
    CheckIn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TimelineItem {
    Progress(ProgressLogEntry),
    CheckIn(CheckInResponse),
}

impl TimelineItem {
    pub fn date(&self) -> NaiveDate {
        match self {
            TimelineItem::Progress(entry) => entry.entry_date,
            TimelineItem::CheckIn(response) => response.check_in_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub items: Vec<TimelineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub days: Vec<TimelineDay>,
    pub tags: Vec<String>,
}
