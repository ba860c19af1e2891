use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::bucket::Bucket;
use crate::models::goal::Goal;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PacingStatus {
    Ahead,
    OnTrack,
    SlightlyBehind,
    Behind,
}

impl PacingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacingStatus::Ahead => "ahead",
            PacingStatus::OnTrack => "on_track",
            PacingStatus::SlightlyBehind => "slightly_behind",
            PacingStatus::Behind => "behind",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCapacity {
    pub allocated: f64,
    pub unallocated: f64,
    pub total_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRow {
    pub bucket_id: String,
    pub bucket_name: String,
    pub color: String,
    pub target_percent: f64,
    pub target_hours: f64,
    pub actual_hours: f64,
    pub actual_percent: f64,
    pub status: PacingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_logged_hours: f64,
    pub rows: Vec<AllocationRow>,
    pub capacity: WeeklyCapacity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketHours {
    pub bucket_id: String,
    pub bucket_name: String,
    pub color: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasureTrend {
    pub measure_id: String,
    pub question_text: String,
    pub is_binary: bool,
    pub average: f64,
    /// Percent of yes answers; 0 for scale measures.
    pub completion_rate: f64,
    pub yes_count: usize,
    pub check_in_count: usize,
    pub trend: TrendDirection,
    pub daily: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal: Goal,
    pub is_binary: bool,
    pub current_value: f64,
    pub target_value: Option<f64>,
    pub progress_percent: f64,
    pub log_count: usize,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekHours {
    pub week: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketTimeData {
    pub bucket: Bucket,
    pub total_hours: f64,
    pub target_percent: Option<f64>,
    pub actual_percent: f64,
    /// Positive when over target, in percentage points.
    pub difference: f64,
    pub weekly: Vec<WeekHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeAllocationSummary {
    pub days_back: u32,
    pub total_hours: f64,
    pub avg_per_day: f64,
    pub days_tracked: usize,
    pub buckets: Vec<BucketTimeData>,
    pub daily: Vec<DailyPoint>,
    /// Buckets whose share is more than ten points away from target.
    pub alerts: Vec<BucketTimeData>,
}
