use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A question answered once per day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub id: String,
    pub user_id: String,
    pub question_text: String,
    pub measure_type: MeasureType,
    pub baseline_score: Option<f64>,
    pub target_score: Option<f64>,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeasureType {
    /// 1 to 10.
    Scale,
    /// 0 = no, 1 = yes.
    Binary,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Scale => "scale",
            MeasureType::Binary => "binary",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "scale" => Ok(MeasureType::Scale),
            "binary" => Ok(MeasureType::Binary),
            other => Err(AppError::validation(format!("invalid measure type: {other}"))),
        }
    }

    pub fn score_range(&self) -> (f64, f64) {
        match self {
            MeasureType::Scale => (1.0, 10.0),
            MeasureType::Binary => (0.0, 1.0),
        }
    }

    pub fn validate_score(&self, score: f64) -> AppResult<()> {
        let (min, max) = self.score_range();
        if !score.is_finite() || score < min || score > max {
            return Err(AppError::validation(format!(
                "score must be between {min} and {max}"
            )));
        }
        if matches!(self, MeasureType::Binary) && score.fract() != 0.0 {
            return Err(AppError::validation("binary answers must be 0 or 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub id: String,
    pub user_id: String,
    pub measure_id: String,
    pub check_in_date: NaiveDate,
    pub score: f64,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasureCreateInput {
    pub question_text: String,
    #[serde(default)]
    pub measure_type: Option<String>,
    #[serde(default)]
    pub baseline_score: Option<f64>,
    #[serde(default)]
    pub target_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasureUpdateInput {
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub measure_type: Option<String>,
    #[serde(default)]
    pub baseline_score: Option<Option<f64>>,
    #[serde(default)]
    pub target_score: Option<Option<f64>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

/// One answer inside a daily check-in submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInAnswer {
    pub measure_id: String,
    pub score: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSummary {
    pub streak: u32,
    pub average_last_30_days: f64,
    pub has_checked_in_today: bool,
    pub responses_last_30_days: usize,
}
