use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::utils::dates::{add_days, add_months};

/// Named intervals a recurring task repeats on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceRule {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl RecurrenceRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceRule::Daily => "daily",
            RecurrenceRule::Weekly => "weekly",
            RecurrenceRule::Biweekly => "biweekly",
            RecurrenceRule::Monthly => "monthly",
            RecurrenceRule::Quarterly => "quarterly",
        }
    }

    /// Strict parse used for form input.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrenceRule::Daily),
            "weekly" => Ok(RecurrenceRule::Weekly),
            "biweekly" => Ok(RecurrenceRule::Biweekly),
            "monthly" => Ok(RecurrenceRule::Monthly),
            "quarterly" => Ok(RecurrenceRule::Quarterly),
            other => Err(AppError::validation(format!(
                "invalid recurrence rule: {other}"
            ))),
        }
    }

    /// Lenient parse for stored values; anything unknown repeats weekly.
    pub fn from_stored(value: &str) -> Self {
        Self::parse(value).unwrap_or(RecurrenceRule::Weekly)
    }

    pub fn next_due_date(&self, base: NaiveDate) -> NaiveDate {
        match self {
            RecurrenceRule::Daily => add_days(base, 1),
            RecurrenceRule::Weekly => add_days(base, 7),
            RecurrenceRule::Biweekly => add_days(base, 14),
            RecurrenceRule::Monthly => add_months(base, 1),
            RecurrenceRule::Quarterly => add_months(base, 3),
        }
    }
}

/// Due date of the successor of a completed task. Undated tasks advance from
/// `today`.
pub fn next_due_date(current_due: Option<NaiveDate>, rule: RecurrenceRule, today: NaiveDate) -> NaiveDate {
    rule.next_due_date(current_due.unwrap_or(today))
}
