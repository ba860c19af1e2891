use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::db::repositories::check_in_repository::{CheckInRepository, CheckInRow};
use crate::db::repositories::goal_repository::GoalRepository;
use crate::db::repositories::measure_repository::{MeasureRepository, MeasureRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::check_in::{CheckInAnswer, CheckInResponse, CheckInSummary, MeasureType};
use crate::models::goal::GoalCheckInLog;
use crate::services::bucket_service::normalize_optional_string;
use crate::services::measure_service::fetch_measure;
use crate::services::metrics::average;
use crate::services::settings_service::user_today;
use crate::services::streak::streak_from_days;
use crate::utils::dates::{format_date, parse_date, window_start};

pub const SUMMARY_WINDOW_DAYS: u32 = 30;
const MAX_HISTORY_DAYS: u32 = 366;

#[derive(Clone)]
pub struct CheckInService {
    db: DbPool,
}

impl CheckInService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Saves one answer per measure for `date` (today when absent). Answers are
    /// written in order; the first failure stops the rest and is returned,
    /// leaving earlier answers saved.
    pub fn submit(
        &self,
        user_id: &str,
        date: Option<&str>,
        answers: Vec<CheckInAnswer>,
    ) -> AppResult<Vec<CheckInResponse>> {
        if answers.is_empty() {
            return Err(AppError::validation("a check-in needs at least one answer"));
        }

        let saved = self.db.with_connection(|conn| {
            let today = user_today(conn, user_id)?;
            let date = match date.map(str::trim).filter(|value| !value.is_empty()) {
                Some(value) => parse_date(value)?,
                None => today,
            };
            if date > today {
                return Err(AppError::validation_with_details(
                    "check-ins cannot be dated in the future",
                    json!({ "date": format_date(date), "today": format_date(today) }),
                ));
            }

            let mut saved = Vec::with_capacity(answers.len());
            for answer in answers {
                let response = save_answer(conn, user_id, date, answer).map_err(|err| {
                    warn!(
                        target: "app::checkins",
                        saved = saved.len(),
                        error = %err,
                        "check-in submission stopped"
                    );
                    err
                })?;
                saved.push(response);
            }
            Ok(saved)
        })?;

        info!(target: "app::checkins", answers = saved.len(), "check-in submitted");
        Ok(saved)
    }

    pub fn delete_response(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| CheckInRepository::delete(conn, user_id, id))?;
        info!(target: "app::checkins", response_id = %id, "check-in response deleted");
        Ok(())
    }

    /// Responses from the last `days` days including today, newest first.
    pub fn history(&self, user_id: &str, days: u32) -> AppResult<Vec<CheckInResponse>> {
        let days = days.clamp(1, MAX_HISTORY_DAYS);
        self.db.with_connection(|conn| {
            let today = user_today(conn, user_id)?;
            load_window(conn, user_id, today, days)
        })
    }

    pub fn responses_for(&self, user_id: &str, date: NaiveDate) -> AppResult<Vec<CheckInResponse>> {
        let day = format_date(date);
        let rows = self
            .db
            .with_connection(|conn| CheckInRepository::list_between(conn, user_id, &day, &day))?;
        rows.into_iter().map(CheckInRow::into_record).collect()
    }

    pub fn streak(&self, user_id: &str) -> AppResult<u32> {
        self.db.with_connection(|conn| {
            let today = user_today(conn, user_id)?;
            Ok(streak_from_days(&checked_in_days(conn, user_id)?, today))
        })
    }

    pub fn has_checked_in_today(&self, user_id: &str) -> AppResult<bool> {
        self.db.with_connection(|conn| {
            let today = user_today(conn, user_id)?;
            Ok(checked_in_days(conn, user_id)?.contains(&today))
        })
    }

    pub fn summary(&self, user_id: &str) -> AppResult<CheckInSummary> {
        self.db.with_connection(|conn| {
            let today = user_today(conn, user_id)?;
            summarize(conn, user_id, today)
        })
    }

    pub fn summary_at(&self, user_id: &str, today: NaiveDate) -> AppResult<CheckInSummary> {
        self.db
            .with_connection(|conn| summarize(conn, user_id, today))
    }
}

fn save_answer(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
    answer: CheckInAnswer,
) -> AppResult<CheckInResponse> {
    let measure = fetch_measure(conn, user_id, &answer.measure_id)
        .map_err(|err| match err {
            AppError::NotFound => AppError::validation("check-in references an unknown measure"),
            other => other,
        })?;
    measure.measure_type.validate_score(answer.score)?;

    let day = format_date(date);
    let row = CheckInRow {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        measure_id: measure.id.clone(),
        check_in_date: day.clone(),
        score: answer.score,
        notes: normalize_optional_string(answer.notes),
        created_at: Utc::now().to_rfc3339(),
    };
    CheckInRepository::upsert(conn, &row)?;

    let response = CheckInRepository::find_for_day(conn, user_id, &measure.id, &day)?
        .ok_or_else(AppError::not_found)?
        .into_record()?;

    for goal in GoalRepository::list_by_measure(conn, user_id, &measure.id)? {
        let log = GoalCheckInLog {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            goal_id: goal.id,
            response_id: response.id.clone(),
            log_date: date,
            value: response.score,
            created_at: Utc::now().to_rfc3339(),
        };
        GoalRepository::upsert_check_in_log(conn, &log)?;
    }

    debug!(
        target: "app::checkins",
        measure_id = %response.measure_id,
        date = %day,
        "check-in answer saved"
    );
    Ok(response)
}

fn load_window(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
    days: u32,
) -> AppResult<Vec<CheckInResponse>> {
    let from = format_date(window_start(today, days));
    let to = format_date(today);
    CheckInRepository::list_between(conn, user_id, &from, &to)?
        .into_iter()
        .map(CheckInRow::into_record)
        .collect()
}

fn checked_in_days(conn: &Connection, user_id: &str) -> AppResult<BTreeSet<NaiveDate>> {
    let mut days = BTreeSet::new();
    for value in CheckInRepository::distinct_dates(conn, user_id)? {
        match parse_date(&value) {
            Ok(day) => {
                days.insert(day);
            }
            Err(_) => warn!(target: "app::checkins", value = %value, "skipping malformed check-in date"),
        }
    }
    Ok(days)
}

/// The 30-day average covers scale answers only.
fn summarize(conn: &Connection, user_id: &str, today: NaiveDate) -> AppResult<CheckInSummary> {
    let responses = load_window(conn, user_id, today, SUMMARY_WINDOW_DAYS)?;
    let scale_ids: HashSet<String> = MeasureRepository::list(conn, user_id, false)?
        .into_iter()
        .map(MeasureRow::into_record)
        .collect::<AppResult<Vec<_>>>()?
        .into_iter()
        .filter(|measure| measure.measure_type == MeasureType::Scale)
        .map(|measure| measure.id)
        .collect();

    let days = checked_in_days(conn, user_id)?;
    Ok(CheckInSummary {
        streak: streak_from_days(&days, today),
        average_last_30_days: average(
            responses
                .iter()
                .filter(|response| scale_ids.contains(&response.measure_id))
                .map(|response| response.score),
        ),
        has_checked_in_today: days.contains(&today),
        responses_last_30_days: responses.len(),
    })
}
