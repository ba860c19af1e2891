use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::debug;

use crate::db::repositories::bucket_repository::BucketRepository;
use crate::db::repositories::check_in_repository::{CheckInRepository, CheckInRow};
use crate::db::repositories::goal_repository::{GoalCheckInLogRow, GoalRepository, GoalRow};
use crate::db::repositories::measure_repository::{MeasureRepository, MeasureRow};
use crate::db::repositories::time_target_repository::TimeTargetRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::analytics::{GoalProgress, MeasureTrend, TimeAllocationSummary};
use crate::models::check_in::{Measure, MeasureType};
use crate::models::goal::GoalStatus;
use crate::services::settings_service::user_today;
use crate::services::time_service::load_entries;
use crate::services::trends;
use crate::utils::dates::{format_date, window_start, TREND_WINDOWS};

/// Read-only views over stored check-ins, goal logs and time entries.
#[derive(Clone)]
pub struct TrendsService {
    db: DbPool,
}

impl TrendsService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn check_in_trends(&self, user_id: &str, days: u32) -> AppResult<Vec<MeasureTrend>> {
        let today = self.today(user_id)?;
        self.check_in_trends_at(user_id, days, today)
    }

    pub fn check_in_trends_at(
        &self,
        user_id: &str,
        days: u32,
        today: NaiveDate,
    ) -> AppResult<Vec<MeasureTrend>> {
        let days = validate_window(days)?;
        let (measures, responses) = self.db.with_connection(|conn| {
            let measures = load_measures(conn, user_id, true)?;
            let from = format_date(window_start(today, days));
            let responses = CheckInRepository::list_between(conn, user_id, &from, &format_date(today))?
                .into_iter()
                .map(CheckInRow::into_record)
                .collect::<AppResult<Vec<_>>>()?;
            Ok((measures, responses))
        })?;

        let trends: Vec<MeasureTrend> = measures
            .iter()
            .map(|measure| trends::measure_trend(measure, &responses, today, days))
            .collect();
        debug!(target: "app::trends", measures = trends.len(), days, "check-in trends computed");
        Ok(trends)
    }

    /// Progress for every active goal linked to a measure.
    pub fn goal_progress(&self, user_id: &str, days: u32) -> AppResult<Vec<GoalProgress>> {
        let today = self.today(user_id)?;
        self.goal_progress_at(user_id, days, today)
    }

    pub fn goal_progress_at(
        &self,
        user_id: &str,
        days: u32,
        today: NaiveDate,
    ) -> AppResult<Vec<GoalProgress>> {
        let days = validate_window(days)?;
        let (goals, logs, kinds) = self.db.with_connection(|conn| {
            let goals = GoalRepository::list(conn, user_id)?
                .into_iter()
                .map(GoalRow::into_record)
                .collect::<AppResult<Vec<_>>>()?;
            let since = format_date(window_start(today, days));
            let logs = GoalRepository::list_check_in_logs_since(conn, user_id, &since)?
                .into_iter()
                .map(GoalCheckInLogRow::into_record)
                .collect::<AppResult<Vec<_>>>()?;
            let kinds: HashMap<String, MeasureType> = load_measures(conn, user_id, false)?
                .into_iter()
                .map(|measure| (measure.id, measure.measure_type))
                .collect();
            Ok((goals, logs, kinds))
        })?;

        let progress: Vec<GoalProgress> = goals
            .iter()
            .filter(|goal| goal.status != GoalStatus::Archived)
            .filter_map(|goal| {
                let kind = goal.measure_id.as_ref().and_then(|id| kinds.get(id))?;
                Some(trends::goal_progress(
                    goal,
                    &logs,
                    *kind == MeasureType::Binary,
                ))
            })
            .collect();
        debug!(target: "app::trends", goals = progress.len(), days, "goal progress computed");
        Ok(progress)
    }

    pub fn time_allocation(&self, user_id: &str, days: u32) -> AppResult<TimeAllocationSummary> {
        let today = self.today(user_id)?;
        self.time_allocation_at(user_id, days, today)
    }

    pub fn time_allocation_at(
        &self,
        user_id: &str,
        days: u32,
        today: NaiveDate,
    ) -> AppResult<TimeAllocationSummary> {
        let days = validate_window(days)?;
        let summary = self.db.with_connection(|conn| {
            let buckets = BucketRepository::list(conn, user_id, true)?;
            let targets = TimeTargetRepository::list(conn, user_id)?;
            let entries = load_entries(conn, user_id, window_start(today, days), today)?;
            Ok(trends::time_allocation_summary(
                &buckets, &targets, &entries, today, days,
            ))
        })?;
        debug!(
            target: "app::trends",
            total_hours = summary.total_hours,
            alerts = summary.alerts.len(),
            "time allocation summarized"
        );
        Ok(summary)
    }

    fn today(&self, user_id: &str) -> AppResult<NaiveDate> {
        self.db.with_connection(|conn| user_today(conn, user_id))
    }
}

fn validate_window(days: u32) -> AppResult<u32> {
    if TREND_WINDOWS.contains(&days) {
        Ok(days)
    } else {
        Err(AppError::validation_with_details(
            "unsupported trend window",
            serde_json::json!({ "allowed": TREND_WINDOWS, "requested": days }),
        ))
    }
}

fn load_measures(conn: &Connection, user_id: &str, active_only: bool) -> AppResult<Vec<Measure>> {
    MeasureRepository::list(conn, user_id, active_only)?
        .into_iter()
        .map(MeasureRow::into_record)
        .collect()
}
