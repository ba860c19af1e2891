use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::goal_repository::{GoalRepository, GoalRow};
use crate::db::repositories::measure_repository::MeasureRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::goal::{Goal, GoalCreateInput, GoalStatus, GoalTargetType, GoalUpdateInput};
use crate::models::task::Priority;
use crate::services::bucket_service::{fetch_bucket, normalize_optional_string};
use crate::services::settings_service::user_today;
use crate::utils::dates::parse_date;

pub const DEFAULT_UPCOMING_LIMIT: usize = 5;
const GOAL_IN_USE_MESSAGE: &str =
    "Cannot delete this goal because it has sub-goals or check-in history associated with it.";

#[derive(Clone)]
pub struct GoalService {
    db: DbPool,
}

impl GoalService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create(&self, user_id: &str, input: GoalCreateInput) -> AppResult<Goal> {
        let now = Utc::now().to_rfc3339();
        let id = uuid::Uuid::new_v4().to_string();

        let goal = self.db.with_connection(|conn| {
            fetch_bucket(conn, user_id, &input.bucket_id)?;

            let parent_goal_id = normalize_optional_string(input.parent_goal_id);
            if let Some(parent_id) = parent_goal_id.as_deref() {
                ensure_valid_parent(conn, user_id, &id, parent_id)?;
            }
            let measure_id = normalize_optional_string(input.measure_id);
            if let Some(measure_id) = measure_id.as_deref() {
                ensure_measure_exists(conn, user_id, measure_id)?;
            }

            let status = match input.status.as_deref() {
                Some(value) => GoalStatus::parse(value)?,
                None => GoalStatus::NotStarted,
            };
            let completed_date = completion_date(conn, user_id, status, None)?;

            let goal = Goal {
                id: id.clone(),
                user_id: user_id.to_string(),
                bucket_id: input.bucket_id.clone(),
                parent_goal_id,
                measure_id,
                title: normalize_title(&input.title)?,
                description: normalize_optional_string(input.description),
                status,
                priority: parse_priority(input.priority.as_deref())?,
                progress_percent: 0,
                target_date: normalize_date(input.target_date)?,
                completed_date,
                target_value: normalize_target_value(input.target_value)?,
                target_type: input
                    .target_type
                    .as_deref()
                    .map(GoalTargetType::parse)
                    .transpose()?,
                created_at: now.clone(),
                updated_at: now,
            };
            GoalRepository::insert(conn, &GoalRow::from_record(&goal))?;
            Ok(goal)
        })?;

        info!(target: "app::goals", goal_id = %goal.id, "goal created");
        Ok(goal)
    }

    pub fn update(&self, user_id: &str, id: &str, update: GoalUpdateInput) -> AppResult<Goal> {
        let goal = self.db.with_connection(|conn| {
            let mut goal = fetch_goal(conn, user_id, id)?;

            if let Some(bucket_id) = update.bucket_id {
                fetch_bucket(conn, user_id, &bucket_id)?;
                goal.bucket_id = bucket_id;
            }
            if let Some(title) = update.title {
                goal.title = normalize_title(&title)?;
            }
            if let Some(description) = update.description {
                goal.description = normalize_optional_string(description);
            }
            if let Some(parent) = update.parent_goal_id {
                let parent = normalize_optional_string(parent);
                if let Some(parent_id) = parent.as_deref() {
                    ensure_valid_parent(conn, user_id, id, parent_id)?;
                    if GoalRepository::count_children(conn, user_id, id)? > 0 {
                        return Err(AppError::validation("a goal with sub-goals cannot be nested"));
                    }
                }
                goal.parent_goal_id = parent;
            }
            if let Some(measure) = update.measure_id {
                let measure = normalize_optional_string(measure);
                if let Some(measure_id) = measure.as_deref() {
                    ensure_measure_exists(conn, user_id, measure_id)?;
                }
                goal.measure_id = measure;
            }
            if let Some(priority) = update.priority {
                goal.priority = parse_priority(Some(&priority))?;
            }
            if let Some(progress) = update.progress_percent {
                if !(0..=100).contains(&progress) {
                    return Err(AppError::validation("progress must be between 0 and 100"));
                }
                goal.progress_percent = progress;
            }
            if let Some(target_date) = update.target_date {
                goal.target_date = normalize_date(target_date)?;
            }
            if let Some(target_value) = update.target_value {
                goal.target_value = normalize_target_value(target_value)?;
            }
            if let Some(target_type) = update.target_type {
                goal.target_type = target_type
                    .as_deref()
                    .map(GoalTargetType::parse)
                    .transpose()?;
            }
            if let Some(status) = update.status {
                let status = GoalStatus::parse(&status)?;
                goal.completed_date = completion_date(conn, user_id, status, goal.completed_date)?;
                goal.status = status;
            }

            goal.updated_at = Utc::now().to_rfc3339();
            GoalRepository::update(conn, &GoalRow::from_record(&goal))?;
            Ok(goal)
        })?;

        info!(target: "app::goals", goal_id = %goal.id, status = goal.status.as_str(), "goal updated");
        Ok(goal)
    }

    pub fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| {
            GoalRepository::delete(conn, user_id, id)
                .map_err(|err| err.explain_foreign_key(GOAL_IN_USE_MESSAGE))
        })?;
        info!(target: "app::goals", goal_id = %id, "goal deleted");
        Ok(())
    }

    pub fn get(&self, user_id: &str, id: &str) -> AppResult<Goal> {
        let goal = self.db.with_connection(|conn| fetch_goal(conn, user_id, id))?;
        debug!(target: "app::goals", goal_id = %goal.id, "goal fetched");
        Ok(goal)
    }

    pub fn list(
        &self,
        user_id: &str,
        bucket_id: Option<&str>,
        status: Option<GoalStatus>,
    ) -> AppResult<Vec<Goal>> {
        let goals = self.list_all(user_id)?;
        let goals: Vec<Goal> = goals
            .into_iter()
            .filter(|goal| bucket_id.map_or(true, |bucket| goal.bucket_id == bucket))
            .filter(|goal| status.map_or(true, |status| goal.status == status))
            .collect();
        debug!(target: "app::goals", count = goals.len(), "goals listed");
        Ok(goals)
    }

    /// Goals still being worked on, nearest target date first. Undated goals
    /// follow the dated ones.
    pub fn upcoming(&self, user_id: &str, limit: usize) -> AppResult<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .list_all(user_id)?
            .into_iter()
            .filter(|goal| goal.status.is_open())
            .collect();

        goals.sort_by(|a, b| match (a.target_date, b.target_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.created_at.cmp(&b.created_at),
        });
        goals.truncate(limit);
        Ok(goals)
    }

    fn list_all(&self, user_id: &str) -> AppResult<Vec<Goal>> {
        let rows = self
            .db
            .with_connection(|conn| GoalRepository::list(conn, user_id))?;
        rows.into_iter().map(GoalRow::into_record).collect()
    }
}

pub(crate) fn fetch_goal(conn: &Connection, user_id: &str, id: &str) -> AppResult<Goal> {
    GoalRepository::find_by_id(conn, user_id, id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn ensure_valid_parent(conn: &Connection, user_id: &str, id: &str, parent_id: &str) -> AppResult<()> {
    if parent_id == id {
        return Err(AppError::validation("a goal cannot be its own parent"));
    }
    let parent = GoalRepository::find_by_id(conn, user_id, parent_id)?
        .ok_or_else(|| AppError::validation("parent goal does not exist"))?;
    if parent.parent_goal_id.is_some() {
        return Err(AppError::validation("parent goal must be a top-level goal"));
    }
    Ok(())
}

fn ensure_measure_exists(conn: &Connection, user_id: &str, measure_id: &str) -> AppResult<()> {
    MeasureRepository::find_by_id(conn, user_id, measure_id)?
        .map(|_| ())
        .ok_or_else(|| AppError::validation("linked measure does not exist"))
}

/// Completing stamps today's date once; leaving the complete state clears it.
fn completion_date(
    conn: &Connection,
    user_id: &str,
    status: GoalStatus,
    current: Option<NaiveDate>,
) -> AppResult<Option<NaiveDate>> {
    match status {
        GoalStatus::Complete => match current {
            Some(date) => Ok(Some(date)),
            None => Ok(Some(user_today(conn, user_id)?)),
        },
        _ => Ok(None),
    }
}

fn normalize_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("goal title is required"));
    }
    if trimmed.chars().count() > 200 {
        return Err(AppError::validation("goal title must be 200 characters or fewer"));
    }
    Ok(trimmed.to_string())
}

fn parse_priority(value: Option<&str>) -> AppResult<Priority> {
    value.map(Priority::parse).transpose().map(Option::unwrap_or_default)
}

fn normalize_date(value: Option<String>) -> AppResult<Option<NaiveDate>> {
    normalize_optional_string(value)
        .as_deref()
        .map(parse_date)
        .transpose()
}

fn normalize_target_value(value: Option<f64>) -> AppResult<Option<f64>> {
    match value {
        Some(target) if !target.is_finite() || target <= 0.0 => {
            Err(AppError::validation("target value must be greater than 0"))
        }
        other => Ok(other),
    }
}
