use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::goal::{Goal, GoalCheckInLog, GoalStatus, GoalTargetType};
use crate::models::task::Priority;
use crate::utils::dates::{format_date, parse_date};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        bucket_id,
        parent_goal_id,
        measure_id,
        title,
        description,
        status,
        priority,
        progress_percent,
        target_date,
        completed_date,
        target_value,
        target_type,
        created_at,
        updated_at
    FROM goals
"#;

#[derive(Debug, Clone)]
pub struct GoalRow {
    pub id: String,
    pub user_id: String,
    pub bucket_id: String,
    pub parent_goal_id: Option<String>,
    pub measure_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub progress_percent: i64,
    pub target_date: Option<String>,
    pub completed_date: Option<String>,
    pub target_value: Option<f64>,
    pub target_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GoalRow {
    pub fn from_record(goal: &Goal) -> Self {
        Self {
            id: goal.id.clone(),
            user_id: goal.user_id.clone(),
            bucket_id: goal.bucket_id.clone(),
            parent_goal_id: goal.parent_goal_id.clone(),
            measure_id: goal.measure_id.clone(),
            title: goal.title.clone(),
            description: goal.description.clone(),
            status: goal.status.as_str().to_string(),
            priority: goal.priority.as_str().to_string(),
            progress_percent: goal.progress_percent,
            target_date: goal.target_date.map(format_date),
            completed_date: goal.completed_date.map(format_date),
            target_value: goal.target_value,
            target_type: goal.target_type.map(|kind| kind.as_str().to_string()),
            created_at: goal.created_at.clone(),
            updated_at: goal.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<Goal> {
        Ok(Goal {
            id: self.id,
            user_id: self.user_id,
            bucket_id: self.bucket_id,
            parent_goal_id: self.parent_goal_id,
            measure_id: self.measure_id,
            title: self.title,
            description: self.description,
            status: GoalStatus::parse(&self.status)?,
            priority: Priority::parse(&self.priority)?,
            progress_percent: self.progress_percent,
            target_date: self.target_date.as_deref().map(parse_date).transpose()?,
            completed_date: self.completed_date.as_deref().map(parse_date).transpose()?,
            target_value: self.target_value,
            target_type: self
                .target_type
                .as_deref()
                .map(GoalTargetType::parse)
                .transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for GoalRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(GoalRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            bucket_id: row.get("bucket_id")?,
            parent_goal_id: row.get("parent_goal_id")?,
            measure_id: row.get("measure_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            progress_percent: row.get("progress_percent")?,
            target_date: row.get("target_date")?,
            completed_date: row.get("completed_date")?,
            target_value: row.get("target_value")?,
            target_type: row.get("target_type")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GoalCheckInLogRow {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    pub response_id: String,
    pub log_date: String,
    pub value: f64,
    pub created_at: String,
}

impl GoalCheckInLogRow {
    pub fn into_record(self) -> AppResult<GoalCheckInLog> {
        Ok(GoalCheckInLog {
            id: self.id,
            user_id: self.user_id,
            goal_id: self.goal_id,
            response_id: self.response_id,
            log_date: parse_date(&self.log_date)?,
            value: self.value,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for GoalCheckInLogRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(GoalCheckInLogRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            goal_id: row.get("goal_id")?,
            response_id: row.get("response_id")?,
            log_date: row.get("log_date")?,
            value: row.get("value")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct GoalRepository;

impl GoalRepository {
    pub fn insert(conn: &Connection, row: &GoalRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO goals (
                    id, user_id, bucket_id, parent_goal_id, measure_id, title, description,
                    status, priority, progress_percent, target_date, completed_date,
                    target_value, target_type, created_at, updated_at
                ) VALUES (
                    :id, :user_id, :bucket_id, :parent_goal_id, :measure_id, :title, :description,
                    :status, :priority, :progress_percent, :target_date, :completed_date,
                    :target_value, :target_type, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":parent_goal_id": &row.parent_goal_id,
                ":measure_id": &row.measure_id,
                ":title": &row.title,
                ":description": &row.description,
                ":status": &row.status,
                ":priority": &row.priority,
                ":progress_percent": row.progress_percent,
                ":target_date": &row.target_date,
                ":completed_date": &row.completed_date,
                ":target_value": &row.target_value,
                ":target_type": &row.target_type,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &GoalRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE goals SET
                    bucket_id = :bucket_id,
                    parent_goal_id = :parent_goal_id,
                    measure_id = :measure_id,
                    title = :title,
                    description = :description,
                    status = :status,
                    priority = :priority,
                    progress_percent = :progress_percent,
                    target_date = :target_date,
                    completed_date = :completed_date,
                    target_value = :target_value,
                    target_type = :target_type,
                    updated_at = :updated_at
                WHERE id = :id AND user_id = :user_id
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":parent_goal_id": &row.parent_goal_id,
                ":measure_id": &row.measure_id,
                ":title": &row.title,
                ":description": &row.description,
                ":status": &row.status,
                ":priority": &row.priority,
                ":progress_percent": row.progress_percent,
                ":target_date": &row.target_date,
                ":completed_date": &row.completed_date,
                ":target_value": &row.target_value,
                ":target_type": &row.target_type,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, user_id: &str, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM goals WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<GoalRow>> {
        let mut stmt = conn.prepare(&format!("{BASE_SELECT} WHERE id = ?1 AND user_id = ?2"))?;
        let row = stmt
            .query_row([id, user_id], |row| GoalRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list(conn: &Connection, user_id: &str) -> AppResult<Vec<GoalRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id], |row| GoalRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_measure(conn: &Connection, user_id: &str, measure_id: &str) -> AppResult<Vec<GoalRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 AND measure_id = ?2"
        ))?;
        let rows = stmt
            .query_map([user_id, measure_id], |row| GoalRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_children(conn: &Connection, user_id: &str, id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM goals WHERE user_id = ?1 AND parent_goal_id = ?2",
            [user_id, id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// One log per goal and day; a newer answer replaces the value.
    pub fn upsert_check_in_log(conn: &Connection, log: &GoalCheckInLog) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO goal_check_in_logs (id, user_id, goal_id, response_id, log_date, value, created_at)
                VALUES (:id, :user_id, :goal_id, :response_id, :log_date, :value, :created_at)
                ON CONFLICT(goal_id, log_date) DO UPDATE SET
                    response_id = excluded.response_id,
                    value = excluded.value
            "#,
            named_params! {
                ":id": &log.id,
                ":user_id": &log.user_id,
                ":goal_id": &log.goal_id,
                ":response_id": &log.response_id,
                ":log_date": format_date(log.log_date),
                ":value": log.value,
                ":created_at": &log.created_at,
            },
        )?;
        Ok(())
    }

    pub fn list_check_in_logs_since(
        conn: &Connection,
        user_id: &str,
        since: &str,
    ) -> AppResult<Vec<GoalCheckInLogRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, goal_id, response_id, log_date, value, created_at
                FROM goal_check_in_logs
                WHERE user_id = ?1 AND log_date >= ?2
                ORDER BY log_date ASC
            "#,
        )?;
        let rows = stmt
            .query_map([user_id, since], |row| GoalCheckInLogRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
