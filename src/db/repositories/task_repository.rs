use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::task::{ActivityEntry, Priority, TaskRecord, TaskStatus};
use crate::services::recurrence::RecurrenceRule;
use crate::utils::dates::{format_date, parse_date};

const BASE_SELECT: &str = r#"
    SELECT
        t.id,
        t.user_id,
        t.bucket_id,
        b.name AS bucket_name,
        t.goal_id,
        t.title,
        t.description,
        t.status,
        t.priority,
        t.due_date,
        t.snoozed_until,
        t.expected_hours,
        t.is_recurring,
        t.recurrence_rule,
        t.is_delegated,
        t.delegated_to,
        t.progress_notes,
        t.completion_note,
        t.completed_at,
        t.activity_log,
        t.created_at,
        t.updated_at
    FROM tasks t
    LEFT JOIN buckets b ON b.id = t.bucket_id
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub bucket_id: String,
    pub bucket_name: Option<String>,
    pub goal_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub snoozed_until: Option<String>,
    pub expected_hours: Option<f64>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    pub is_delegated: bool,
    pub delegated_to: Option<String>,
    pub progress_notes: Option<String>,
    pub completion_note: Option<String>,
    pub completed_at: Option<String>,
    pub activity_log: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            bucket_id: record.bucket_id.clone(),
            bucket_name: record.bucket_name.clone(),
            goal_id: record.goal_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            status: record.status.as_str().to_string(),
            priority: record.priority.as_str().to_string(),
            due_date: record.due_date.map(format_date),
            snoozed_until: record.snoozed_until.map(format_date),
            expected_hours: record.expected_hours,
            is_recurring: record.is_recurring,
            recurrence_rule: record.recurrence_rule.map(|rule| rule.as_str().to_string()),
            is_delegated: record.is_delegated,
            delegated_to: record.delegated_to.clone(),
            progress_notes: record.progress_notes.clone(),
            completion_note: record.completion_note.clone(),
            completed_at: record.completed_at.clone(),
            activity_log: serialize_activity(&record.activity_log)?,
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<TaskRecord> {
        Ok(TaskRecord {
            id: self.id,
            user_id: self.user_id,
            bucket_id: self.bucket_id,
            bucket_name: self.bucket_name,
            goal_id: self.goal_id,
            title: self.title,
            description: self.description,
            status: TaskStatus::parse(&self.status)?,
            priority: Priority::parse(&self.priority)?,
            due_date: self.due_date.as_deref().map(parse_date).transpose()?,
            snoozed_until: self.snoozed_until.as_deref().map(parse_date).transpose()?,
            expected_hours: self.expected_hours,
            is_recurring: self.is_recurring,
            recurrence_rule: self
                .recurrence_rule
                .as_deref()
                .map(RecurrenceRule::from_stored),
            is_delegated: self.is_delegated,
            delegated_to: self.delegated_to,
            progress_notes: self.progress_notes,
            completion_note: self.completion_note,
            completed_at: self.completed_at,
            activity_log: deserialize_activity(self.activity_log)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TaskRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            bucket_id: row.get("bucket_id")?,
            bucket_name: row.get("bucket_name")?,
            goal_id: row.get("goal_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            due_date: row.get("due_date")?,
            snoozed_until: row.get("snoozed_until")?,
            expected_hours: row.get("expected_hours")?,
            is_recurring: row.get::<_, i64>("is_recurring")? != 0,
            recurrence_rule: row.get("recurrence_rule")?,
            is_delegated: row.get::<_, i64>("is_delegated")? != 0,
            delegated_to: row.get("delegated_to")?,
            progress_notes: row.get("progress_notes")?,
            completion_note: row.get("completion_note")?,
            completed_at: row.get("completed_at")?,
            activity_log: row.get("activity_log")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO tasks (
                    id,
                    user_id,
                    bucket_id,
                    goal_id,
                    title,
                    description,
                    status,
                    priority,
                    due_date,
                    snoozed_until,
                    expected_hours,
                    is_recurring,
                    recurrence_rule,
                    is_delegated,
                    delegated_to,
                    progress_notes,
                    completion_note,
                    completed_at,
                    activity_log,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :user_id,
                    :bucket_id,
                    :goal_id,
                    :title,
                    :description,
                    :status,
                    :priority,
                    :due_date,
                    :snoozed_until,
                    :expected_hours,
                    :is_recurring,
                    :recurrence_rule,
                    :is_delegated,
                    :delegated_to,
                    :progress_notes,
                    :completion_note,
                    :completed_at,
                    :activity_log,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":goal_id": &row.goal_id,
                ":title": &row.title,
                ":description": &row.description,
                ":status": &row.status,
                ":priority": &row.priority,
                ":due_date": &row.due_date,
                ":snoozed_until": &row.snoozed_until,
                ":expected_hours": &row.expected_hours,
                ":is_recurring": row.is_recurring as i64,
                ":recurrence_rule": &row.recurrence_rule,
                ":is_delegated": row.is_delegated as i64,
                ":delegated_to": &row.delegated_to,
                ":progress_notes": &row.progress_notes,
                ":completion_note": &row.completion_note,
                ":completed_at": &row.completed_at,
                ":activity_log": &row.activity_log,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &TaskRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE tasks SET
                    bucket_id = :bucket_id,
                    goal_id = :goal_id,
                    title = :title,
                    description = :description,
                    status = :status,
                    priority = :priority,
                    due_date = :due_date,
                    snoozed_until = :snoozed_until,
                    expected_hours = :expected_hours,
                    is_recurring = :is_recurring,
                    recurrence_rule = :recurrence_rule,
                    is_delegated = :is_delegated,
                    delegated_to = :delegated_to,
                    progress_notes = :progress_notes,
                    completion_note = :completion_note,
                    completed_at = :completed_at,
                    activity_log = :activity_log,
                    updated_at = :updated_at
                WHERE id = :id AND user_id = :user_id
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":goal_id": &row.goal_id,
                ":title": &row.title,
                ":description": &row.description,
                ":status": &row.status,
                ":priority": &row.priority,
                ":due_date": &row.due_date,
                ":snoozed_until": &row.snoozed_until,
                ":expected_hours": &row.expected_hours,
                ":is_recurring": row.is_recurring as i64,
                ":recurrence_rule": &row.recurrence_rule,
                ":is_delegated": row.is_delegated as i64,
                ":delegated_to": &row.delegated_to,
                ":progress_notes": &row.progress_notes,
                ":completion_note": &row.completion_note,
                ":completed_at": &row.completed_at,
                ":activity_log": &row.activity_log,
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
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE t.id = ?1 AND t.user_id = ?2"
        ))?;
        let row = stmt
            .query_row([id, user_id], |row| TaskRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_all(conn: &Connection, user_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE t.user_id = ?1 ORDER BY t.created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_bucket(conn: &Connection, user_id: &str, bucket_id: &str) -> AppResult<Vec<TaskRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE t.user_id = ?1 AND t.bucket_id = ?2 ORDER BY t.created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id, bucket_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn serialize_activity(entries: &[ActivityEntry]) -> AppResult<Option<String>> {
    if entries.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(entries)?))
    }
}

fn deserialize_activity(raw: Option<String>) -> AppResult<Vec<ActivityEntry>> {
    match raw {
        Some(value) if !value.is_empty() => Ok(serde_json::from_str(&value)?),
        _ => Ok(Vec::new()),
    }
}
