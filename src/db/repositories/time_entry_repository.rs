use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::time_entry::{EntryType, TimeEntry};
use crate::utils::dates::{format_date, parse_date};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        bucket_id,
        task_id,
        entry_date,
        hours,
        description,
        entry_type,
        created_at,
        updated_at
    FROM time_entries
"#;

#[derive(Debug, Clone)]
pub struct TimeEntryRow {
    pub id: String,
    pub user_id: String,
    pub bucket_id: String,
    pub task_id: Option<String>,
    pub entry_date: String,
    pub hours: f64,
    pub description: Option<String>,
    pub entry_type: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TimeEntryRow {
    pub fn from_record(entry: &TimeEntry) -> Self {
        Self {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            bucket_id: entry.bucket_id.clone(),
            task_id: entry.task_id.clone(),
            entry_date: format_date(entry.entry_date),
            hours: entry.hours,
            description: entry.description.clone(),
            entry_type: entry.entry_type.as_str().to_string(),
            created_at: entry.created_at.clone(),
            updated_at: entry.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<TimeEntry> {
        Ok(TimeEntry {
            id: self.id,
            user_id: self.user_id,
            bucket_id: self.bucket_id,
            task_id: self.task_id,
            entry_date: parse_date(&self.entry_date)?,
            hours: self.hours,
            description: self.description,
            entry_type: EntryType::parse(&self.entry_type)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for TimeEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TimeEntryRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            bucket_id: row.get("bucket_id")?,
            task_id: row.get("task_id")?,
            entry_date: row.get("entry_date")?,
            hours: row.get("hours")?,
            description: row.get("description")?,
            entry_type: row.get("entry_type")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TimeEntryRepository;

impl TimeEntryRepository {
    pub fn insert(conn: &Connection, row: &TimeEntryRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO time_entries (
                    id, user_id, bucket_id, task_id, entry_date, hours, description,
                    entry_type, created_at, updated_at
                ) VALUES (
                    :id, :user_id, :bucket_id, :task_id, :entry_date, :hours, :description,
                    :entry_type, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":task_id": &row.task_id,
                ":entry_date": &row.entry_date,
                ":hours": row.hours,
                ":description": &row.description,
                ":entry_type": &row.entry_type,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &TimeEntryRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE time_entries SET
                    bucket_id = :bucket_id,
                    entry_date = :entry_date,
                    hours = :hours,
                    description = :description,
                    updated_at = :updated_at
                WHERE id = :id AND user_id = :user_id
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":entry_date": &row.entry_date,
                ":hours": row.hours,
                ":description": &row.description,
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
            "DELETE FROM time_entries WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<TimeEntryRow>> {
        let mut stmt = conn.prepare(&format!("{BASE_SELECT} WHERE id = ?1 AND user_id = ?2"))?;
        let row = stmt
            .query_row([id, user_id], |row| TimeEntryRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// Entries dated within `[from, to]`, newest first.
    pub fn list_between(conn: &Connection, user_id: &str, from: &str, to: &str) -> AppResult<Vec<TimeEntryRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 AND entry_date >= ?2 AND entry_date <= ?3 \
             ORDER BY entry_date DESC, created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id, from, to], |row| TimeEntryRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
