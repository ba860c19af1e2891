use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::progress::ProgressLogEntry;
use crate::utils::dates::{format_date, parse_date};

const BASE_SELECT: &str = r#"
    SELECT id, user_id, bucket_id, goal_id, content, tags, entry_date, created_at, updated_at
    FROM progress_logs
"#;

#[derive(Debug, Clone)]
pub struct ProgressLogRow {
    pub id: String,
    pub user_id: String,
    pub bucket_id: Option<String>,
    pub goal_id: Option<String>,
    pub content: String,
    pub tags: Option<String>,
    pub entry_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ProgressLogRow {
    pub fn from_record(entry: &ProgressLogEntry) -> AppResult<Self> {
        Ok(Self {
            id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            bucket_id: entry.bucket_id.clone(),
            goal_id: entry.goal_id.clone(),
            content: entry.content.clone(),
            tags: serialize_tags(&entry.tags)?,
            entry_date: format_date(entry.entry_date),
            created_at: entry.created_at.clone(),
            updated_at: entry.updated_at.clone(),
        })
    }

    pub fn into_record(self) -> AppResult<ProgressLogEntry> {
        Ok(ProgressLogEntry {
            id: self.id,
            user_id: self.user_id,
            bucket_id: self.bucket_id,
            goal_id: self.goal_id,
            entry_date: parse_date(&self.entry_date)?,
            content: self.content,
            tags: deserialize_tags(self.tags)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for ProgressLogRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(ProgressLogRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            bucket_id: row.get("bucket_id")?,
            goal_id: row.get("goal_id")?,
            content: row.get("content")?,
            tags: row.get("tags")?,
            entry_date: row.get("entry_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct ProgressRepository;

impl ProgressRepository {
    pub fn insert(conn: &Connection, row: &ProgressLogRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO progress_logs (
                    id, user_id, bucket_id, goal_id, content, tags, entry_date, created_at, updated_at
                ) VALUES (
                    :id, :user_id, :bucket_id, :goal_id, :content, :tags, :entry_date, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":goal_id": &row.goal_id,
                ":content": &row.content,
                ":tags": &row.tags,
                ":entry_date": &row.entry_date,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &ProgressLogRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE progress_logs SET
                    bucket_id = :bucket_id,
                    goal_id = :goal_id,
                    content = :content,
                    tags = :tags,
                    entry_date = :entry_date,
                    updated_at = :updated_at
                WHERE id = :id AND user_id = :user_id
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":bucket_id": &row.bucket_id,
                ":goal_id": &row.goal_id,
                ":content": &row.content,
                ":tags": &row.tags,
                ":entry_date": &row.entry_date,
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
            "DELETE FROM progress_logs WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<ProgressLogRow>> {
        let mut stmt = conn.prepare(&format!("{BASE_SELECT} WHERE id = ?1 AND user_id = ?2"))?;
        let row = stmt
            .query_row([id, user_id], |row| ProgressLogRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_all(conn: &Connection, user_id: &str) -> AppResult<Vec<ProgressLogRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 ORDER BY entry_date DESC, created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id], |row| ProgressLogRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn serialize_tags(tags: &[String]) -> AppResult<Option<String>> {
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(tags)?))
    }
}

fn deserialize_tags(raw: Option<String>) -> AppResult<Vec<String>> {
    match raw {
        Some(value) if !value.is_empty() => Ok(serde_json::from_str(&value)?),
        _ => Ok(Vec::new()),
    }
}
