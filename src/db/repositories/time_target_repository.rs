use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::bucket::TimeTarget;

impl TryFrom<&Row<'_>> for TimeTarget {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TimeTarget {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            bucket_id: row.get("bucket_id")?,
            target_percent: row.get("target_percent")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TimeTargetRepository;

impl TimeTargetRepository {
    /// Inserts or replaces the single target of a bucket.
    pub fn upsert(conn: &Connection, target: &TimeTarget) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO time_targets (id, user_id, bucket_id, target_percent, created_at, updated_at)
                VALUES (:id, :user_id, :bucket_id, :target_percent, :created_at, :updated_at)
                ON CONFLICT(user_id, bucket_id) DO UPDATE SET
                    target_percent = excluded.target_percent,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":id": &target.id,
                ":user_id": &target.user_id,
                ":bucket_id": &target.bucket_id,
                ":target_percent": target.target_percent,
                ":created_at": &target.created_at,
                ":updated_at": &target.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn find_by_bucket(
        conn: &Connection,
        user_id: &str,
        bucket_id: &str,
    ) -> AppResult<Option<TimeTarget>> {
        let target = conn
            .query_row(
                "SELECT * FROM time_targets WHERE user_id = ?1 AND bucket_id = ?2",
                [user_id, bucket_id],
                |row| TimeTarget::try_from(row),
            )
            .optional()?;
        Ok(target)
    }

    pub fn list(conn: &Connection, user_id: &str) -> AppResult<Vec<TimeTarget>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM time_targets WHERE user_id = ?1 ORDER BY target_percent DESC",
        )?;
        let targets = stmt
            .query_map([user_id], |row| TimeTarget::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }

    pub fn delete_for_bucket(conn: &Connection, user_id: &str, bucket_id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM time_targets WHERE user_id = ?1 AND bucket_id = ?2",
            [user_id, bucket_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
