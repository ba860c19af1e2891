use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::bucket::Bucket;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        name,
        description,
        parent_bucket_id,
        color,
        icon,
        sort_order,
        is_active,
        created_at,
        updated_at
    FROM buckets
"#;

impl TryFrom<&Row<'_>> for Bucket {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Bucket {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            parent_bucket_id: row.get("parent_bucket_id")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            sort_order: row.get("sort_order")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct BucketRepository;

impl BucketRepository {
    pub fn insert(conn: &Connection, bucket: &Bucket) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO buckets (
                    id, user_id, name, description, parent_bucket_id, color, icon,
                    sort_order, is_active, created_at, updated_at
                ) VALUES (
                    :id, :user_id, :name, :description, :parent_bucket_id, :color, :icon,
                    :sort_order, :is_active, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &bucket.id,
                ":user_id": &bucket.user_id,
                ":name": &bucket.name,
                ":description": &bucket.description,
                ":parent_bucket_id": &bucket.parent_bucket_id,
                ":color": &bucket.color,
                ":icon": &bucket.icon,
                ":sort_order": bucket.sort_order,
                ":is_active": bucket.is_active as i64,
                ":created_at": &bucket.created_at,
                ":updated_at": &bucket.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, bucket: &Bucket) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE buckets SET
                    name = :name,
                    description = :description,
                    parent_bucket_id = :parent_bucket_id,
                    color = :color,
                    icon = :icon,
                    sort_order = :sort_order,
                    is_active = :is_active,
                    updated_at = :updated_at
                WHERE id = :id AND user_id = :user_id
            "#,
            named_params! {
                ":id": &bucket.id,
                ":user_id": &bucket.user_id,
                ":name": &bucket.name,
                ":description": &bucket.description,
                ":parent_bucket_id": &bucket.parent_bucket_id,
                ":color": &bucket.color,
                ":icon": &bucket.icon,
                ":sort_order": bucket.sort_order,
                ":is_active": bucket.is_active as i64,
                ":updated_at": &bucket.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, user_id: &str, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM buckets WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<Bucket>> {
        let mut stmt = conn.prepare(&format!("{BASE_SELECT} WHERE id = ?1 AND user_id = ?2"))?;
        let bucket = stmt
            .query_row([id, user_id], |row| Bucket::try_from(row))
            .optional()?;
        Ok(bucket)
    }

    pub fn list(conn: &Connection, user_id: &str, include_inactive: bool) -> AppResult<Vec<Bucket>> {
        let filter = if include_inactive { "" } else { " AND is_active = 1" };
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1{filter} ORDER BY sort_order ASC, name ASC"
        ))?;
        let buckets = stmt
            .query_map([user_id], |row| Bucket::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buckets)
    }

    pub fn list_children(conn: &Connection, user_id: &str, parent_id: &str) -> AppResult<Vec<Bucket>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 AND parent_bucket_id = ?2 ORDER BY sort_order ASC"
        ))?;
        let buckets = stmt
            .query_map([user_id, parent_id], |row| Bucket::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buckets)
    }

    pub fn max_sort_order(conn: &Connection, user_id: &str) -> AppResult<Option<i64>> {
        let max = conn.query_row(
            "SELECT MAX(sort_order) FROM buckets WHERE user_id = ?1",
            [user_id],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }
}
