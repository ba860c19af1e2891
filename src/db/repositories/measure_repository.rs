use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::check_in::{Measure, MeasureType};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        question_text,
        measure_type,
        baseline_score,
        target_score,
        is_active,
        sort_order,
        created_at,
        updated_at
    FROM measures
"#;

#[derive(Debug, Clone)]
pub struct MeasureRow {
    pub id: String,
    pub user_id: String,
    pub question_text: String,
    pub measure_type: String,
    pub baseline_score: Option<f64>,
    pub target_score: Option<f64>,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl MeasureRow {
    pub fn from_record(measure: &Measure) -> Self {
        Self {
            id: measure.id.clone(),
            user_id: measure.user_id.clone(),
            question_text: measure.question_text.clone(),
            measure_type: measure.measure_type.as_str().to_string(),
            baseline_score: measure.baseline_score,
            target_score: measure.target_score,
            is_active: measure.is_active,
            sort_order: measure.sort_order,
            created_at: measure.created_at.clone(),
            updated_at: measure.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<Measure> {
        Ok(Measure {
            id: self.id,
            user_id: self.user_id,
            question_text: self.question_text,
            measure_type: MeasureType::parse(&self.measure_type)?,
            baseline_score: self.baseline_score,
            target_score: self.target_score,
            is_active: self.is_active,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for MeasureRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(MeasureRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            question_text: row.get("question_text")?,
            measure_type: row.get("measure_type")?,
            baseline_score: row.get("baseline_score")?,
            target_score: row.get("target_score")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            sort_order: row.get("sort_order")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct MeasureRepository;

impl MeasureRepository {
    pub fn insert(conn: &Connection, row: &MeasureRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO measures (
                    id, user_id, question_text, measure_type, baseline_score, target_score,
                    is_active, sort_order, created_at, updated_at
                ) VALUES (
                    :id, :user_id, :question_text, :measure_type, :baseline_score, :target_score,
                    :is_active, :sort_order, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":question_text": &row.question_text,
                ":measure_type": &row.measure_type,
                ":baseline_score": &row.baseline_score,
                ":target_score": &row.target_score,
                ":is_active": row.is_active as i64,
                ":sort_order": row.sort_order,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;
        Ok(())
    }

    pub fn update(conn: &Connection, row: &MeasureRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE measures SET
                    question_text = :question_text,
                    measure_type = :measure_type,
                    baseline_score = :baseline_score,
                    target_score = :target_score,
                    is_active = :is_active,
                    sort_order = :sort_order,
                    updated_at = :updated_at
                WHERE id = :id AND user_id = :user_id
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":question_text": &row.question_text,
                ":measure_type": &row.measure_type,
                ":baseline_score": &row.baseline_score,
                ":target_score": &row.target_score,
                ":is_active": row.is_active as i64,
                ":sort_order": row.sort_order,
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
            "DELETE FROM measures WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<MeasureRow>> {
        let mut stmt = conn.prepare(&format!("{BASE_SELECT} WHERE id = ?1 AND user_id = ?2"))?;
        let row = stmt
            .query_row([id, user_id], |row| MeasureRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list(conn: &Connection, user_id: &str, active_only: bool) -> AppResult<Vec<MeasureRow>> {
        let filter = if active_only { " AND is_active = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1{filter} ORDER BY sort_order ASC, created_at ASC"
        ))?;
        let rows = stmt
            .query_map([user_id], |row| MeasureRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn max_sort_order(conn: &Connection, user_id: &str) -> AppResult<Option<i64>> {
        let max = conn.query_row(
            "SELECT MAX(sort_order) FROM measures WHERE user_id = ?1",
            [user_id],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    pub fn count_responses(conn: &Connection, user_id: &str, id: &str) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM check_in_responses WHERE user_id = ?1 AND measure_id = ?2",
            [user_id, id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
