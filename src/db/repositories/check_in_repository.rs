use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::check_in::CheckInResponse;
use crate::utils::dates::{format_date, parse_date};

const BASE_SELECT: &str = r#"
    SELECT id, user_id, measure_id, check_in_date, score, notes, created_at
    FROM check_in_responses
"#;

#[derive(Debug, Clone)]
pub struct CheckInRow {
    pub id: String,
    pub user_id: String,
    pub measure_id: String,
    pub check_in_date: String,
    pub score: f64,
    pub notes: Option<String>,
    pub created_at: String,
}

impl CheckInRow {
    pub fn from_record(response: &CheckInResponse) -> Self {
        Self {
            id: response.id.clone(),
            user_id: response.user_id.clone(),
            measure_id: response.measure_id.clone(),
            check_in_date: format_date(response.check_in_date),
            score: response.score,
            notes: response.notes.clone(),
            created_at: response.created_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<CheckInResponse> {
        Ok(CheckInResponse {
            id: self.id,
            user_id: self.user_id,
            measure_id: self.measure_id,
            check_in_date: parse_date(&self.check_in_date)?,
            score: self.score,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for CheckInRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(CheckInRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            measure_id: row.get("measure_id")?,
            check_in_date: row.get("check_in_date")?,
            score: row.get("score")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct CheckInRepository;

impl CheckInRepository {
    /// Writes the answer for (user, measure, date), keeping the id of an
    /// existing row.
    pub fn upsert(conn: &Connection, row: &CheckInRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO check_in_responses (id, user_id, measure_id, check_in_date, score, notes, created_at)
                VALUES (:id, :user_id, :measure_id, :check_in_date, :score, :notes, :created_at)
                ON CONFLICT(user_id, measure_id, check_in_date) DO UPDATE SET
                    score = excluded.score,
                    notes = excluded.notes
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":measure_id": &row.measure_id,
                ":check_in_date": &row.check_in_date,
                ":score": row.score,
                ":notes": &row.notes,
                ":created_at": &row.created_at,
            },
        )?;
        Ok(())
    }

    pub fn find_for_day(
        conn: &Connection,
        user_id: &str,
        measure_id: &str,
        date: &str,
    ) -> AppResult<Option<CheckInRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 AND measure_id = ?2 AND check_in_date = ?3"
        ))?;
        let row = stmt
            .query_row([user_id, measure_id, date], |row| CheckInRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// Responses with `check_in_date` in `[from, to]`, newest first.
    pub fn list_between(conn: &Connection, user_id: &str, from: &str, to: &str) -> AppResult<Vec<CheckInRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 AND check_in_date >= ?2 AND check_in_date <= ?3 \
             ORDER BY check_in_date DESC, created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id, from, to], |row| CheckInRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_all(conn: &Connection, user_id: &str) -> AppResult<Vec<CheckInRow>> {
        let mut stmt = conn.prepare(&format!(
            "{BASE_SELECT} WHERE user_id = ?1 ORDER BY check_in_date DESC, created_at DESC"
        ))?;
        let rows = stmt
            .query_map([user_id], |row| CheckInRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn distinct_dates(conn: &Connection, user_id: &str) -> AppResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT check_in_date FROM check_in_responses WHERE user_id = ?1 ORDER BY check_in_date DESC",
        )?;
        let dates = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dates)
    }

    pub fn delete(conn: &Connection, user_id: &str, id: &str) -> AppResult<()> {
        let affected = conn.execute(
            "DELETE FROM check_in_responses WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
