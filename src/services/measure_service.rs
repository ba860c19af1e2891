use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::measure_repository::{MeasureRepository, MeasureRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::check_in::{Measure, MeasureCreateInput, MeasureType, MeasureUpdateInput};

const MEASURE_IN_USE_MESSAGE: &str =
    "Cannot delete this measure because it has check-in responses. Deactivate it instead.";
const MAX_QUESTION_CHARS: usize = 300;

#[derive(Clone)]
pub struct MeasureService {
    db: DbPool,
}

impl MeasureService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create(&self, user_id: &str, input: MeasureCreateInput) -> AppResult<Measure> {
        let measure_type = match input.measure_type.as_deref() {
            Some(value) => MeasureType::parse(value)?,
            None => MeasureType::Scale,
        };
        validate_reference_score(measure_type, input.baseline_score, "baseline")?;
        validate_reference_score(measure_type, input.target_score, "target")?;
        let question_text = normalize_question(&input.question_text)?;

        let measure = self.db.with_connection(|conn| {
            let now = Utc::now().to_rfc3339();
            let sort_order = MeasureRepository::max_sort_order(conn, user_id)?
                .map(|max| max + 1)
                .unwrap_or(0);
            let measure = Measure {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                question_text,
                measure_type,
                baseline_score: input.baseline_score,
                target_score: input.target_score,
                is_active: true,
                sort_order,
                created_at: now.clone(),
                updated_at: now,
            };
            MeasureRepository::insert(conn, &MeasureRow::from_record(&measure))?;
            Ok(measure)
        })?;

        info!(target: "app::checkins", measure_id = %measure.id, "measure created");
        Ok(measure)
    }

    pub fn update(&self, user_id: &str, id: &str, update: MeasureUpdateInput) -> AppResult<Measure> {
        let measure = self.db.with_connection(|conn| {
            let mut measure = fetch_measure(conn, user_id, id)?;

            if let Some(text) = update.question_text {
                measure.question_text = normalize_question(&text)?;
            }
            if let Some(kind) = update.measure_type {
                let kind = MeasureType::parse(&kind)?;
                if kind != measure.measure_type
                    && MeasureRepository::count_responses(conn, user_id, id)? > 0
                {
                    return Err(AppError::validation(
                        "the answer type cannot change once check-ins were recorded",
                    ));
                }
                measure.measure_type = kind;
            }
            if let Some(baseline) = update.baseline_score {
                measure.baseline_score = baseline;
            }
            if let Some(target) = update.target_score {
                measure.target_score = target;
            }
            if let Some(active) = update.is_active {
                measure.is_active = active;
            }
            if let Some(order) = update.sort_order {
                measure.sort_order = order;
            }

            validate_reference_score(measure.measure_type, measure.baseline_score, "baseline")?;
            validate_reference_score(measure.measure_type, measure.target_score, "target")?;

            measure.updated_at = Utc::now().to_rfc3339();
            MeasureRepository::update(conn, &MeasureRow::from_record(&measure))?;
            Ok(measure)
        })?;

        info!(target: "app::checkins", measure_id = %measure.id, "measure updated");
        Ok(measure)
    }

    pub fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| {
            MeasureRepository::delete(conn, user_id, id)
                .map_err(|err| err.explain_foreign_key(MEASURE_IN_USE_MESSAGE))
        })?;
        info!(target: "app::checkins", measure_id = %id, "measure deleted");
        Ok(())
    }

    pub fn get(&self, user_id: &str, id: &str) -> AppResult<Measure> {
        self.db.with_connection(|conn| fetch_measure(conn, user_id, id))
    }

    /// Measures ordered for the check-in form.
    pub fn list(&self, user_id: &str, active_only: bool) -> AppResult<Vec<Measure>> {
        let rows = self
            .db
            .with_connection(|conn| MeasureRepository::list(conn, user_id, active_only))?;
        let measures = rows
            .into_iter()
            .map(MeasureRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::checkins", count = measures.len(), active_only, "measures listed");
        Ok(measures)
    }
}

pub(crate) fn fetch_measure(conn: &Connection, user_id: &str, id: &str) -> AppResult<Measure> {
    MeasureRepository::find_by_id(conn, user_id, id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn normalize_question(text: &str) -> AppResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("question text is required"));
    }
    if trimmed.chars().count() > MAX_QUESTION_CHARS {
        return Err(AppError::validation(format!(
            "question text must be {MAX_QUESTION_CHARS} characters or fewer"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_reference_score(kind: MeasureType, score: Option<f64>, label: &str) -> AppResult<()> {
    match score {
        Some(value) => kind
            .validate_score(value)
            .map_err(|_| {
                let (min, max) = kind.score_range();
                AppError::validation(format!("{label} score must be between {min} and {max}"))
            }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const USER: &str = "user-1";

    fn setup() -> (MeasureService, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("measures.sqlite")).expect("db pool");
        (MeasureService::new(pool), dir)
    }

    fn question(text: &str, kind: Option<&str>) -> MeasureCreateInput {
        MeasureCreateInput {
            question_text: text.into(),
            measure_type: kind.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn measures_are_appended_in_order() {
        let (service, _dir) = setup();
        let first = service.create(USER, question("How rested?", None)).unwrap();
        let second = service
            .create(USER, question("Did you exercise?", Some("binary")))
            .unwrap();
        assert_eq!(first.sort_order, 0);
        assert_eq!(second.sort_order, 1);
        assert_eq!(first.measure_type, MeasureType::Scale);
        assert_eq!(second.measure_type, MeasureType::Binary);

        service
            .update(
                USER,
                &first.id,
                MeasureUpdateInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let active = service.list(USER, true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
        assert_eq!(service.list(USER, false).unwrap().len(), 2);
    }

    #[test]
    fn reference_scores_follow_the_answer_type() {
        let (service, _dir) = setup();
        let bad = service.create(
            USER,
            MeasureCreateInput {
                target_score: Some(11.0),
                ..question("Mood", None)
            },
        );
        assert!(matches!(bad, Err(AppError::Validation { .. })));

        let ok = service
            .create(
                USER,
                MeasureCreateInput {
                    baseline_score: Some(4.0),
                    target_score: Some(8.0),
                    ..question("Mood", None)
                },
            )
            .unwrap();
        let to_binary = service.update(
            USER,
            &ok.id,
            MeasureUpdateInput {
                measure_type: Some("binary".into()),
                ..Default::default()
            },
        );
        assert!(matches!(to_binary, Err(AppError::Validation { .. })));
    }
}
