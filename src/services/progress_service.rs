use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::check_in_repository::{CheckInRepository, CheckInRow};
use crate::db::repositories::progress_repository::{ProgressLogRow, ProgressRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::progress::{
    ProgressLogCreateInput, ProgressLogEntry, ProgressLogUpdateInput, Timeline, TimelineDay,
    TimelineFilter, TimelineItem,
};
use crate::services::bucket_service::{fetch_bucket, normalize_optional_string};
use crate::services::goal_service::fetch_goal;
use crate::services::settings_service::user_today;
use crate::utils::dates::parse_date;

const MAX_CONTENT_CHARS: usize = 5_000;
const MAX_TAG_CHARS: usize = 40;

#[derive(Clone)]
pub struct ProgressService {
    db: DbPool,
}

impl ProgressService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create(&self, user_id: &str, input: ProgressLogCreateInput) -> AppResult<ProgressLogEntry> {
        let content = normalize_content(&input.content)?;
        let tags = normalize_tags(input.tags.unwrap_or_default())?;

        let entry = self.db.with_connection(|conn| {
            let bucket_id = normalize_optional_string(input.bucket_id);
            let goal_id = normalize_optional_string(input.goal_id);
            ensure_links(conn, user_id, bucket_id.as_deref(), goal_id.as_deref())?;

            let entry_date = match normalize_optional_string(input.entry_date) {
                Some(value) => parse_date(&value)?,
                None => user_today(conn, user_id)?,
            };
            let now = Utc::now().to_rfc3339();
            let entry = ProgressLogEntry {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                bucket_id,
                goal_id,
                entry_date,
                content,
                tags,
                created_at: now.clone(),
                updated_at: now,
            };
            ProgressRepository::insert(conn, &ProgressLogRow::from_record(&entry)?)?;
            Ok(entry)
        })?;

        info!(target: "app::progress", entry_id = %entry.id, tags = entry.tags.len(), "progress logged");
        Ok(entry)
    }

    pub fn update(
        &self,
        user_id: &str,
        id: &str,
        update: ProgressLogUpdateInput,
    ) -> AppResult<ProgressLogEntry> {
        let entry = self.db.with_connection(|conn| {
            let mut entry = ProgressRepository::find_by_id(conn, user_id, id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;

            if let Some(content) = update.content {
                entry.content = normalize_content(&content)?;
            }
            if let Some(date) = update.entry_date {
                entry.entry_date = parse_date(&date)?;
            }
            if let Some(bucket_id) = update.bucket_id {
                entry.bucket_id = normalize_optional_string(bucket_id);
            }
            if let Some(goal_id) = update.goal_id {
                entry.goal_id = normalize_optional_string(goal_id);
            }
            if let Some(tags) = update.tags {
                entry.tags = normalize_tags(tags)?;
            }
            ensure_links(conn, user_id, entry.bucket_id.as_deref(), entry.goal_id.as_deref())?;

            entry.updated_at = Utc::now().to_rfc3339();
            ProgressRepository::update(conn, &ProgressLogRow::from_record(&entry)?)?;
            Ok(entry)
        })?;

        info!(target: "app::progress", entry_id = %entry.id, "progress entry updated");
        Ok(entry)
    }

    pub fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| ProgressRepository::delete(conn, user_id, id))?;
        info!(target: "app::progress", entry_id = %id, "progress entry deleted");
        Ok(())
    }

    /// Progress notes and check-in answers merged into days, newest day first.
    /// A tag narrows the view to progress notes carrying it.
    pub fn timeline(&self, user_id: &str, filter: TimelineFilter, tag: Option<&str>) -> AppResult<Timeline> {
        let tag = tag
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        let (entries, responses) = self.db.with_connection(|conn| {
            let entries = ProgressRepository::list_all(conn, user_id)?
                .into_iter()
                .map(ProgressLogRow::into_record)
                .collect::<AppResult<Vec<_>>>()?;
            let responses = if filter != TimelineFilter::Progress && tag.is_none() {
                CheckInRepository::list_all(conn, user_id)?
                    .into_iter()
                    .map(CheckInRow::into_record)
                    .collect::<AppResult<Vec<_>>>()?
            } else {
                Vec::new()
            };
            Ok((entries, responses))
        })?;

        let tags: Vec<String> = entries
            .iter()
            .flat_map(|entry| entry.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut days: BTreeMap<NaiveDate, Vec<TimelineItem>> = BTreeMap::new();
        if filter != TimelineFilter::CheckIn {
            for entry in entries {
                if let Some(tag) = tag.as_deref() {
                    if !entry.tags.iter().any(|candidate| candidate == tag) {
                        continue;
                    }
                }
                days.entry(entry.entry_date)
                    .or_default()
                    .push(TimelineItem::Progress(entry));
            }
        }
        for response in responses {
            days.entry(response.check_in_date)
                .or_default()
                .push(TimelineItem::CheckIn(response));
        }

        let days: Vec<TimelineDay> = days
            .into_iter()
            .rev()
            .map(|(date, items)| TimelineDay { date, items })
            .collect();
        debug!(target: "app::progress", days = days.len(), tags = tags.len(), "timeline built");

        Ok(Timeline { days, tags })
    }
}

fn ensure_links(
    conn: &Connection,
    user_id: &str,
    bucket_id: Option<&str>,
    goal_id: Option<&str>,
) -> AppResult<()> {
    if let Some(bucket_id) = bucket_id {
        fetch_bucket(conn, user_id, bucket_id)?;
    }
    if let Some(goal_id) = goal_id {
        fetch_goal(conn, user_id, goal_id)?;
    }
    Ok(())
}

fn normalize_content(content: &str) -> AppResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("progress entry cannot be empty"));
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::validation(format!(
            "progress entry must be {MAX_CONTENT_CHARS} characters or fewer"
        )));
    }
    Ok(trimmed.to_string())
}

/// Lowercased, trimmed, deduplicated; first occurrence wins the position.
fn normalize_tags(tags: Vec<String>) -> AppResult<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(AppError::validation(format!(
                "tags must be {MAX_TAG_CHARS} characters or fewer"
            )));
        }
        if seen.insert(tag.clone()) {
            normalized.push(tag);
        }
    }
    Ok(normalized)
}
