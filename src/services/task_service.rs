use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::repositories::task_repository::{TaskRepository, TaskRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{
    ActivityEntry, Priority, TaskCreateInput, TaskRecord, TaskStatus, TaskUpdateInput,
};
use crate::services::bucket_service::{fetch_bucket, normalize_optional_string};
use crate::services::goal_service::fetch_goal;
use crate::services::recurrence::{next_due_date, RecurrenceRule};
use crate::services::settings_service::user_today;
use crate::services::task_ordering::{
    delegation_counts, partition, sort_tasks, DelegationCounts, SortOption, TaskFilter,
};
use crate::utils::dates::{add_days, parse_date};

const MAX_TITLE_CHARS: usize = 200;
const MAX_SNOOZE_DAYS: u32 = 365;

/// Tasks as the board shows them: open work filtered and sorted, snoozed work
/// by wake-up date, finished work newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoard {
    pub open: Vec<TaskRecord>,
    pub snoozed: Vec<TaskRecord>,
    pub complete: Vec<TaskRecord>,
    pub counts: DelegationCounts,
    pub filter: TaskFilter,
    pub sort: SortOption,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub task: TaskRecord,
    /// Successor created for a recurring task, if that succeeded.
    pub next_task: Option<TaskRecord>,
}

#[derive(Clone)]
pub struct TaskService {
    db: DbPool,
}

impl TaskService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create(&self, user_id: &str, input: TaskCreateInput) -> AppResult<TaskRecord> {
        let now = Utc::now().to_rfc3339();

        let record = self.db.with_connection(|conn| {
            let bucket = fetch_bucket(conn, user_id, &input.bucket_id)?;
            let goal_id = normalize_optional_string(input.goal_id);
            if let Some(goal_id) = goal_id.as_deref() {
                fetch_goal(conn, user_id, goal_id)?;
            }

            let is_recurring = input.is_recurring.unwrap_or(false);
            let is_delegated = input.is_delegated.unwrap_or(false);

            let record = TaskRecord {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                bucket_id: bucket.id,
                bucket_name: Some(bucket.name),
                goal_id,
                title: normalize_title(&input.title)?,
                description: normalize_optional_string(input.description),
                status: TaskStatus::Open,
                priority: input
                    .priority
                    .as_deref()
                    .map(Priority::parse)
                    .transpose()?
                    .unwrap_or_default(),
                due_date: parse_optional_date(input.due_date)?,
                snoozed_until: None,
                expected_hours: validate_expected_hours(input.expected_hours)?,
                is_recurring,
                recurrence_rule: resolve_rule(is_recurring, input.recurrence_rule.as_deref())?,
                is_delegated,
                delegated_to: resolve_delegate(is_delegated, input.delegated_to)?,
                progress_notes: None,
                completion_note: None,
                completed_at: None,
                activity_log: Vec::new(),
                created_at: now.clone(),
                updated_at: now,
            };
            TaskRepository::insert(conn, &TaskRow::from_record(&record)?)?;
            Ok(record)
        })?;

        info!(target: "app::tasks", task_id = %record.id, "task created");
        Ok(record)
    }

    pub fn update(&self, user_id: &str, id: &str, update: TaskUpdateInput) -> AppResult<TaskRecord> {
        let record = self.db.with_connection(|conn| {
            let mut record = fetch_task(conn, user_id, id)?;

            if let Some(bucket_id) = update.bucket_id {
                let bucket = fetch_bucket(conn, user_id, &bucket_id)?;
                record.bucket_id = bucket.id;
                record.bucket_name = Some(bucket.name);
            }
            if let Some(goal_id) = update.goal_id {
                let goal_id = normalize_optional_string(goal_id);
                if let Some(goal_id) = goal_id.as_deref() {
                    fetch_goal(conn, user_id, goal_id)?;
                }
                record.goal_id = goal_id;
            }
            if let Some(title) = update.title {
                record.title = normalize_title(&title)?;
            }
            if let Some(description) = update.description {
                record.description = normalize_optional_string(description);
            }
            if let Some(priority) = update.priority {
                record.priority = Priority::parse(&priority)?;
            }
            if let Some(due_date) = update.due_date {
                record.due_date = parse_optional_date(due_date)?;
            }
            if let Some(hours) = update.expected_hours {
                record.expected_hours = validate_expected_hours(hours)?;
            }
            if let Some(notes) = update.progress_notes {
                record.progress_notes = normalize_optional_string(notes);
            }

            let is_recurring = update.is_recurring.unwrap_or(record.is_recurring);
            let rule_input = match update.recurrence_rule {
                Some(rule) => rule,
                None => record.recurrence_rule.map(|rule| rule.as_str().to_string()),
            };
            record.recurrence_rule = resolve_rule(is_recurring, rule_input.as_deref())?;
            record.is_recurring = is_recurring;

            let is_delegated = update.is_delegated.unwrap_or(record.is_delegated);
            let delegate_input = match update.delegated_to {
                Some(delegate) => delegate,
                None => record.delegated_to.clone(),
            };
            record.delegated_to = resolve_delegate(is_delegated, delegate_input)?;
            record.is_delegated = is_delegated;

            save(conn, &mut record)?;
            Ok(record)
        })?;

        info!(target: "app::tasks", task_id = %record.id, "task updated");
        Ok(record)
    }

    pub fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| TaskRepository::delete(conn, user_id, id))?;
        info!(target: "app::tasks", task_id = %id, "task deleted");
        Ok(())
    }

    pub fn get(&self, user_id: &str, id: &str) -> AppResult<TaskRecord> {
        let record = self.db.with_connection(|conn| fetch_task(conn, user_id, id))?;
        debug!(target: "app::tasks", task_id = %record.id, "task fetched");
        Ok(record)
    }

    pub fn list(&self, user_id: &str, bucket_id: Option<&str>) -> AppResult<Vec<TaskRecord>> {
        let rows = self.db.with_connection(|conn| match bucket_id {
            Some(bucket_id) => TaskRepository::list_by_bucket(conn, user_id, bucket_id),
            None => TaskRepository::list_all(conn, user_id),
        })?;
        let records = rows
            .into_iter()
            .map(TaskRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::tasks", count = records.len(), "tasks listed");
        Ok(records)
    }

    /// Marks the task complete. Recurring tasks get an open successor due one
    /// interval later; a failure there is logged and the completion stands.
    pub fn complete(&self, user_id: &str, id: &str, note: Option<String>) -> AppResult<TaskCompletion> {
        let (task, today) = self.db.with_connection(|conn| {
            let mut record = fetch_task(conn, user_id, id)?;
            transition(&mut record, TaskStatus::Complete)?;
            record.snoozed_until = None;
            record.completed_at = Some(Utc::now().to_rfc3339());
            record.completion_note = normalize_optional_string(note);
            save(conn, &mut record)?;
            Ok((record, user_today(conn, user_id)?))
        })?;
        info!(target: "app::tasks", task_id = %task.id, "task completed");

        let next_task = if task.is_recurring {
            match self.create_successor(&task, today) {
                Ok(next) => {
                    info!(
                        target: "app::tasks",
                        task_id = %task.id,
                        next_task_id = %next.id,
                        due_date = ?next.due_date,
                        "recurring task rescheduled"
                    );
                    Some(next)
                }
                Err(err) => {
                    warn!(
                        target: "app::tasks",
                        task_id = %task.id,
                        error = %err,
                        "failed to create next occurrence"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(TaskCompletion { task, next_task })
    }

    pub fn reopen(&self, user_id: &str, id: &str) -> AppResult<TaskRecord> {
        let record = self.db.with_connection(|conn| {
            let mut record = fetch_task(conn, user_id, id)?;
            transition(&mut record, TaskStatus::Open)?;
            record.completed_at = None;
            record.completion_note = None;
            record.snoozed_until = None;
            save(conn, &mut record)?;
            Ok(record)
        })?;
        info!(target: "app::tasks", task_id = %record.id, "task reopened");
        Ok(record)
    }

    pub fn snooze(&self, user_id: &str, id: &str, days: u32) -> AppResult<TaskRecord> {
        if days == 0 || days > MAX_SNOOZE_DAYS {
            return Err(AppError::validation(format!(
                "snooze must be between 1 and {MAX_SNOOZE_DAYS} days"
            )));
        }

        let record = self.db.with_connection(|conn| {
            let mut record = fetch_task(conn, user_id, id)?;
            transition(&mut record, TaskStatus::Snoozed)?;
            let today = user_today(conn, user_id)?;
            record.snoozed_until = Some(add_days(today, i64::from(days)));
            save(conn, &mut record)?;
            Ok(record)
        })?;
        info!(
            target: "app::tasks",
            task_id = %record.id,
            until = ?record.snoozed_until,
            "task snoozed"
        );
        Ok(record)
    }

    pub fn unsnooze(&self, user_id: &str, id: &str) -> AppResult<TaskRecord> {
        let record = self.db.with_connection(|conn| {
            let mut record = fetch_task(conn, user_id, id)?;
            if record.status != TaskStatus::Snoozed {
                return Err(AppError::validation("task is not snoozed"));
            }
            transition(&mut record, TaskStatus::Open)?;
            record.snoozed_until = None;
            save(conn, &mut record)?;
            Ok(record)
        })?;
        info!(target: "app::tasks", task_id = %record.id, "task unsnoozed");
        Ok(record)
    }

    pub fn add_activity(&self, user_id: &str, id: &str, text: &str) -> AppResult<TaskRecord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::validation("activity text is required"));
        }

        let record = self.db.with_connection(|conn| {
            let mut record = fetch_task(conn, user_id, id)?;
            record.activity_log.push(ActivityEntry {
                at: Utc::now().to_rfc3339(),
                text: text.to_string(),
            });
            save(conn, &mut record)?;
            Ok(record)
        })?;
        debug!(
            target: "app::tasks",
            task_id = %record.id,
            entries = record.activity_log.len(),
            "task activity added"
        );
        Ok(record)
    }

    pub fn board(&self, user_id: &str, filter: TaskFilter, sort: SortOption) -> AppResult<TaskBoard> {
        let today = self.db.with_connection(|conn| user_today(conn, user_id))?;
        self.board_at(user_id, filter, sort, today)
    }

    pub fn board_at(
        &self,
        user_id: &str,
        filter: TaskFilter,
        sort: SortOption,
        today: NaiveDate,
    ) -> AppResult<TaskBoard> {
        let tasks = self.list(user_id, None)?;
        let parts = partition(tasks, today);
        let counts = delegation_counts(&parts.open);

        let mut open: Vec<TaskRecord> = parts
            .open
            .into_iter()
            .filter(|task| filter.matches(task))
            .collect();
        sort_tasks(&mut open, sort, today);

        // The delegation filter narrows the open column only.
        let mut snoozed = parts.snoozed;
        snoozed.sort_by(|a, b| a.snoozed_until.cmp(&b.snoozed_until));

        let mut complete = parts.complete;
        complete.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        debug!(
            target: "app::tasks",
            open = open.len(),
            snoozed = snoozed.len(),
            complete = complete.len(),
            "task board built"
        );

        Ok(TaskBoard {
            open,
            snoozed,
            complete,
            counts,
            filter,
            sort,
        })
    }

    fn create_successor(&self, completed: &TaskRecord, today: NaiveDate) -> AppResult<TaskRecord> {
        let rule = completed.recurrence_rule.unwrap_or(RecurrenceRule::Weekly);
        let now = Utc::now().to_rfc3339();
        let successor = TaskRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: completed.user_id.clone(),
            bucket_id: completed.bucket_id.clone(),
            bucket_name: completed.bucket_name.clone(),
            goal_id: completed.goal_id.clone(),
            title: completed.title.clone(),
            description: completed.description.clone(),
            status: TaskStatus::Open,
            priority: completed.priority,
            due_date: Some(next_due_date(completed.due_date, rule, today)),
            snoozed_until: None,
            expected_hours: completed.expected_hours,
            is_recurring: true,
            recurrence_rule: Some(rule),
            is_delegated: completed.is_delegated,
            delegated_to: completed.delegated_to.clone(),
            progress_notes: None,
            completion_note: None,
            completed_at: None,
            activity_log: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        let row = TaskRow::from_record(&successor)?;
        self.db
            .with_connection(|conn| TaskRepository::insert(conn, &row))?;
        Ok(successor)
    }
}

fn fetch_task(conn: &Connection, user_id: &str, id: &str) -> AppResult<TaskRecord> {
    TaskRepository::find_by_id(conn, user_id, id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn save(conn: &Connection, record: &mut TaskRecord) -> AppResult<()> {
    record.updated_at = Utc::now().to_rfc3339();
    TaskRepository::update(conn, &TaskRow::from_record(record)?)
}

fn transition(record: &mut TaskRecord, next: TaskStatus) -> AppResult<()> {
    if !record.status.can_transition_to(next) {
        return Err(AppError::validation(format!(
            "cannot move task from {} to {}",
            record.status.as_str(),
            next.as_str()
        )));
    }
    record.status = next;
    Ok(())
}

fn normalize_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("task title is required"));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(format!(
            "task title must be {MAX_TITLE_CHARS} characters or fewer"
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_optional_date(value: Option<String>) -> AppResult<Option<NaiveDate>> {
    normalize_optional_string(value)
        .as_deref()
        .map(parse_date)
        .transpose()
}

fn validate_expected_hours(hours: Option<f64>) -> AppResult<Option<f64>> {
    match hours {
        Some(value) if !value.is_finite() || value <= 0.0 => Err(AppError::validation(
            "expected hours must be greater than 0",
        )),
        other => Ok(other),
    }
}

/// Recurring tasks without an explicit rule repeat weekly; one-off tasks carry
/// no rule.
fn resolve_rule(is_recurring: bool, rule: Option<&str>) -> AppResult<Option<RecurrenceRule>> {
    if !is_recurring {
        return Ok(None);
    }
    match rule.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => RecurrenceRule::parse(value).map(Some),
        None => Ok(Some(RecurrenceRule::Weekly)),
    }
}

fn resolve_delegate(is_delegated: bool, delegate: Option<String>) -> AppResult<Option<String>> {
    if !is_delegated {
        return Ok(None);
    }
    match normalize_optional_string(delegate) {
        Some(name) => Ok(Some(name)),
        None => Err(AppError::validation(
            "delegated tasks need the name of who they were handed to",
        )),
    }
}
