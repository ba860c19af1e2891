//! Board view over a user's tasks: snooze partitioning, the delegation
//! filter and the selectable sort modes.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::task::{TaskRecord, TaskStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPartition {
    pub open: Vec<TaskRecord>,
    pub snoozed: Vec<TaskRecord>,
    pub complete: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Mine,
    Delegated,
}

impl TaskFilter {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Ok(TaskFilter::All),
            "mine" => Ok(TaskFilter::Mine),
            "delegated" => Ok(TaskFilter::Delegated),
            other => Err(AppError::validation(format!("invalid task filter: {other}"))),
        }
    }

    pub fn matches(&self, task: &TaskRecord) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Mine => !task.is_delegated,
            TaskFilter::Delegated => task.is_delegated,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Priority,
    DueDate,
    ExpectedHours,
    Bucket,
    Created,
}

impl SortOption {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "priority" => Ok(SortOption::Priority),
            "due_date" => Ok(SortOption::DueDate),
            "expected_hours" => Ok(SortOption::ExpectedHours),
            "bucket" => Ok(SortOption::Bucket),
            "created" => Ok(SortOption::Created),
            other => Err(AppError::validation(format!("invalid sort option: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DelegationCounts {
    pub all: usize,
    pub mine: usize,
    pub delegated: usize,
}

/// An elapsed snooze counts as open without a stored transition.
pub fn is_effectively_open(task: &TaskRecord, today: NaiveDate) -> bool {
    match task.status {
        TaskStatus::Open => true,
        TaskStatus::Snoozed => task
            .snoozed_until
            .map(|until| until <= today)
            .unwrap_or(true),
        TaskStatus::Complete => false,
    }
}

pub fn partition(tasks: Vec<TaskRecord>, today: NaiveDate) -> TaskPartition {
    let mut result = TaskPartition::default();
    for task in tasks {
        if is_effectively_open(&task, today) {
            result.open.push(task);
        } else if task.status == TaskStatus::Snoozed {
            result.snoozed.push(task);
        } else {
            result.complete.push(task);
        }
    }
    result
}

/// Counts over the effectively open set, before any filter is applied.
pub fn delegation_counts(open: &[TaskRecord]) -> DelegationCounts {
    let delegated = open.iter().filter(|task| task.is_delegated).count();
    DelegationCounts {
        all: open.len(),
        mine: open.len() - delegated,
        delegated,
    }
}

fn compare_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_hours(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.unwrap_or(f64::INFINITY);
    let b = b.unwrap_or(f64::INFINITY);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare_bucket(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    let a = a.bucket_name.as_deref().unwrap_or("").to_lowercase();
    let b = b.bucket_name.as_deref().unwrap_or("").to_lowercase();
    a.cmp(&b)
}

/// Overdue tasks always lead; `sort` picks the key used after that.
pub fn compare(a: &TaskRecord, b: &TaskRecord, sort: SortOption, today: NaiveDate) -> Ordering {
    let overdue = b.is_overdue(today).cmp(&a.is_overdue(today));
    if overdue != Ordering::Equal {
        return overdue;
    }

    match sort {
        SortOption::Priority => a
            .priority
            .weight()
            .cmp(&b.priority.weight())
            .then_with(|| compare_due(a.due_date, b.due_date)),
        SortOption::DueDate => compare_due(a.due_date, b.due_date),
        SortOption::ExpectedHours => compare_hours(a.expected_hours, b.expected_hours),
        SortOption::Bucket => compare_bucket(a, b),
        SortOption::Created => b.created_at.cmp(&a.created_at),
    }
}

pub fn sort_tasks(tasks: &mut [TaskRecord], sort: SortOption, today: NaiveDate) {
    tasks.sort_by(|a, b| compare(a, b, sort, today));
}
