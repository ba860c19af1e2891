use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::bucket_repository::BucketRepository;
use crate::db::repositories::task_repository::TaskRepository;
use crate::db::repositories::time_entry_repository::{TimeEntryRepository, TimeEntryRow};
use crate::db::repositories::time_target_repository::TimeTargetRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::analytics::{AllocationReport, AllocationRow, BucketHours, WeeklyCapacity};
use crate::models::time_entry::{EntryType, TimeEntry, TimeEntryCreateInput, TimeEntryUpdateInput};
use crate::services::bucket_service::{fetch_bucket, normalize_optional_string};
use crate::services::metrics::{
    allocation_percent, hours_by_bucket, pacing_status, round1, round2, target_percent_to_hours,
    total_hours, weekly_capacity,
};
use crate::services::settings_service::{load_or_default, user_today};
use crate::utils::dates::{format_date, parse_date, week_range};

pub const MIN_TIMER_SECONDS: u64 = 60;
pub const ALLOCATION_TOLERANCE: f64 = 0.15;
const MAX_ENTRY_HOURS: f64 = 24.0;

#[derive(Clone)]
pub struct TimeService {
    db: DbPool,
}

impl TimeService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn log_entry(&self, user_id: &str, input: TimeEntryCreateInput) -> AppResult<TimeEntry> {
        let entry = self.db.with_connection(|conn| {
            let date = match normalize_optional_string(input.entry_date) {
                Some(value) => parse_date(&value)?,
                None => user_today(conn, user_id)?,
            };
            insert_entry(
                conn,
                user_id,
                NewEntry {
                    bucket_id: &input.bucket_id,
                    task_id: normalize_optional_string(input.task_id),
                    entry_date: date,
                    hours: validate_hours(input.hours)?,
                    description: normalize_optional_string(input.description),
                    entry_type: EntryType::Manual,
                },
            )
        })?;

        info!(
            target: "app::time",
            entry_id = %entry.id,
            bucket_id = %entry.bucket_id,
            hours = entry.hours,
            "time entry logged"
        );
        Ok(entry)
    }

    /// Stores a stopped timer as hours on today's date. Runs shorter than a
    /// minute are dropped.
    pub fn record_timer(
        &self,
        user_id: &str,
        bucket_id: &str,
        elapsed_seconds: u64,
        description: Option<String>,
    ) -> AppResult<Option<TimeEntry>> {
        if elapsed_seconds < MIN_TIMER_SECONDS {
            debug!(target: "app::time", elapsed_seconds, "timer under a minute discarded");
            return Ok(None);
        }

        let hours = round2(elapsed_seconds as f64 / 3600.0);
        let entry = self.db.with_connection(|conn| {
            let today = user_today(conn, user_id)?;
            insert_entry(
                conn,
                user_id,
                NewEntry {
                    bucket_id,
                    task_id: None,
                    entry_date: today,
                    hours: validate_hours(hours)?,
                    description: normalize_optional_string(description),
                    entry_type: EntryType::Timer,
                },
            )
        })?;

        info!(
            target: "app::time",
            entry_id = %entry.id,
            hours = entry.hours,
            "timer recorded"
        );
        Ok(Some(entry))
    }

    pub fn update_entry(
        &self,
        user_id: &str,
        id: &str,
        update: TimeEntryUpdateInput,
    ) -> AppResult<TimeEntry> {
        let entry = self.db.with_connection(|conn| {
            let mut entry = TimeEntryRepository::find_by_id(conn, user_id, id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;

            if let Some(bucket_id) = update.bucket_id {
                entry.bucket_id = fetch_bucket(conn, user_id, &bucket_id)?.id;
            }
            if let Some(hours) = update.hours {
                entry.hours = validate_hours(hours)?;
            }
            if let Some(date) = update.entry_date {
                entry.entry_date = parse_date(&date)?;
            }
            if let Some(description) = update.description {
                entry.description = normalize_optional_string(description);
            }

            entry.updated_at = Utc::now().to_rfc3339();
            TimeEntryRepository::update(conn, &TimeEntryRow::from_record(&entry))?;
            Ok(entry)
        })?;

        info!(target: "app::time", entry_id = %entry.id, "time entry updated");
        Ok(entry)
    }

    pub fn delete_entry(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db
            .with_connection(|conn| TimeEntryRepository::delete(conn, user_id, id))?;
        info!(target: "app::time", entry_id = %id, "time entry deleted");
        Ok(())
    }

    /// Entries dated within `[from, to]`, newest first.
    pub fn list_entries(&self, user_id: &str, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<TimeEntry>> {
        if from > to {
            return Err(AppError::validation("range start must not be after its end"));
        }
        let entries = self
            .db
            .with_connection(|conn| load_entries(conn, user_id, from, to))?;
        debug!(target: "app::time", count = entries.len(), "time entries listed");
        Ok(entries)
    }

    /// Target versus logged hours for the Monday-to-Sunday week containing
    /// `week_of` (this week when absent).
    pub fn allocation_report(&self, user_id: &str, week_of: Option<NaiveDate>) -> AppResult<AllocationReport> {
        let report = self.db.with_connection(|conn| {
            let day = match week_of {
                Some(day) => day,
                None => user_today(conn, user_id)?,
            };
            build_allocation_report(conn, user_id, day)
        })?;
        debug!(
            target: "app::time",
            week_start = %report.week_start,
            rows = report.rows.len(),
            "allocation report built"
        );
        Ok(report)
    }

    /// Hours per bucket this week, largest first.
    pub fn week_overview(&self, user_id: &str) -> AppResult<Vec<BucketHours>> {
        self.db.with_connection(|conn| {
            let (start, end) = week_range(user_today(conn, user_id)?);
            let entries = load_entries(conn, user_id, start, end)?;
            let names = bucket_lookup(conn, user_id)?;

            let mut overview: Vec<BucketHours> = hours_by_bucket(&entries)
                .into_iter()
                .filter(|(_, hours)| *hours > 0.0)
                .map(|(bucket_id, hours)| {
                    let (bucket_name, color) = names
                        .get(&bucket_id)
                        .cloned()
                        .unwrap_or_else(|| (String::from("Unknown"), String::new()));
                    BucketHours {
                        bucket_id,
                        bucket_name,
                        color,
                        hours: round2(hours),
                    }
                })
                .collect();
            overview.sort_by(|a, b| b.hours.total_cmp(&a.hours));
            Ok(overview)
        })
    }

    pub fn capacity(&self, user_id: &str) -> AppResult<WeeklyCapacity> {
        self.db.with_connection(|conn| {
            let settings = load_or_default(conn, user_id)?;
            let targets = TimeTargetRepository::list(conn, user_id)?;
            Ok(weekly_capacity(&targets, settings.awake_hours_per_day))
        })
    }
}

struct NewEntry<'a> {
    bucket_id: &'a str,
    task_id: Option<String>,
    entry_date: NaiveDate,
    hours: f64,
    description: Option<String>,
    entry_type: EntryType,
}

fn insert_entry(conn: &Connection, user_id: &str, new: NewEntry<'_>) -> AppResult<TimeEntry> {
    let bucket = fetch_bucket(conn, user_id, new.bucket_id)?;
    if let Some(task_id) = new.task_id.as_deref() {
        TaskRepository::find_by_id(conn, user_id, task_id)?
            .ok_or_else(|| AppError::validation("linked task does not exist"))?;
    }

    let now = Utc::now().to_rfc3339();
    let entry = TimeEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        bucket_id: bucket.id,
        task_id: new.task_id,
        entry_date: new.entry_date,
        hours: new.hours,
        description: new.description,
        entry_type: new.entry_type,
        created_at: now.clone(),
        updated_at: now,
    };
    TimeEntryRepository::insert(conn, &TimeEntryRow::from_record(&entry))?;
    Ok(entry)
}

fn validate_hours(hours: f64) -> AppResult<f64> {
    if !hours.is_finite() || hours <= 0.0 || hours > MAX_ENTRY_HOURS {
        return Err(AppError::validation("hours must be greater than 0 and at most 24"));
    }
    Ok(hours)
}

pub(crate) fn load_entries(
    conn: &Connection,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<TimeEntry>> {
    TimeEntryRepository::list_between(conn, user_id, &format_date(from), &format_date(to))?
        .into_iter()
        .map(TimeEntryRow::into_record)
        .collect()
}

fn bucket_lookup(conn: &Connection, user_id: &str) -> AppResult<HashMap<String, (String, String)>> {
    Ok(BucketRepository::list(conn, user_id, true)?
        .into_iter()
        .map(|bucket| (bucket.id, (bucket.name, bucket.color)))
        .collect())
}

fn build_allocation_report(conn: &Connection, user_id: &str, day: NaiveDate) -> AppResult<AllocationReport> {
    let (week_start, week_end) = week_range(day);
    let settings = load_or_default(conn, user_id)?;
    let awake = settings.awake_hours_per_day;

    let entries = load_entries(conn, user_id, week_start, week_end)?;
    let actual = hours_by_bucket(&entries);
    let actual_percent = allocation_percent(&entries, awake, 7);
    let targets = TimeTargetRepository::list(conn, user_id)?;
    let target_by_bucket: HashMap<&str, f64> = targets
        .iter()
        .map(|target| (target.bucket_id.as_str(), target.target_percent))
        .collect();

    let mut rows: Vec<AllocationRow> = BucketRepository::list(conn, user_id, true)?
        .into_iter()
        .filter_map(|bucket| {
            let target_percent = target_by_bucket.get(bucket.id.as_str()).copied().unwrap_or(0.0);
            let actual_hours = actual.get(&bucket.id).copied().unwrap_or(0.0);
            if target_percent <= 0.0 && actual_hours <= 0.0 {
                return None;
            }
            let target_hours = target_percent_to_hours(target_percent, awake, 7);
            Some(AllocationRow {
                actual_percent: actual_percent.get(&bucket.id).copied().unwrap_or(0.0),
                status: pacing_status(actual_hours, target_hours, ALLOCATION_TOLERANCE),
                bucket_id: bucket.id,
                bucket_name: bucket.name,
                color: bucket.color,
                target_percent,
                target_hours,
                actual_hours: round1(actual_hours),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.target_hours.total_cmp(&a.target_hours));

    Ok(AllocationReport {
        week_start,
        week_end,
        total_logged_hours: round1(total_hours(&entries)),
        rows,
        capacity: weekly_capacity(&targets, awake),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analytics::PacingStatus;
    use crate::models::bucket::BucketCreateInput;
    use crate::services::bucket_service::BucketService;
    use tempfile::tempdir;

    const USER: &str = "user-1";

    struct Fixture {
        service: TimeService,
        buckets: BucketService,
        _dir: tempfile::TempDir,
    }

    fn setup() -> Fixture {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("time.sqlite")).expect("db pool");
        Fixture {
            service: TimeService::new(pool.clone()),
            buckets: BucketService::new(pool),
            _dir: dir,
        }
    }

    fn bucket(fixture: &Fixture, name: &str) -> String {
        fixture
            .buckets
            .create(
                USER,
                BucketCreateInput {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .expect("bucket")
            .id
    }

    fn log(fixture: &Fixture, bucket_id: &str, date: &str, hours: f64) -> TimeEntry {
        fixture
            .service
            .log_entry(
                USER,
                TimeEntryCreateInput {
                    bucket_id: bucket_id.into(),
                    hours,
                    entry_date: Some(date.into()),
                    ..Default::default()
                },
            )
            .expect("log entry")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn manual_hours_are_bounded() {
        let fixture = setup();
        let work = bucket(&fixture, "Work");
        for hours in [0.0, -1.0, 24.5, f64::NAN] {
            let result = fixture.service.log_entry(
                USER,
                TimeEntryCreateInput {
                    bucket_id: work.clone(),
                    hours,
                    ..Default::default()
                },
            );
            assert!(matches!(result, Err(AppError::Validation { .. })), "{hours}");
        }
        let entry = log(&fixture, &work, "2024-03-04", 24.0);
        assert_eq!(entry.entry_type, EntryType::Manual);
    }

    #[test]
    fn short_timers_are_discarded() {
        let fixture = setup();
        let work = bucket(&fixture, "Work");
        assert!(fixture
            .service
            .record_timer(USER, &work, 59, None)
            .unwrap()
            .is_none());

        let entry = fixture
            .service
            .record_timer(USER, &work, 5_400, Some("deep work".into()))
            .unwrap()
            .expect("entry");
        assert_eq!(entry.hours, 1.5);
        assert_eq!(entry.entry_type, EntryType::Timer);

        let odd = fixture
            .service
            .record_timer(USER, &work, 1_000, None)
            .unwrap()
            .expect("entry");
        assert_eq!(odd.hours, 0.28);
    }

    #[test]
    fn list_and_update_entries() {
        let fixture = setup();
        let work = bucket(&fixture, "Work");
        let home = bucket(&fixture, "Home");
        log(&fixture, &work, "2024-03-01", 1.0);
        let moved = log(&fixture, &work, "2024-03-05", 2.0);
        log(&fixture, &work, "2024-03-20", 3.0);

        let entries = fixture
            .service
            .list_entries(USER, date(2024, 3, 1), date(2024, 3, 10))
            .unwrap();
        assert_eq!(entries.len(), 2);

        let updated = fixture
            .service
            .update_entry(
                USER,
                &moved.id,
                TimeEntryUpdateInput {
                    bucket_id: Some(home.clone()),
                    hours: Some(2.5),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.bucket_id, home);
        assert_eq!(updated.hours, 2.5);

        fixture.service.delete_entry(USER, &moved.id).unwrap();
        assert!(matches!(
            fixture.service.delete_entry(USER, &moved.id),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn allocation_report_paces_buckets_against_targets() {
        let fixture = setup();
        let work = bucket(&fixture, "Work");
        let health = bucket(&fixture, "Health");
        let hobby = bucket(&fixture, "Hobby");
        bucket(&fixture, "Idle");

        // 16 awake hours * 7 = 112 hours a week
        fixture.buckets.set_target(USER, &work, 25.0).unwrap();
        fixture.buckets.set_target(USER, &health, 10.0).unwrap();

        log(&fixture, &work, "2024-03-04", 20.0);
        log(&fixture, &work, "2024-03-05", 8.0);
        log(&fixture, &health, "2024-03-06", 5.0);
        log(&fixture, &hobby, "2024-03-07", 2.0);
        log(&fixture, &hobby, "2024-03-11", 4.0);

        let report = fixture
            .service
            .allocation_report(USER, Some(date(2024, 3, 6)))
            .unwrap();
        assert_eq!(report.week_start, date(2024, 3, 4));
        assert_eq!(report.week_end, date(2024, 3, 10));
        assert_eq!(report.total_logged_hours, 35.0);

        let names: Vec<&str> = report.rows.iter().map(|row| row.bucket_name.as_str()).collect();
        assert_eq!(names, vec!["Work", "Health", "Hobby"]);

        let work_row = &report.rows[0];
        assert_eq!(work_row.target_hours, 28.0);
        assert_eq!(work_row.actual_hours, 28.0);
        assert_eq!(work_row.status, PacingStatus::OnTrack);
        assert_eq!(report.rows[1].status, PacingStatus::Behind);
        assert_eq!(report.rows[2].status, PacingStatus::Ahead);

        assert_eq!(report.capacity.total_percent, 35.0);
        assert_eq!(report.capacity.allocated, 39.2);
        assert_eq!(report.capacity.unallocated, 72.8);
    }
}
