use chrono::NaiveDate;
use lifetrack_app_lib::db::DbPool;
use lifetrack_app_lib::error::AppError;
use lifetrack_app_lib::models::analytics::PacingStatus;
use lifetrack_app_lib::models::bucket::{Bucket, BucketCreateInput};
use lifetrack_app_lib::models::settings::SettingsUpdateInput;
use lifetrack_app_lib::models::time_entry::TimeEntryCreateInput;
use lifetrack_app_lib::services::bucket_service::BucketService;
use lifetrack_app_lib::services::settings_service::SettingsService;
use lifetrack_app_lib::services::time_service::TimeService;
use lifetrack_app_lib::services::trends_service::TrendsService;
use tempfile::TempDir;

const USER: &str = "time-user";

struct Env {
    buckets: BucketService,
    time: TimeService,
    settings: SettingsService,
    trends: TrendsService,
    _dir: TempDir,
}

fn setup() -> Env {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("time-flow.sqlite")).expect("db pool");
    Env {
        buckets: BucketService::new(pool.clone()),
        time: TimeService::new(pool.clone()),
        settings: SettingsService::new(pool.clone()),
        trends: TrendsService::new(pool),
        _dir: dir,
    }
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn bucket(env: &Env, name: &str) -> Bucket {
    env.buckets
        .create(
            USER,
            BucketCreateInput {
                name: name.into(),
                ..Default::default()
            },
        )
        .unwrap()
}

fn log(env: &Env, bucket: &Bucket, day: &str, hours: f64) {
    env.time
        .log_entry(
            USER,
            TimeEntryCreateInput {
                bucket_id: bucket.id.clone(),
                hours,
                entry_date: Some(day.into()),
                ..Default::default()
            },
        )
        .unwrap();
}

/// Ten awake hours a day; Work 40%, Health 20%, Hobby untargeted.
fn seed_week(env: &Env) -> (Bucket, Bucket, Bucket) {
    env.settings
        .update(
            USER,
            SettingsUpdateInput {
                awake_hours_per_day: Some(10.0),
                ..Default::default()
            },
        )
        .unwrap();

    let work = bucket(env, "Work");
    let health = bucket(env, "Health");
    let hobby = bucket(env, "Hobby");
    env.buckets.set_target(USER, &work.id, 40.0).unwrap();
    env.buckets.set_target(USER, &health.id, 20.0).unwrap();

    for day in ["2024-03-04", "2024-03-05", "2024-03-06", "2024-03-07"] {
        log(env, &work, day, 7.0);
    }
    log(env, &health, "2024-03-08", 5.0);
    log(env, &health, "2024-03-09", 5.0);
    log(env, &hobby, "2024-03-10", 3.0);
    log(env, &work, "2024-03-11", 6.0);

    (work, health, hobby)
}

#[test]
fn weekly_report_paces_each_bucket_against_its_target() {
    let env = setup();
    let (work, health, hobby) = seed_week(&env);

    let report = env
        .time
        .allocation_report(USER, Some(date("2024-03-06")))
        .unwrap();
    assert_eq!(report.week_start, date("2024-03-04"));
    assert_eq!(report.week_end, date("2024-03-10"));
    assert_eq!(report.total_logged_hours, 41.0);

    let ids: Vec<&str> = report.rows.iter().map(|row| row.bucket_id.as_str()).collect();
    assert_eq!(ids, vec![work.id.as_str(), health.id.as_str(), hobby.id.as_str()]);

    let work_row = &report.rows[0];
    assert_eq!(work_row.target_hours, 28.0);
    assert_eq!(work_row.actual_hours, 28.0);
    assert_eq!(work_row.actual_percent, 40.0);
    assert_eq!(work_row.status, PacingStatus::OnTrack);

    assert_eq!(report.rows[1].target_hours, 14.0);
    assert_eq!(report.rows[1].status, PacingStatus::SlightlyBehind);
    assert_eq!(report.rows[2].target_percent, 0.0);
    assert_eq!(report.rows[2].status, PacingStatus::Ahead);

    assert_eq!(report.capacity.total_percent, 60.0);
    assert_eq!(report.capacity.allocated, 42.0);
    assert_eq!(report.capacity.unallocated, 28.0);
}

#[test]
fn trend_window_flags_buckets_far_from_target() {
    let env = setup();
    let (work, health, _hobby) = seed_week(&env);

    let summary = env
        .trends
        .time_allocation_at(USER, 7, date("2024-03-10"))
        .unwrap();
    assert_eq!(summary.total_hours, 41.0);
    assert_eq!(summary.days_tracked, 7);
    assert_eq!(summary.buckets[0].bucket.id, work.id);
    assert!(summary.alerts.iter().any(|row| row.bucket.id == work.id));
    assert!(!summary.alerts.iter().any(|row| row.bucket.id == health.id));
}

#[test]
fn targets_cannot_exceed_the_whole_day() {
    let env = setup();
    let (_work, _health, hobby) = seed_week(&env);

    let result = env.buckets.set_target(USER, &hobby.id, 50.0);
    assert!(matches!(result, Err(AppError::Validation { .. })));

    env.buckets.set_target(USER, &hobby.id, 40.0).unwrap();
    let capacity = env.time.capacity(USER).unwrap();
    assert_eq!(capacity.total_percent, 100.0);
    assert_eq!(capacity.unallocated, 0.0);
}

#[test]
fn entries_are_listed_by_range_and_editable() {
    let env = setup();
    let (work, _health, _hobby) = seed_week(&env);

    let entries = env
        .time
        .list_entries(USER, date("2024-03-04"), date("2024-03-05"))
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.bucket_id == work.id));

    let short = env.time.record_timer(USER, &work.id, 30, None).unwrap();
    assert!(short.is_none());
    let timed = env
        .time
        .record_timer(USER, &work.id, 5_400, Some("deep work".into()))
        .unwrap()
        .expect("timer entry");
    assert_eq!(timed.hours, 1.5);

    env.time.delete_entry(USER, &timed.id).unwrap();
    assert!(matches!(
        env.time.delete_entry(USER, &timed.id),
        Err(AppError::NotFound)
    ));
}
