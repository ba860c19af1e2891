use chrono::{Duration, NaiveDate};
use lifetrack_app_lib::db::DbPool;
use lifetrack_app_lib::error::AppError;
use lifetrack_app_lib::models::bucket::BucketCreateInput;
use lifetrack_app_lib::models::check_in::{CheckInAnswer, Measure, MeasureCreateInput};
use lifetrack_app_lib::models::goal::GoalCreateInput;
use lifetrack_app_lib::services::bucket_service::BucketService;
use lifetrack_app_lib::services::check_in_service::CheckInService;
use lifetrack_app_lib::services::goal_service::GoalService;
use lifetrack_app_lib::services::measure_service::MeasureService;
use lifetrack_app_lib::services::trends_service::TrendsService;
use tempfile::TempDir;

const USER: &str = "check-in-user";

struct Env {
    measures: MeasureService,
    check_ins: CheckInService,
    goals: GoalService,
    buckets: BucketService,
    trends: TrendsService,
    _dir: TempDir,
}

fn setup() -> Env {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("check-in-flow.sqlite")).expect("db pool");
    Env {
        measures: MeasureService::new(pool.clone()),
        check_ins: CheckInService::new(pool.clone()),
        goals: GoalService::new(pool.clone()),
        buckets: BucketService::new(pool.clone()),
        trends: TrendsService::new(pool),
        _dir: dir,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn day(days_ago: i64) -> String {
    (today() - Duration::days(days_ago)).format("%Y-%m-%d").to_string()
}

fn answer(measure: &Measure, score: f64) -> CheckInAnswer {
    CheckInAnswer {
        measure_id: measure.id.clone(),
        score,
        notes: None,
    }
}

fn measure(env: &Env, question: &str, kind: &str) -> Measure {
    env.measures
        .create(
            USER,
            MeasureCreateInput {
                question_text: question.into(),
                measure_type: Some(kind.into()),
                ..Default::default()
            },
        )
        .unwrap()
}

#[test]
fn daily_check_ins_feed_summary_and_goals() {
    let env = setup();
    let energy = measure(&env, "How is your energy?", "scale");
    let meditated = measure(&env, "Did you meditate?", "binary");

    let health = env
        .buckets
        .create(
            USER,
            BucketCreateInput {
                name: "Health".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let energy_goal = env
        .goals
        .create(
            USER,
            GoalCreateInput {
                bucket_id: health.id.clone(),
                title: "Average energy of 8".into(),
                measure_id: Some(energy.id.clone()),
                target_value: Some(8.0),
                target_type: Some("average".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let meditation_goal = env
        .goals
        .create(
            USER,
            GoalCreateInput {
                bucket_id: health.id,
                title: "Meditate five times".into(),
                measure_id: Some(meditated.id.clone()),
                target_value: Some(5.0),
                target_type: Some("count".into()),
                ..Default::default()
            },
        )
        .unwrap();

    for (days_ago, energy_score, meditation) in [(2, 6.0, 1.0), (1, 7.0, 0.0), (0, 8.0, 1.0)] {
        let saved = env
            .check_ins
            .submit(
                USER,
                Some(&day(days_ago)),
                vec![answer(&energy, energy_score), answer(&meditated, meditation)],
            )
            .unwrap();
        assert_eq!(saved.len(), 2);
    }

    let summary = env.check_ins.summary_at(USER, today()).unwrap();
    assert_eq!(summary.streak, 3);
    assert!(summary.has_checked_in_today);
    assert_eq!(summary.responses_last_30_days, 6);
    assert_eq!(summary.average_last_30_days, 7.0);

    // A second submission for the same day replaces the earlier answer.
    env.check_ins
        .submit(USER, Some(&day(0)), vec![answer(&energy, 9.0)])
        .unwrap();
    let summary = env.check_ins.summary_at(USER, today()).unwrap();
    assert_eq!(summary.responses_last_30_days, 6);
    assert_eq!(summary.average_last_30_days, 7.3);

    let progress = env.trends.goal_progress_at(USER, 30, today()).unwrap();
    assert_eq!(progress.len(), 2);
    let energy_progress = progress
        .iter()
        .find(|item| item.goal.id == energy_goal.id)
        .unwrap();
    assert!(!energy_progress.is_binary);
    assert_eq!(energy_progress.log_count, 3);
    assert_eq!(energy_progress.current_value, 7.3);

    let meditation_progress = progress
        .iter()
        .find(|item| item.goal.id == meditation_goal.id)
        .unwrap();
    assert!(meditation_progress.is_binary);
    assert_eq!(meditation_progress.current_value, 2.0);
    assert_eq!(meditation_progress.progress_percent, 40.0);

    let trends = env.trends.check_in_trends_at(USER, 7, today()).unwrap();
    assert_eq!(trends.len(), 2);
    let meditation_trend = trends
        .iter()
        .find(|trend| trend.measure_id == meditated.id)
        .unwrap();
    assert_eq!(meditation_trend.yes_count, 2);
    assert_eq!(meditation_trend.check_in_count, 3);
}

#[test]
fn streak_breaks_after_a_missed_day() {
    let env = setup();
    let mood = measure(&env, "Mood", "scale");
    for days_ago in [5, 4, 3] {
        env.check_ins
            .submit(USER, Some(&day(days_ago)), vec![answer(&mood, 5.0)])
            .unwrap();
    }

    let summary = env.check_ins.summary_at(USER, today()).unwrap();
    assert_eq!(summary.streak, 0);
    assert!(!summary.has_checked_in_today);

    let two_days_ago = today() - Duration::days(2);
    let summary = env.check_ins.summary_at(USER, two_days_ago).unwrap();
    assert_eq!(summary.streak, 3);
}

#[test]
fn deleting_a_response_removes_its_goal_log() {
    let env = setup();
    let sleep = measure(&env, "Slept well?", "binary");
    let bucket = env
        .buckets
        .create(
            USER,
            BucketCreateInput {
                name: "Rest".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let goal = env
        .goals
        .create(
            USER,
            GoalCreateInput {
                bucket_id: bucket.id,
                title: "Sleep well".into(),
                measure_id: Some(sleep.id.clone()),
                target_value: Some(4.0),
                ..Default::default()
            },
        )
        .unwrap();

    let saved = env
        .check_ins
        .submit(USER, Some(&day(0)), vec![answer(&sleep, 1.0)])
        .unwrap();
    env.check_ins.delete_response(USER, &saved[0].id).unwrap();

    assert!(env.check_ins.responses_for(USER, today()).unwrap().is_empty());
    let progress = env.trends.goal_progress_at(USER, 7, today()).unwrap();
    let item = progress.iter().find(|item| item.goal.id == goal.id).unwrap();
    assert_eq!(item.log_count, 0);
    assert_eq!(item.current_value, 0.0);

    assert!(matches!(
        env.check_ins.delete_response(USER, &saved[0].id),
        Err(AppError::NotFound)
    ));
}

#[test]
fn measures_in_use_cannot_be_deleted() {
    let env = setup();
    let focus = measure(&env, "Focus", "scale");
    env.check_ins
        .submit(USER, Some(&day(0)), vec![answer(&focus, 6.0)])
        .unwrap();

    assert!(matches!(
        env.measures.delete(USER, &focus.id),
        Err(AppError::Conflict { .. })
    ));

    let out_of_range = env
        .check_ins
        .submit(USER, Some(&day(0)), vec![answer(&focus, 11.0)]);
    assert!(matches!(out_of_range, Err(AppError::Validation { .. })));
}
