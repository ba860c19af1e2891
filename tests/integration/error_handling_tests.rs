// Error handling and edge case tests

use lifetrack_app_lib::commands::CommandError;
use lifetrack_app_lib::db::DbPool;
use lifetrack_app_lib::error::AppError;
use lifetrack_app_lib::models::bucket::BucketCreateInput;
use lifetrack_app_lib::models::goal::{GoalCreateInput, GoalUpdateInput};
use lifetrack_app_lib::models::task::TaskCreateInput;
use lifetrack_app_lib::models::time_entry::TimeEntryCreateInput;
use lifetrack_app_lib::services::bucket_service::BucketService;
use lifetrack_app_lib::services::goal_service::GoalService;
use lifetrack_app_lib::services::task_service::TaskService;
use lifetrack_app_lib::services::time_service::TimeService;
use lifetrack_app_lib::services::trends_service::TrendsService;
use tempfile::tempdir;

async fn setup_test_environment() -> (DbPool, BucketService, GoalService, TaskService, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("test.sqlite");
    let pool = DbPool::new(db_path).expect("db pool");

    let bucket_service = BucketService::new(pool.clone());
    let goal_service = GoalService::new(pool.clone());
    let task_service = TaskService::new(pool.clone());

    (pool, bucket_service, goal_service, task_service, dir)
}

fn bucket_input(name: &str) -> BucketCreateInput {
    BucketCreateInput {
        name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_records_are_scoped_to_their_owner() {
    let (_pool, buckets, _goals, tasks, _dir) = setup_test_environment().await;

    let bucket = buckets.create("alice", bucket_input("Work")).unwrap();
    let task = tasks
        .create(
            "alice",
            TaskCreateInput {
                bucket_id: bucket.id.clone(),
                title: "Quarterly review".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

    assert!(matches!(buckets.get("bob", &bucket.id), Err(AppError::NotFound)));
    assert!(matches!(tasks.get("bob", &task.id), Err(AppError::NotFound)));
    assert!(matches!(tasks.delete("bob", &task.id), Err(AppError::NotFound)));
    assert!(buckets.list("bob", false).unwrap().is_empty());

    // Bob cannot file work under Alice's bucket either.
    let borrowed = tasks.create(
        "bob",
        TaskCreateInput {
            bucket_id: bucket.id.clone(),
            title: "Sneaky task".to_string(),
            ..Default::default()
        },
    );
    assert!(borrowed.is_err());

    assert_eq!(tasks.get("alice", &task.id).unwrap().title, "Quarterly review");
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let (pool, buckets, _goals, tasks, _dir) = setup_test_environment().await;

    let empty_name = buckets.create("user", bucket_input("   "));
    assert!(matches!(empty_name, Err(AppError::Validation { .. })));

    let bad_color = buckets.create(
        "user",
        BucketCreateInput {
            name: "Color".to_string(),
            color: Some("teal".to_string()),
            ..Default::default()
        },
    );
    assert!(matches!(bad_color, Err(AppError::Validation { .. })));

    let bucket = buckets.create("user", bucket_input("Errands")).unwrap();
    let bad_date = tasks.create(
        "user",
        TaskCreateInput {
            bucket_id: bucket.id.clone(),
            title: "Post office".to_string(),
            due_date: Some("2024-02-30".to_string()),
            ..Default::default()
        },
    );
    assert!(matches!(bad_date, Err(AppError::Validation { .. })));

    let time = TimeService::new(pool);
    let too_long = time.log_entry(
        "user",
        TimeEntryCreateInput {
            bucket_id: bucket.id,
            hours: 25.0,
            entry_date: Some("2024-03-01".to_string()),
            ..Default::default()
        },
    );
    assert!(matches!(too_long, Err(AppError::Validation { .. })));
}

#[tokio::test]
async fn test_goal_hierarchy_is_one_level_deep() {
    let (_pool, buckets, goals, _tasks, _dir) = setup_test_environment().await;
    let bucket = buckets.create("user", bucket_input("Learning")).unwrap();

    let create = |title: &str, parent: Option<String>| GoalCreateInput {
        bucket_id: bucket.id.clone(),
        title: title.to_string(),
        parent_goal_id: parent,
        ..Default::default()
    };

    let parent = goals.create("user", create("Learn Spanish", None)).unwrap();
    let child = goals
        .create("user", create("Finish A1 course", Some(parent.id.clone())))
        .unwrap();

    let grandchild = goals.create("user", create("Unit 1", Some(child.id.clone())));
    assert!(matches!(grandchild, Err(AppError::Validation { .. })));

    let self_parent = goals.update(
        "user",
        &parent.id,
        GoalUpdateInput {
            parent_goal_id: Some(Some(parent.id.clone())),
            ..Default::default()
        },
    );
    assert!(matches!(self_parent, Err(AppError::Validation { .. })));

    assert!(matches!(goals.delete("user", &parent.id), Err(AppError::Conflict { .. })));
    goals.delete("user", &child.id).unwrap();
    goals.delete("user", &parent.id).unwrap();
}

#[tokio::test]
async fn test_unsupported_trend_window_reports_allowed_values() {
    let (pool, _buckets, _goals, _tasks, _dir) = setup_test_environment().await;
    let trends = TrendsService::new(pool);

    let error = trends.check_in_trends("user", 14).unwrap_err();
    let command_error = CommandError::from(error);
    assert_eq!(command_error.code, "VALIDATION_ERROR");
    let details = command_error.details.expect("details");
    assert_eq!(details["allowed"], serde_json::json!([7, 30, 90]));
    assert_eq!(details["requested"], 14);
}

#[tokio::test]
async fn test_app_errors_map_to_command_codes() {
    let (_pool, buckets, _goals, tasks, _dir) = setup_test_environment().await;

    let missing = CommandError::from(buckets.get("user", "missing").unwrap_err());
    assert_eq!(missing.code, "NOT_FOUND");
    assert!(missing.details.is_none());

    let bucket = buckets.create("user", bucket_input("Home")).unwrap();
    tasks
        .create(
            "user",
            TaskCreateInput {
                bucket_id: bucket.id.clone(),
                title: "Fix the sink".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    let in_use = CommandError::from(buckets.delete("user", &bucket.id).unwrap_err());
    assert_eq!(in_use.code, "CONFLICT");
    assert!(in_use.message.contains("time entries, tasks, or goals"));

    let json = serde_json::to_value(&in_use).unwrap();
    assert_eq!(json["code"], "CONFLICT");
    assert!(json.get("details").is_none());
}
