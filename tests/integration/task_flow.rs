use chrono::NaiveDate;
use lifetrack_app_lib::db::DbPool;
use lifetrack_app_lib::error::AppError;
use lifetrack_app_lib::models::bucket::BucketCreateInput;
use lifetrack_app_lib::models::goal::GoalCreateInput;
use lifetrack_app_lib::models::task::{TaskCreateInput, TaskStatus, TaskUpdateInput};
use lifetrack_app_lib::services::bucket_service::BucketService;
use lifetrack_app_lib::services::goal_service::GoalService;
use lifetrack_app_lib::services::recurrence::RecurrenceRule;
use lifetrack_app_lib::services::task_ordering::{SortOption, TaskFilter};
use lifetrack_app_lib::services::task_service::TaskService;
use tempfile::TempDir;

const USER: &str = "flow-user";

struct Env {
    buckets: BucketService,
    goals: GoalService,
    tasks: TaskService,
    _dir: TempDir,
}

fn setup() -> Env {
    let dir = tempfile::tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("task-flow.sqlite")).expect("db pool");
    Env {
        buckets: BucketService::new(pool.clone()),
        goals: GoalService::new(pool.clone()),
        tasks: TaskService::new(pool),
        _dir: dir,
    }
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

#[test]
fn recurring_task_rolls_forward_through_the_board() {
    let env = setup();
    let home = env
        .buckets
        .create(
            USER,
            BucketCreateInput {
                name: "Home".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let goal = env
        .goals
        .create(
            USER,
            GoalCreateInput {
                bucket_id: home.id.clone(),
                title: "Keep the house tidy".into(),
                ..Default::default()
            },
        )
        .unwrap();

    let laundry = env
        .tasks
        .create(
            USER,
            TaskCreateInput {
                bucket_id: home.id.clone(),
                goal_id: Some(goal.id.clone()),
                title: "Laundry".into(),
                due_date: Some("2024-03-04".into()),
                is_recurring: Some(true),
                recurrence_rule: Some("weekly".into()),
                expected_hours: Some(1.5),
                ..Default::default()
            },
        )
        .unwrap();
    let taxes = env
        .tasks
        .create(
            USER,
            TaskCreateInput {
                bucket_id: home.id.clone(),
                title: "File taxes".into(),
                due_date: Some("2024-03-01".into()),
                priority: Some("high".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let board = env
        .tasks
        .board_at(USER, TaskFilter::All, SortOption::DueDate, date("2024-03-02"))
        .unwrap();
    let open: Vec<&str> = board.open.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(open, vec!["File taxes", "Laundry"]);
    assert_eq!(board.counts.all, 2);

    let completion = env
        .tasks
        .complete(USER, &laundry.id, Some("two loads".into()))
        .unwrap();
    assert_eq!(completion.task.status, TaskStatus::Complete);
    assert_eq!(completion.task.completion_note.as_deref(), Some("two loads"));

    let next = completion.next_task.expect("successor created");
    assert_ne!(next.id, laundry.id);
    assert_eq!(next.status, TaskStatus::Open);
    assert_eq!(next.due_date, Some(date("2024-03-11")));
    assert_eq!(next.recurrence_rule, Some(RecurrenceRule::Weekly));
    assert_eq!(next.goal_id.as_deref(), Some(goal.id.as_str()));
    assert_eq!(next.expected_hours, Some(1.5));

    let board = env
        .tasks
        .board_at(USER, TaskFilter::All, SortOption::DueDate, date("2024-03-05"))
        .unwrap();
    assert_eq!(board.open.len(), 2);
    assert_eq!(board.open[0].id, taxes.id);
    assert_eq!(board.open[1].id, next.id);
    assert_eq!(board.complete.len(), 1);
    assert_eq!(board.complete[0].id, laundry.id);
}

#[test]
fn turning_off_recurrence_stops_successors() {
    let env = setup();
    let bucket = env
        .buckets
        .create(
            USER,
            BucketCreateInput {
                name: "Garden".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let task = env
        .tasks
        .create(
            USER,
            TaskCreateInput {
                bucket_id: bucket.id.clone(),
                title: "Water plants".into(),
                is_recurring: Some(true),
                recurrence_rule: Some("daily".into()),
                due_date: Some("2024-05-01".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let updated = env
        .tasks
        .update(
            USER,
            &task.id,
            TaskUpdateInput {
                is_recurring: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!updated.is_recurring);
    assert_eq!(updated.recurrence_rule, None);

    let completion = env.tasks.complete(USER, &task.id, None).unwrap();
    assert!(completion.next_task.is_none());
    assert_eq!(env.tasks.list(USER, Some(&bucket.id)).unwrap().len(), 1);
}

#[test]
fn bucket_with_work_cannot_be_deleted_until_cleared() {
    let env = setup();
    let bucket = env
        .buckets
        .create(
            USER,
            BucketCreateInput {
                name: "Side project".into(),
                ..Default::default()
            },
        )
        .unwrap();
    let task = env
        .tasks
        .create(
            USER,
            TaskCreateInput {
                bucket_id: bucket.id.clone(),
                title: "Ship landing page".into(),
                ..Default::default()
            },
        )
        .unwrap();

    match env.buckets.delete(USER, &bucket.id) {
        Err(AppError::Conflict { message }) => {
            assert!(message.contains("bucket"), "unexpected message: {message}");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    env.tasks.delete(USER, &task.id).unwrap();
    env.buckets.delete(USER, &bucket.id).unwrap();
    assert!(matches!(env.buckets.get(USER, &bucket.id), Err(AppError::NotFound)));
}

#[test]
fn delegated_filter_splits_the_board() {
    let env = setup();
    let bucket = env
        .buckets
        .create(
            USER,
            BucketCreateInput {
                name: "Team".into(),
                ..Default::default()
            },
        )
        .unwrap();
    for (title, delegate) in [("Write brief", None), ("Review budget", Some("Sam")), ("Book room", Some("Ana"))] {
        env.tasks
            .create(
                USER,
                TaskCreateInput {
                    bucket_id: bucket.id.clone(),
                    title: title.into(),
                    is_delegated: Some(delegate.is_some()),
                    delegated_to: delegate.map(String::from),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let delegated = env
        .tasks
        .board_at(USER, TaskFilter::Delegated, SortOption::Priority, date("2024-03-01"))
        .unwrap();
    assert_eq!(delegated.open.len(), 2);
    assert!(delegated.open.iter().all(|task| task.delegated_to.is_some()));
    assert_eq!(delegated.counts.all, 3);
    assert_eq!(delegated.counts.mine, 1);
    assert_eq!(delegated.counts.delegated, 2);
}
