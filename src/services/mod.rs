pub mod bucket_service;
pub mod check_in_service;
pub mod goal_service;
pub mod measure_service;
pub mod metrics;
pub mod progress_service;
pub mod recurrence;
pub mod settings_service;
pub mod streak;
pub mod task_extraction;
pub mod task_ordering;
pub mod task_service;
pub mod time_service;
pub mod trends;
pub mod trends_service;
