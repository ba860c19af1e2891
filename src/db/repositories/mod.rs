pub mod bucket_repository;
pub mod check_in_repository;
pub mod goal_repository;
pub mod measure_repository;
pub mod progress_repository;
pub mod settings_repository;
pub mod task_repository;
pub mod time_entry_repository;
pub mod time_target_repository;
