pub mod analytics;
pub mod bucket;
pub mod check_in;
pub mod goal;
pub mod progress;
pub mod settings;
pub mod task;
pub mod time_entry;
